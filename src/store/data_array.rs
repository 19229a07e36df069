use super::dimension::{
    plain_index, Dimension, DimensionData, RangeDimension, SampledDimension, SetDimension,
};
use super::{
    element_count, modify, view, Body, DataType, Error, FromNode, Kind, NamedEntity, Node, Result,
    Store, WithMetadata, WithSources,
};

#[derive(Debug, Clone)]
pub(crate) struct ArrayState {
    label: Option<String>,
    unit: Option<String>,
    polynom_coefficients: Vec<f64>,
    dtype: DataType,
    extent: Vec<usize>,
    values: Vec<f64>,
}

impl ArrayState {
    pub(crate) fn zeros(dtype: DataType, extent: Vec<usize>) -> Result<Self> {
        if dtype == DataType::String {
            return Err(Error::InvalidArgument(
                "data arrays hold numbers or booleans".to_string(),
            ));
        }
        let count = element_count(&extent)?;
        Ok(Self {
            label: None,
            unit: None,
            polynom_coefficients: Vec::new(),
            dtype,
            extent,
            values: vec![0.0; count],
        })
    }
}

/// The complete payload of a data array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    pub dtype: DataType,
    pub extent: Vec<usize>,
    /// Elements in column-major order.
    pub values: Vec<f64>,
}

impl ArrayData {
    /// Check that `values` fills `extent` exactly.
    pub fn new(dtype: DataType, extent: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let count = element_count(&extent)?;
        if count != values.len() {
            return Err(Error::InvalidArgument(format!(
                "extent {:?} needs {} values, got {}",
                extent,
                count,
                values.len()
            )));
        }
        Ok(Self {
            dtype,
            extent,
            values,
        })
    }

    /// Copy out the block `offset[a]..offset[a] + count[a]` along every axis `a`.
    pub fn region(&self, offset: &[usize], count: &[usize]) -> Result<ArrayData> {
        let rank = self.extent.len();
        if offset.len() != rank || count.len() != rank {
            return Err(Error::InvalidArgument(format!(
                "a region of a {}-d array needs {} coordinates, got {}",
                rank,
                rank,
                offset.len()
            )));
        }
        for axis in 0..rank {
            let len = self.extent[axis];
            match offset[axis].checked_add(count[axis]) {
                Some(end) if end <= len => {}
                _ => {
                    return Err(Error::OutOfBounds {
                        index: offset[axis].saturating_add(count[axis]),
                        len,
                    })
                }
            }
        }

        let total = element_count(count)?;
        let mut strides = Vec::with_capacity(rank);
        let mut stride = 1usize;
        for n in &self.extent {
            strides.push(stride);
            stride = stride.saturating_mul(*n);
        }

        let mut values = Vec::with_capacity(total);
        let mut cursor = vec![0usize; rank];
        for _ in 0..total {
            let source: usize = (0..rank)
                .map(|a| (offset[a] + cursor[a]) * strides[a])
                .sum();
            let value = self.values.get(source).copied().ok_or(Error::OutOfBounds {
                index: source,
                len: self.values.len(),
            })?;
            values.push(value);

            // Column-major: the first axis varies fastest
            for a in 0..rank {
                cursor[a] += 1;
                if cursor[a] < count[a] {
                    break;
                }
                cursor[a] = 0;
            }
        }

        Ok(ArrayData {
            dtype: self.dtype,
            extent: count.to_vec(),
            values,
        })
    }
}

fn index_on(dim: Option<&Dimension>, position: f64) -> Result<usize> {
    match dim {
        Some(dim) => dim.index_of(position),
        None => plain_index(position),
    }
}

/// Typed n-dimensional data with dimension descriptors.
#[derive(Debug, Clone)]
pub struct DataArray {
    store: Store,
    id: String,
}

stored_entity!(DataArray, Kind::DataArray);

impl NamedEntity for DataArray {}
impl WithMetadata for DataArray {}
impl WithSources for DataArray {}

fn state(node: &Node) -> Result<&ArrayState> {
    match &node.body {
        Body::DataArray(state) => Ok(state),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

fn state_mut(node: &mut Node) -> Result<&mut ArrayState> {
    match &mut node.body {
        Body::DataArray(state) => Ok(state),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

impl DataArray {
    fn read<R>(&self, f: impl FnOnce(&ArrayState) -> R) -> Result<R> {
        view(self, |node| state(node).map(f))
    }

    fn update(&self, f: impl FnOnce(&mut ArrayState) -> Result<()>) -> Result<()> {
        modify(self, |node| f(state_mut(node)?))
    }

    pub fn label(&self) -> Result<Option<String>> {
        self.read(|s| s.label.clone())
    }

    pub fn set_label(&self, label: Option<String>) -> Result<()> {
        self.update(|s| {
            s.label = label;
            Ok(())
        })
    }

    pub fn unit(&self) -> Result<Option<String>> {
        self.read(|s| s.unit.clone())
    }

    pub fn set_unit(&self, unit: Option<String>) -> Result<()> {
        self.update(|s| {
            s.unit = unit;
            Ok(())
        })
    }

    pub fn polynom_coefficients(&self) -> Result<Vec<f64>> {
        self.read(|s| s.polynom_coefficients.clone())
    }

    pub fn set_polynom_coefficients(&self, coefficients: Vec<f64>) -> Result<()> {
        self.update(|s| {
            s.polynom_coefficients = coefficients;
            Ok(())
        })
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.read(|s| s.dtype)
    }

    pub fn data_extent(&self) -> Result<Vec<usize>> {
        self.read(|s| s.extent.clone())
    }

    /// Resize, keeping leading elements and zero-filling new ones.
    pub fn set_data_extent(&self, extent: Vec<usize>) -> Result<()> {
        let count = element_count(&extent)?;
        self.update(|s| {
            s.values.resize(count, 0.0);
            s.extent = extent;
            Ok(())
        })
    }

    pub fn read_all(&self) -> Result<ArrayData> {
        self.read(|s| ArrayData {
            dtype: s.dtype,
            extent: s.extent.clone(),
            values: s.values.clone(),
        })
    }

    /// Replace type, extent and contents at once.
    pub fn write_all(&self, data: ArrayData) -> Result<()> {
        let data = ArrayData::new(data.dtype, data.extent, data.values)?;
        if data.dtype == DataType::String {
            return Err(Error::InvalidArgument(
                "data arrays hold numbers or booleans".to_string(),
            ));
        }
        self.update(|s| {
            s.dtype = data.dtype;
            s.extent = data.extent;
            s.values = data.values;
            Ok(())
        })
    }

    /// Data inside the region starting at `position` and spanning `extent`, both
    /// in dimension coordinates. An empty `extent` selects a single point.
    ///
    /// Axes without a dimension descriptor take coordinates as plain indices.
    pub fn region(&self, position: &[f64], extent: &[f64]) -> Result<ArrayData> {
        let data = self.read_all()?;
        let dims = self.dimensions()?;
        let rank = data.extent.len();
        if position.len() != rank || (!extent.is_empty() && extent.len() != rank) {
            return Err(Error::InvalidArgument(format!(
                "a region of a {}-d array needs {} coordinates, got {} and {}",
                rank,
                rank,
                position.len(),
                extent.len()
            )));
        }

        let mut offset = Vec::with_capacity(rank);
        let mut count = Vec::with_capacity(rank);
        for axis in 0..rank {
            let start = index_on(dims.get(axis), position[axis])?;
            let n = match extent.get(axis) {
                Some(ext) if !ext.is_finite() || *ext < 0.0 => {
                    return Err(Error::InvalidArgument(format!(
                        "extent {} must be a non-negative number",
                        ext
                    )))
                }
                Some(ext) => {
                    let stop = index_on(dims.get(axis), position[axis] + ext)?;
                    stop.saturating_sub(start).max(1)
                }
                None => 1,
            };
            offset.push(start);
            count.push(n);
        }
        data.region(&offset, &count)
    }

    /// Entry `index` along the first axis, whole along every other axis.
    pub fn slab(&self, index: usize) -> Result<ArrayData> {
        let data = self.read_all()?;
        let mut offset = vec![0; data.extent.len()];
        let mut count = data.extent.clone();
        match (offset.first_mut(), count.first_mut()) {
            (Some(o), Some(c)) => {
                *o = index;
                *c = 1;
            }
            _ => {
                return Err(Error::InvalidArgument(
                    "a scalar data array has no first axis".to_string(),
                ))
            }
        }
        data.region(&offset, &count)
    }

    pub fn dimension_count(&self) -> Result<usize> {
        self.store
            .read(|tree| Ok(tree.children(Some(&self.id), Kind::Dimension)?.len()))
    }

    /// Dimension descriptors, one per axis, in order.
    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        self.store.read(|tree| {
            tree.children(Some(&self.id), Kind::Dimension)?
                .into_iter()
                .map(|id| Dimension::resolve(&self.store, tree.node(&id)?))
                .collect()
        })
    }

    /// Dimension at 1-based `index`.
    pub fn get_dimension(&self, index: usize) -> Result<Dimension> {
        let dims = self.dimensions()?;
        let len = dims.len();
        index
            .checked_sub(1)
            .and_then(|i| dims.into_iter().nth(i))
            .ok_or(Error::OutOfBounds { index, len })
    }

    /// Place a new dimension at 1-based `index`, replacing any existing one;
    /// `None` appends.
    fn put_dimension(&self, index: Option<usize>, data: DimensionData) -> Result<String> {
        self.store.write(|tree| {
            let existing = tree.children(Some(&self.id), Kind::Dimension)?;
            let index = index.unwrap_or(existing.len() + 1);
            if index == 0 || index > existing.len() + 1 {
                return Err(Error::OutOfBounds {
                    index,
                    len: existing.len(),
                });
            }

            let replaced = existing.get(index - 1).cloned();
            let position = match &replaced {
                Some(old) => {
                    let pos = tree
                        .node(&self.id)?
                        .children
                        .iter()
                        .position(|c| c == old);
                    tree.remove(old)?;
                    pos
                }
                None => None,
            };

            let id = tree.insert(
                Some(&self.id),
                Kind::Dimension,
                String::new(),
                String::new(),
                Body::Dimension(data),
            )?;
            let node = tree.node_mut(&self.id)?;
            if let Some(pos) = position {
                node.children.retain(|c| *c != id);
                node.children.insert(pos, id.clone());
            }
            node.updated_at = super::now();
            Ok(id)
        })
    }

    pub fn append_set_dimension(&self) -> Result<SetDimension> {
        let id = self.put_dimension(None, DimensionData::set())?;
        Ok(SetDimension::from_node(self.store.clone(), id))
    }

    pub fn append_sampled_dimension(&self, interval: f64) -> Result<SampledDimension> {
        let id = self.put_dimension(None, DimensionData::sampled(interval)?)?;
        Ok(SampledDimension::from_node(self.store.clone(), id))
    }

    pub fn append_range_dimension(&self, ticks: Vec<f64>) -> Result<RangeDimension> {
        let id = self.put_dimension(None, DimensionData::range(ticks)?)?;
        Ok(RangeDimension::from_node(self.store.clone(), id))
    }

    pub fn create_set_dimension(&self, index: usize) -> Result<SetDimension> {
        let id = self.put_dimension(Some(index), DimensionData::set())?;
        Ok(SetDimension::from_node(self.store.clone(), id))
    }

    pub fn create_sampled_dimension(&self, index: usize, interval: f64) -> Result<SampledDimension> {
        let id = self.put_dimension(Some(index), DimensionData::sampled(interval)?)?;
        Ok(SampledDimension::from_node(self.store.clone(), id))
    }

    pub fn create_range_dimension(&self, index: usize, ticks: Vec<f64>) -> Result<RangeDimension> {
        let id = self.put_dimension(Some(index), DimensionData::range(ticks)?)?;
        Ok(RangeDimension::from_node(self.store.clone(), id))
    }

    /// Delete the dimension at 1-based `index`; `false` if there is none.
    pub fn delete_dimension(&self, index: usize) -> Result<bool> {
        self.store.write(|tree| {
            let existing = tree.children(Some(&self.id), Kind::Dimension)?;
            match index.checked_sub(1).and_then(|i| existing.get(i)) {
                Some(id) => {
                    tree.remove(id)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
