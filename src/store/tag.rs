use std::fmt;
use std::str::FromStr;

use super::data_array::{ArrayData, DataArray};
use super::{
    modify, now, view, wrap, Body, Error, FromNode, Kind, NamedEntity, Node,
    Result, Store, Stored, WithMetadata, WithSources,
};

/// How a feature's data relates to the tagged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Tagged,
    Untagged,
    Indexed,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Tagged => "tagged",
            LinkType::Untagged => "untagged",
            LinkType::Indexed => "indexed",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tagged" => Ok(LinkType::Tagged),
            "untagged" => Ok(LinkType::Untagged),
            "indexed" => Ok(LinkType::Indexed),
            _ => Err(Error::InvalidArgument(format!("unknown link type '{}'", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TagState {
    position: Vec<f64>,
    extent: Vec<f64>,
    units: Option<Vec<String>>,
    references: Vec<String>,
}

impl TagState {
    pub(crate) fn at(position: Vec<f64>) -> Self {
        Self {
            position,
            extent: Vec::new(),
            units: None,
            references: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MultiTagState {
    positions: String,
    extents: Option<String>,
    references: Vec<String>,
}

impl MultiTagState {
    pub(crate) fn with_positions(positions: String) -> Self {
        Self {
            positions,
            extents: None,
            references: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FeatureState {
    link_type: LinkType,
    data: String,
}

fn references(node: &Node) -> Result<&Vec<String>> {
    match &node.body {
        Body::Tag(state) => Ok(&state.references),
        Body::MultiTag(state) => Ok(&state.references),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

fn references_mut(node: &mut Node) -> Result<&mut Vec<String>> {
    match &mut node.body {
        Body::Tag(state) => Ok(&mut state.references),
        Body::MultiTag(state) => Ok(&mut state.references),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

/// Reference and feature handling shared by [`Tag`] and [`MultiTag`].
pub trait BaseTag: Stored {
    /// Referenced data arrays that still exist.
    fn references(&self) -> Result<Vec<DataArray>> {
        let ids = self
            .store()
            .read(|tree| Ok(tree.live(references(tree.node(self.node_id())?)?)))?;
        Ok(wrap(self.store(), ids))
    }

    /// Referenced data array with the given id or name.
    fn get_reference(&self, key: &str) -> Result<DataArray> {
        self.references()?
            .into_iter()
            .find(|da| da.node_id() == key || da.name().map(|n| n == key).unwrap_or(false))
            .ok_or_else(|| Error::NotFound {
                kind: Kind::DataArray.as_str(),
                key: key.to_string(),
            })
    }

    fn has_reference(&self, key: &str) -> Result<bool> {
        match self.get_reference(key) {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reference a data array of the enclosing block, found by id or name.
    fn add_reference(&self, key: String) -> Result<()> {
        self.store().write(|tree| {
            let block = tree.enclosing(self.node_id(), Kind::Block)?;
            let target = tree.child(Some(&block), Kind::DataArray, &key)?;
            let node = tree.node_mut(self.node_id())?;
            let refs = references_mut(node)?;
            if !refs.contains(&target) {
                refs.push(target);
            }
            node.updated_at = now();
            Ok(())
        })
    }

    /// Drop a reference; `false` if the data array was not referenced.
    fn remove_reference(&self, key: &str) -> Result<bool> {
        let target = match self.get_reference(key) {
            Ok(da) => da.id(),
            Err(Error::NotFound { .. }) => return Ok(false),
            Err(err) => return Err(err),
        };
        modify(self, |node| {
            references_mut(node)?.retain(|id| *id != target);
            Ok(true)
        })
    }

    fn features(&self) -> Result<Vec<Feature>> {
        let ids = self
            .store()
            .read(|tree| tree.children(Some(self.node_id()), Kind::Feature))?;
        Ok(wrap(self.store(), ids))
    }

    /// Feature with the given id.
    fn get_feature(&self, key: &str) -> Result<Feature> {
        let id = self
            .store()
            .read(|tree| tree.child(Some(self.node_id()), Kind::Feature, key))?;
        Ok(Feature::from_node(self.store().clone(), id))
    }

    fn has_feature(&self, key: &str) -> Result<bool> {
        self.store()
            .read(|tree| Ok(tree.find_child(Some(self.node_id()), Kind::Feature, key)?.is_some()))
    }

    /// Attach the data array `data` of the enclosing block as a feature.
    fn create_feature(&self, data: &str, link_type: LinkType) -> Result<Feature> {
        let id = self.store().write(|tree| {
            let block = tree.enclosing(self.node_id(), Kind::Block)?;
            let data = tree.child(Some(&block), Kind::DataArray, data)?;
            tree.insert(
                Some(self.node_id()),
                Kind::Feature,
                String::new(),
                String::new(),
                Body::Feature(FeatureState { link_type, data }),
            )
        })?;
        Ok(Feature::from_node(self.store().clone(), id))
    }

    fn delete_feature(&self, key: &str) -> Result<bool> {
        self.store()
            .write(|tree| tree.remove_child(Some(self.node_id()), Kind::Feature, key))
    }
}

/// Marks a single region of interest in the data arrays of a block.
#[derive(Debug, Clone)]
pub struct Tag {
    store: Store,
    id: String,
}

stored_entity!(Tag, Kind::Tag);

impl NamedEntity for Tag {}
impl WithMetadata for Tag {}
impl WithSources for Tag {}
impl BaseTag for Tag {}

impl Tag {
    fn read<R>(&self, f: impl FnOnce(&TagState) -> R) -> Result<R> {
        view(self, |node| match &node.body {
            Body::Tag(state) => Ok(f(state)),
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    fn update(&self, f: impl FnOnce(&mut TagState)) -> Result<()> {
        modify(self, |node| match &mut node.body {
            Body::Tag(state) => {
                f(state);
                Ok(())
            }
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    pub fn position(&self) -> Result<Vec<f64>> {
        self.read(|s| s.position.clone())
    }

    pub fn set_position(&self, position: Vec<f64>) -> Result<()> {
        self.update(|s| s.position = position)
    }

    pub fn extent(&self) -> Result<Vec<f64>> {
        self.read(|s| s.extent.clone())
    }

    pub fn set_extent(&self, extent: Vec<f64>) -> Result<()> {
        self.update(|s| s.extent = extent)
    }

    pub fn units(&self) -> Result<Option<Vec<String>>> {
        self.read(|s| s.units.clone())
    }

    pub fn set_units(&self, units: Option<Vec<String>>) -> Result<()> {
        self.update(|s| s.units = units)
    }

    /// Part of the `index`-th referenced data array covered by this tag.
    pub fn retrieve_data(&self, index: usize) -> Result<ArrayData> {
        let reference = nth(self.references()?, index)?;
        reference.region(&self.position()?, &self.extent()?)
    }

    /// Data of the `index`-th feature, selected according to its link type.
    pub fn retrieve_feature_data(&self, index: usize) -> Result<ArrayData> {
        let feature = nth(self.features()?, index)?;
        let data = feature.data()?;
        match feature.link_type()? {
            LinkType::Tagged => data.region(&self.position()?, &self.extent()?),
            LinkType::Untagged => data.read_all(),
            LinkType::Indexed => data.slab(0),
        }
    }
}

fn nth<T>(items: Vec<T>, index: usize) -> Result<T> {
    let len = items.len();
    items
        .into_iter()
        .nth(index)
        .ok_or(Error::OutOfBounds { index, len })
}

/// Row `index` of a positions or extents array: one value per column.
fn row(data: &ArrayData, index: usize) -> Result<Vec<f64>> {
    let (offset, count) = match data.extent.as_slice() {
        [_] => (vec![index], vec![1]),
        [_, cols] => (vec![index, 0], vec![1, *cols]),
        other => {
            return Err(Error::InvalidArgument(format!(
                "positions must be 1-d or 2-d, got {}-d",
                other.len()
            )))
        }
    };
    Ok(data.region(&offset, &count)?.values)
}

/// Marks many regions at once, given by a positions data array.
#[derive(Debug, Clone)]
pub struct MultiTag {
    store: Store,
    id: String,
}

stored_entity!(MultiTag, Kind::MultiTag);

impl NamedEntity for MultiTag {}
impl WithMetadata for MultiTag {}
impl WithSources for MultiTag {}
impl BaseTag for MultiTag {}

impl MultiTag {
    fn linked(&self, pick: impl FnOnce(&MultiTagState) -> Option<String>) -> Result<Option<DataArray>> {
        let id = self.store.read(|tree| {
            let node = tree.node(&self.id)?;
            let id = match &node.body {
                Body::MultiTag(state) => pick(state),
                _ => return Err(Error::Deleted(self.id.clone())),
            };
            Ok(id.filter(|id| tree.contains(id)))
        })?;
        Ok(id.map(|id| DataArray::from_node(self.store.clone(), id)))
    }

    fn link(&self, key: Option<String>, apply: impl FnOnce(&mut MultiTagState, Option<String>)) -> Result<()> {
        self.store.write(|tree| {
            let target = match key {
                Some(key) => {
                    let block = tree.enclosing(&self.id, Kind::Block)?;
                    Some(tree.child(Some(&block), Kind::DataArray, &key)?)
                }
                None => None,
            };
            let node = tree.node_mut(&self.id)?;
            match &mut node.body {
                Body::MultiTag(state) => apply(state, target),
                _ => return Err(Error::Deleted(self.id.clone())),
            }
            node.updated_at = now();
            Ok(())
        })
    }

    /// Positions data array, unless it was deleted.
    pub fn positions(&self) -> Result<Option<DataArray>> {
        self.linked(|s| Some(s.positions.clone()))
    }

    pub fn has_positions(&self) -> Result<bool> {
        Ok(self.positions()?.is_some())
    }

    /// Use the data array `key` of the enclosing block as positions.
    pub fn set_positions(&self, key: String) -> Result<()> {
        self.link(Some(key), |s, target| {
            if let Some(target) = target {
                s.positions = target;
            }
        })
    }

    pub fn extents(&self) -> Result<Option<DataArray>> {
        self.linked(|s| s.extents.clone())
    }

    /// Use the data array `key` of the enclosing block as extents, or clear them.
    pub fn set_extents(&self, key: Option<String>) -> Result<()> {
        self.link(key, |s, target| s.extents = target)
    }

    /// Position `index` and its extent; the extent is empty without an extents array.
    fn region_at(&self, index: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let positions = self.positions()?.ok_or_else(|| Error::NotFound {
            kind: Kind::DataArray.as_str(),
            key: "positions".to_string(),
        })?;
        let position = row(&positions.read_all()?, index)?;
        let extent = match self.extents()? {
            Some(extents) => row(&extents.read_all()?, index)?,
            None => Vec::new(),
        };
        Ok((position, extent))
    }

    /// Part of the `reference`-th referenced data array covered by position `position`.
    pub fn retrieve_data(&self, position: usize, reference: usize) -> Result<ArrayData> {
        let (start, extent) = self.region_at(position)?;
        nth(self.references()?, reference)?.region(&start, &extent)
    }

    /// Data of the `feature`-th feature for position `position`, selected according
    /// to its link type.
    pub fn retrieve_feature_data(&self, position: usize, feature: usize) -> Result<ArrayData> {
        let feature = nth(self.features()?, feature)?;
        let data = feature.data()?;
        match feature.link_type()? {
            LinkType::Tagged => {
                let (start, extent) = self.region_at(position)?;
                data.region(&start, &extent)
            }
            LinkType::Untagged => data.read_all(),
            LinkType::Indexed => data.slab(position),
        }
    }
}

/// Additional data attached to a tag.
#[derive(Debug, Clone)]
pub struct Feature {
    store: Store,
    id: String,
}

stored_entity!(Feature, Kind::Feature);

impl Feature {
    fn state(&self) -> Result<FeatureState> {
        view(self, |node| match &node.body {
            Body::Feature(state) => Ok(state.clone()),
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    pub fn link_type(&self) -> Result<LinkType> {
        Ok(self.state()?.link_type)
    }

    pub fn set_link_type(&self, link_type: LinkType) -> Result<()> {
        modify(self, |node| match &mut node.body {
            Body::Feature(state) => {
                state.link_type = link_type;
                Ok(())
            }
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    /// The attached data array.
    pub fn data(&self) -> Result<DataArray> {
        let data = self.state()?.data;
        let live = self.store.read(|tree| Ok(tree.contains(&data)))?;
        if !live {
            return Err(Error::NotFound {
                kind: Kind::DataArray.as_str(),
                key: data,
            });
        }
        Ok(DataArray::from_node(self.store.clone(), data))
    }
}
