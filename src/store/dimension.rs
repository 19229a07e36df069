use super::{element_count, modify, view, Body, Error, FromNode, Kind, Node, Result, Store};

#[derive(Debug, Clone)]
pub(crate) enum DimensionData {
    Set {
        labels: Option<Vec<String>>,
    },
    Sampled {
        interval: f64,
        offset: Option<f64>,
        label: Option<String>,
        unit: Option<String>,
    },
    Range {
        ticks: Vec<f64>,
        label: Option<String>,
        unit: Option<String>,
    },
}

fn check_interval(interval: f64) -> Result<()> {
    if interval.is_finite() && interval > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "sampling interval must be positive, got {}",
            interval
        )))
    }
}

fn check_ticks(ticks: &[f64]) -> Result<()> {
    if ticks.is_empty() {
        return Err(Error::InvalidArgument("ticks must not be empty".to_string()));
    }
    if ticks.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::InvalidArgument(
            "ticks must be sorted in ascending order".to_string(),
        ));
    }
    Ok(())
}

impl DimensionData {
    pub(crate) fn set() -> Self {
        DimensionData::Set { labels: None }
    }

    pub(crate) fn sampled(interval: f64) -> Result<Self> {
        check_interval(interval)?;
        Ok(DimensionData::Sampled {
            interval,
            offset: None,
            label: None,
            unit: None,
        })
    }

    pub(crate) fn range(ticks: Vec<f64>) -> Result<Self> {
        check_ticks(&ticks)?;
        Ok(DimensionData::Range {
            ticks,
            label: None,
            unit: None,
        })
    }
}

/// A dimension descriptor of a data array.
#[derive(Debug, Clone)]
pub enum Dimension {
    Set(SetDimension),
    Sampled(SampledDimension),
    Range(RangeDimension),
}

impl Dimension {
    pub(crate) fn resolve(store: &Store, node: &Node) -> Result<Self> {
        let store = store.clone();
        let id = node.id.clone();
        match &node.body {
            Body::Dimension(DimensionData::Set { .. }) => {
                Ok(Dimension::Set(SetDimension::from_node(store, id)))
            }
            Body::Dimension(DimensionData::Sampled { .. }) => {
                Ok(Dimension::Sampled(SampledDimension::from_node(store, id)))
            }
            Body::Dimension(DimensionData::Range { .. }) => {
                Ok(Dimension::Range(RangeDimension::from_node(store, id)))
            }
            _ => Err(Error::Deleted(id)),
        }
    }

    /// Short type name: `"set"`, `"sample"` or `"range"`.
    pub fn dimension_type(&self) -> &'static str {
        match self {
            Dimension::Set(_) => "set",
            Dimension::Sampled(_) => "sample",
            Dimension::Range(_) => "range",
        }
    }

    /// Index along this dimension nearest to `position`.
    ///
    /// Set dimensions have no coordinates, so the position is the index itself.
    pub fn index_of(&self, position: f64) -> Result<usize> {
        match self {
            Dimension::Set(_) => plain_index(position),
            Dimension::Sampled(d) => d.index_of(position),
            Dimension::Range(d) => d.index_of(position),
        }
    }
}

/// A position used directly as an index.
pub(crate) fn plain_index(position: f64) -> Result<usize> {
    let index = position.round();
    if index < 0.0 || !index.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "position {} is not a valid index",
            position
        )));
    }
    Ok(index as usize)
}

fn data(node: &Node) -> Result<&DimensionData> {
    match &node.body {
        Body::Dimension(data) => Ok(data),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

fn data_mut(node: &mut Node) -> Result<&mut DimensionData> {
    match &mut node.body {
        Body::Dimension(data) => Ok(data),
        _ => Err(Error::Deleted(node.id.clone())),
    }
}

fn mismatch(id: &str) -> Error {
    Error::Deleted(id.to_string())
}

/// Nearest sample index for a position.
fn sample_index(position: f64, interval: f64, offset: f64) -> Result<usize> {
    let index = ((position - offset) / interval).round();
    if index < 0.0 || !index.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "position {} is before the first sample",
            position
        )));
    }
    Ok(index as usize)
}

/// Index of the tick closest to `position`, clamped to the first and last tick.
fn tick_index(ticks: &[f64], position: f64) -> usize {
    let upper = ticks.partition_point(|t| *t < position);
    if upper == 0 {
        return 0;
    }
    if upper == ticks.len() {
        return ticks.len() - 1;
    }
    if (ticks[upper] - position).abs() < (position - ticks[upper - 1]).abs() {
        upper
    } else {
        upper - 1
    }
}

/// Dimension whose entries are categories.
#[derive(Debug, Clone)]
pub struct SetDimension {
    store: Store,
    id: String,
}

stored_entity!(SetDimension, Kind::Dimension);

impl SetDimension {
    pub fn labels(&self) -> Result<Option<Vec<String>>> {
        view(self, |node| match data(node)? {
            DimensionData::Set { labels } => Ok(labels.clone()),
            _ => Err(mismatch(&self.id)),
        })
    }

    pub fn set_labels(&self, value: Option<Vec<String>>) -> Result<()> {
        modify(self, |node| match data_mut(node)? {
            DimensionData::Set { labels } => {
                *labels = value;
                Ok(())
            }
            _ => Err(mismatch(&self.id)),
        })
    }
}

/// Regularly sampled dimension.
#[derive(Debug, Clone)]
pub struct SampledDimension {
    store: Store,
    id: String,
}

stored_entity!(SampledDimension, Kind::Dimension);

struct Sampling {
    interval: f64,
    offset: Option<f64>,
    label: Option<String>,
    unit: Option<String>,
}

impl SampledDimension {
    fn sampling(&self) -> Result<Sampling> {
        view(self, |node| match data(node)? {
            DimensionData::Sampled {
                interval,
                offset,
                label,
                unit,
            } => Ok(Sampling {
                interval: *interval,
                offset: *offset,
                label: label.clone(),
                unit: unit.clone(),
            }),
            _ => Err(mismatch(&self.id)),
        })
    }

    fn update(
        &self,
        f: impl FnOnce(&mut f64, &mut Option<f64>, &mut Option<String>, &mut Option<String>),
    ) -> Result<()> {
        modify(self, |node| match data_mut(node)? {
            DimensionData::Sampled {
                interval,
                offset,
                label,
                unit,
            } => {
                f(interval, offset, label, unit);
                Ok(())
            }
            _ => Err(mismatch(&self.id)),
        })
    }

    pub fn label(&self) -> Result<Option<String>> {
        Ok(self.sampling()?.label)
    }

    pub fn set_label(&self, value: Option<String>) -> Result<()> {
        self.update(|_, _, label, _| *label = value)
    }

    pub fn unit(&self) -> Result<Option<String>> {
        Ok(self.sampling()?.unit)
    }

    pub fn set_unit(&self, value: Option<String>) -> Result<()> {
        self.update(|_, _, _, unit| *unit = value)
    }

    pub fn sampling_interval(&self) -> Result<f64> {
        Ok(self.sampling()?.interval)
    }

    pub fn set_sampling_interval(&self, value: f64) -> Result<()> {
        check_interval(value)?;
        self.update(|interval, _, _, _| *interval = value)
    }

    pub fn offset(&self) -> Result<Option<f64>> {
        Ok(self.sampling()?.offset)
    }

    pub fn set_offset(&self, value: Option<f64>) -> Result<()> {
        self.update(|_, offset, _, _| *offset = value)
    }

    /// Index of the sample nearest to `position`.
    pub fn index_of(&self, position: f64) -> Result<usize> {
        let s = self.sampling()?;
        sample_index(position, s.interval, s.offset.unwrap_or(0.0))
    }

    /// Position of sample `index`.
    pub fn position_at(&self, index: usize) -> Result<f64> {
        let s = self.sampling()?;
        Ok(index as f64 * s.interval + s.offset.unwrap_or(0.0))
    }

    /// Positions of `count` samples starting at `start`.
    pub fn axis(&self, count: usize, start: usize) -> Result<Vec<f64>> {
        element_count(&[count])?;
        let end = start.checked_add(count).ok_or(Error::OutOfBounds {
            index: start,
            len: usize::MAX - count,
        })?;
        let s = self.sampling()?;
        let offset = s.offset.unwrap_or(0.0);
        Ok((start..end)
            .map(|i| i as f64 * s.interval + offset)
            .collect())
    }
}

/// Dimension with irregular ticks.
#[derive(Debug, Clone)]
pub struct RangeDimension {
    store: Store,
    id: String,
}

stored_entity!(RangeDimension, Kind::Dimension);

impl RangeDimension {
    fn with<R>(&self, f: impl FnOnce(&[f64], &Option<String>, &Option<String>) -> Result<R>) -> Result<R> {
        view(self, |node| match data(node)? {
            DimensionData::Range { ticks, label, unit } => f(ticks, label, unit),
            _ => Err(mismatch(&self.id)),
        })
    }

    fn update(
        &self,
        f: impl FnOnce(&mut Vec<f64>, &mut Option<String>, &mut Option<String>),
    ) -> Result<()> {
        modify(self, |node| match data_mut(node)? {
            DimensionData::Range { ticks, label, unit } => {
                f(ticks, label, unit);
                Ok(())
            }
            _ => Err(mismatch(&self.id)),
        })
    }

    pub fn label(&self) -> Result<Option<String>> {
        self.with(|_, label, _| Ok(label.clone()))
    }

    pub fn set_label(&self, value: Option<String>) -> Result<()> {
        self.update(|_, label, _| *label = value)
    }

    pub fn unit(&self) -> Result<Option<String>> {
        self.with(|_, _, unit| Ok(unit.clone()))
    }

    pub fn set_unit(&self, value: Option<String>) -> Result<()> {
        self.update(|_, _, unit| *unit = value)
    }

    pub fn ticks(&self) -> Result<Vec<f64>> {
        self.with(|ticks, _, _| Ok(ticks.to_vec()))
    }

    pub fn set_ticks(&self, value: Vec<f64>) -> Result<()> {
        check_ticks(&value)?;
        self.update(|ticks, _, _| *ticks = value)
    }

    /// Index of the tick nearest to `position`.
    pub fn index_of(&self, position: f64) -> Result<usize> {
        self.with(|ticks, _, _| Ok(tick_index(ticks, position)))
    }

    pub fn tick_at(&self, index: usize) -> Result<f64> {
        self.with(|ticks, _, _| {
            ticks.get(index).copied().ok_or(Error::OutOfBounds {
                index,
                len: ticks.len(),
            })
        })
    }

    /// `count` ticks starting at `start`.
    pub fn axis(&self, count: usize, start: usize) -> Result<Vec<f64>> {
        self.with(|ticks, _, _| {
            let end = start.saturating_add(count);
            ticks.get(start..end).map(<[f64]>::to_vec).ok_or(Error::OutOfBounds {
                index: end,
                len: ticks.len(),
            })
        })
    }
}
