use super::data_array::{ArrayState, DataArray};
use super::source::Source;
use super::tag::{MultiTag, MultiTagState, Tag, TagState};
use super::{
    create, delete, has, list, open, Body, DataType, Kind, NamedEntity, Result,
    Store, Stored, WithMetadata,
};

/// Top-level grouping of data arrays, tags, multi-tags and sources.
#[derive(Debug, Clone)]
pub struct Block {
    store: Store,
    id: String,
}

stored_entity!(Block, Kind::Block);

impl NamedEntity for Block {}
impl WithMetadata for Block {}

impl Block {
    fn parent(&self) -> Option<&str> {
        Some(&self.id)
    }

    pub fn create_source(&self, name: String, type_name: String) -> Result<Source> {
        create(&self.store, self.parent(), name, type_name, Body::Plain)
    }

    /// Sources directly owned by this block.
    pub fn sources(&self) -> Result<Vec<Source>> {
        list(&self.store, self.parent())
    }

    pub fn get_source(&self, key: &str) -> Result<Source> {
        open(&self.store, self.parent(), key)
    }

    pub fn has_source(&self, key: &str) -> Result<bool> {
        has::<Source>(&self.store, self.parent(), key)
    }

    pub fn delete_source(&self, key: &str) -> Result<bool> {
        delete::<Source>(&self.store, self.parent(), key)
    }

    /// Create a data array of `dtype` with the given extent, filled with zeros.
    pub fn create_data_array(
        &self,
        name: String,
        type_name: String,
        dtype: DataType,
        extent: Vec<usize>,
    ) -> Result<DataArray> {
        let state = ArrayState::zeros(dtype, extent)?;
        create(&self.store, self.parent(), name, type_name, Body::DataArray(state))
    }

    pub fn data_arrays(&self) -> Result<Vec<DataArray>> {
        list(&self.store, self.parent())
    }

    pub fn get_data_array(&self, key: &str) -> Result<DataArray> {
        open(&self.store, self.parent(), key)
    }

    pub fn has_data_array(&self, key: &str) -> Result<bool> {
        has::<DataArray>(&self.store, self.parent(), key)
    }

    pub fn delete_data_array(&self, key: &str) -> Result<bool> {
        delete::<DataArray>(&self.store, self.parent(), key)
    }

    /// Create a tag at `position`.
    pub fn create_tag(&self, name: String, type_name: String, position: Vec<f64>) -> Result<Tag> {
        let state = TagState::at(position);
        create(&self.store, self.parent(), name, type_name, Body::Tag(state))
    }

    pub fn tags(&self) -> Result<Vec<Tag>> {
        list(&self.store, self.parent())
    }

    pub fn get_tag(&self, key: &str) -> Result<Tag> {
        open(&self.store, self.parent(), key)
    }

    pub fn has_tag(&self, key: &str) -> Result<bool> {
        has::<Tag>(&self.store, self.parent(), key)
    }

    pub fn delete_tag(&self, key: &str) -> Result<bool> {
        delete::<Tag>(&self.store, self.parent(), key)
    }

    /// Create a multi-tag whose positions are the data array `positions` of this block.
    pub fn create_multi_tag(
        &self,
        name: String,
        type_name: String,
        positions: &str,
    ) -> Result<MultiTag> {
        let positions = self.get_data_array(positions)?;
        let state = MultiTagState::with_positions(positions.node_id().to_string());
        create(&self.store, self.parent(), name, type_name, Body::MultiTag(state))
    }

    pub fn multi_tags(&self) -> Result<Vec<MultiTag>> {
        list(&self.store, self.parent())
    }

    pub fn get_multi_tag(&self, key: &str) -> Result<MultiTag> {
        open(&self.store, self.parent(), key)
    }

    pub fn has_multi_tag(&self, key: &str) -> Result<bool> {
        has::<MultiTag>(&self.store, self.parent(), key)
    }

    pub fn delete_multi_tag(&self, key: &str) -> Result<bool> {
        delete::<MultiTag>(&self.store, self.parent(), key)
    }
}
