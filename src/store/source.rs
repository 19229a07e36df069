use super::{
    create, delete, has, list, open, Body, Kind, NamedEntity, Result, Store,
    WithMetadata,
};

/// Provenance of data; sources nest.
#[derive(Debug, Clone)]
pub struct Source {
    store: Store,
    id: String,
}

stored_entity!(Source, Kind::Source);

impl NamedEntity for Source {}
impl WithMetadata for Source {}

impl Source {
    fn parent(&self) -> Option<&str> {
        Some(&self.id)
    }

    pub fn create_source(&self, name: String, type_name: String) -> Result<Source> {
        create(&self.store, self.parent(), name, type_name, Body::Plain)
    }

    /// Sources nested directly below this one.
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
}
