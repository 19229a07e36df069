//! In-memory data store.
//!
//! A file owns a tree of nodes: blocks hold data arrays, tags, multi-tags and
//! sources; sections hold nested sections and properties. Entity types such as
//! [`Block`] are cheap references (`Store` + node id) into that tree. Every
//! entity access takes the file lock, so a reference to a deleted node fails
//! with [`Error::Deleted`] instead of observing stale data.

/// Implement [`Stored`] and [`FromNode`] for a `{ store, id }` entity struct.
macro_rules! stored_entity {
    ($ty:ident, $kind:expr) => {
        impl $crate::store::Stored for $ty {
            fn store(&self) -> &$crate::store::Store {
                &self.store
            }

            fn node_id(&self) -> &str {
                &self.id
            }
        }

        impl $crate::store::FromNode for $ty {
            const KIND: $crate::store::Kind = $kind;

            fn from_node(store: $crate::store::Store, id: String) -> Self {
                Self { store, id }
            }
        }
    };
}

mod block;
mod data_array;
mod dimension;
mod file;
mod section;
mod source;
mod tag;

pub use block::Block;
pub use data_array::{ArrayData, DataArray};
pub use dimension::{Dimension, RangeDimension, SampledDimension, SetDimension};
pub use file::{File, FileMode};
pub use section::{Property, Section, Value, Variant};
pub use source::Source;
pub use tag::{BaseTag, Feature, LinkType, MultiTag, Tag};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the data store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A read-only open was requested for a file that does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Write through a read-only file.
    #[error("file '{0}' is opened read-only")]
    ReadOnly(String),

    /// No child of the requested kind matches the name or id.
    #[error("{kind} '{key}' not found")]
    NotFound {
        /// Kind of entity looked up.
        kind: &'static str,
        /// Name or id used for the lookup.
        key: String,
    },

    /// The entity was deleted from its file.
    #[error("entity {0} no longer exists")]
    Deleted(String),

    /// A sibling of the same kind already carries the name.
    #[error("{kind} named '{name}' already exists")]
    DuplicateName {
        /// Kind of entity created.
        kind: &'static str,
        /// Conflicting name.
        name: String,
    },

    /// Index past the end of a list.
    #[error("index {index} out of bounds for {len} element(s)")]
    OutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of elements.
        len: usize,
    },

    /// Invalid value for an operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Element type of data arrays and properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    String,
    Float,
    Double,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl DataType {
    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::String => "string",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
        }
    }

    /// Check if values of this type are numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::Bool | DataType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" | "logical" => DataType::Bool,
            "string" | "char" => DataType::String,
            "float" | "single" => DataType::Float,
            "double" => DataType::Double,
            "int8" => DataType::Int8,
            "int16" => DataType::Int16,
            "int32" => DataType::Int32,
            "int64" => DataType::Int64,
            "uint8" => DataType::UInt8,
            "uint16" => DataType::UInt16,
            "uint32" => DataType::UInt32,
            "uint64" => DataType::UInt64,
            _ => return Err(Error::InvalidArgument(format!("unknown data type '{}'", s))),
        };
        Ok(dtype)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Block,
    DataArray,
    Tag,
    MultiTag,
    Source,
    Section,
    Property,
    Feature,
    Dimension,
}

impl Kind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Kind::Block => "Block",
            Kind::DataArray => "DataArray",
            Kind::Tag => "Tag",
            Kind::MultiTag => "MultiTag",
            Kind::Source => "Source",
            Kind::Section => "Section",
            Kind::Property => "Property",
            Kind::Feature => "Feature",
            Kind::Dimension => "Dimension",
        }
    }

    fn is_named(self) -> bool {
        !matches!(self, Kind::Feature | Kind::Dimension)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Plain,
    DataArray(data_array::ArrayState),
    Tag(tag::TagState),
    MultiTag(tag::MultiTagState),
    Feature(tag::FeatureState),
    Section(section::SectionState),
    Property(section::PropertyState),
    Dimension(dimension::DimensionData),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) kind: Kind,
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) definition: Option<String>,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
    pub(crate) parent: Option<String>,
    pub(crate) children: Vec<String>,
    pub(crate) metadata: Option<String>,
    pub(crate) sources: Vec<String>,
    pub(crate) body: Body,
}

/// Contents of one file.
#[derive(Debug)]
pub(crate) struct Tree {
    pub(crate) location: String,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
    roots: Vec<String>,
    nodes: HashMap<String, Node>,
}

pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

/// Largest number of elements a data array payload or a generated axis may hold.
pub const MAX_ELEMENTS: usize = 1 << 27;

/// Number of elements spanned by `extent`, refusing overflow and anything above [`MAX_ELEMENTS`].
pub(crate) fn element_count(extent: &[usize]) -> Result<usize> {
    extent
        .iter()
        .try_fold(1usize, |acc, n| acc.checked_mul(*n))
        .filter(|count| *count <= MAX_ELEMENTS)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "extent {:?} exceeds the limit of {} elements",
                extent, MAX_ELEMENTS
            ))
        })
}

impl Tree {
    pub(crate) fn new(location: &str) -> Self {
        let created = now();
        Self {
            location: location.to_string(),
            created_at: created,
            updated_at: created,
            roots: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    pub(crate) fn node(&self, id: &str) -> Result<&Node> {
        self.nodes.get(id).ok_or_else(|| Error::Deleted(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::Deleted(id.to_string()))
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    fn child_ids(&self, parent: Option<&str>) -> Result<&[String]> {
        match parent {
            Some(id) => Ok(&self.node(id)?.children),
            None => Ok(&self.roots),
        }
    }

    fn matches(node: &Node, key: &str) -> bool {
        node.id == key || (node.kind.is_named() && node.name == key)
    }

    /// Live children of `parent` (the file root if `None`) of the given kind, in creation order.
    pub(crate) fn children(&self, parent: Option<&str>, kind: Kind) -> Result<Vec<String>> {
        Ok(self
            .child_ids(parent)?
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.kind == kind)
            .map(|node| node.id.clone())
            .collect())
    }

    /// Child of `parent` whose id or name is `key`.
    pub(crate) fn find_child(&self, parent: Option<&str>, kind: Kind, key: &str) -> Result<Option<String>> {
        Ok(self
            .child_ids(parent)?
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|node| node.kind == kind && Self::matches(node, key))
            .map(|node| node.id.clone()))
    }

    pub(crate) fn child(&self, parent: Option<&str>, kind: Kind, key: &str) -> Result<String> {
        self.find_child(parent, kind, key)?.ok_or_else(|| Error::NotFound {
            kind: kind.as_str(),
            key: key.to_string(),
        })
    }

    /// Depth-first search below `parent` for a node of `kind` matching `key`.
    pub(crate) fn search(&self, parent: Option<&str>, kind: Kind, key: &str) -> Result<String> {
        let mut stack: Vec<&String> = self.child_ids(parent)?.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.kind == kind && Self::matches(node, key) {
                return Ok(node.id.clone());
            }
            stack.extend(node.children.iter().rev());
        }
        Err(Error::NotFound {
            kind: kind.as_str(),
            key: key.to_string(),
        })
    }

    /// Nearest ancestor of `id` (or `id` itself) of the given kind.
    pub(crate) fn enclosing(&self, id: &str, kind: Kind) -> Result<String> {
        let mut node = self.node(id)?;
        loop {
            if node.kind == kind {
                return Ok(node.id.clone());
            }
            match &node.parent {
                Some(parent) => node = self.node(parent)?,
                None => {
                    return Err(Error::NotFound {
                        kind: kind.as_str(),
                        key: id.to_string(),
                    })
                }
            }
        }
    }

    /// Ids in `ids` that still name a node.
    pub(crate) fn live(&self, ids: &[String]) -> Vec<String> {
        ids.iter().filter(|id| self.contains(id)).cloned().collect()
    }

    /// Create a node under `parent`, rejecting duplicate sibling names.
    pub(crate) fn insert(
        &mut self,
        parent: Option<&str>,
        kind: Kind,
        name: String,
        type_name: String,
        body: Body,
    ) -> Result<String> {
        if kind.is_named() {
            if name.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "{} name must not be empty",
                    kind.as_str()
                )));
            }
            if self.find_child(parent, kind, &name)?.is_some() {
                return Err(Error::DuplicateName {
                    kind: kind.as_str(),
                    name,
                });
            }
        }

        let id = Uuid::new_v4().to_string();
        let created = now();
        let node = Node {
            kind,
            id: id.clone(),
            name,
            type_name,
            definition: None,
            created_at: created,
            updated_at: created,
            parent: parent.map(str::to_string),
            children: Vec::new(),
            metadata: None,
            sources: Vec::new(),
            body,
        };
        match parent {
            Some(pid) => self.node_mut(pid)?.children.push(id.clone()),
            None => self.roots.push(id.clone()),
        }
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Delete `id` and everything it owns.
    pub(crate) fn remove(&mut self, id: &str) -> Result<()> {
        let parent = self.node(id)?.parent.clone();
        match parent {
            Some(pid) => {
                if let Ok(p) = self.node_mut(&pid) {
                    p.children.retain(|c| c != id);
                    p.updated_at = now();
                }
            }
            None => self.roots.retain(|c| c != id),
        }

        let mut pending = vec![id.to_string()];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    /// Remove the child of `parent` matching `key`; `false` if there is none.
    pub(crate) fn remove_child(&mut self, parent: Option<&str>, kind: Kind, key: &str) -> Result<bool> {
        match self.find_child(parent, kind, key)? {
            Some(id) => {
                self.remove(&id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.roots.clear();
        self.nodes.clear();
        self.updated_at = now();
    }
}

/// Shared reference to an open file's contents.
#[derive(Debug, Clone)]
pub struct Store {
    tree: Arc<RwLock<Tree>>,
    writable: bool,
}

impl Store {
    pub(crate) fn new(tree: Arc<RwLock<Tree>>, writable: bool) -> Self {
        Self { tree, writable }
    }

    /// Check if writes through this reference are allowed.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Check if both references point into the same file.
    pub fn same_file(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Tree) -> Result<R>) -> Result<R> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        f(&tree)
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Tree) -> Result<R>) -> Result<R> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if !self.writable {
            return Err(Error::ReadOnly(tree.location.clone()));
        }
        let result = f(&mut tree)?;
        tree.updated_at = now();
        Ok(result)
    }
}

/// An entity stored as a node of a file.
pub trait Stored {
    /// The file this entity lives in.
    fn store(&self) -> &Store;

    /// Node id.
    fn node_id(&self) -> &str;

    /// Unique id of the entity.
    fn id(&self) -> String {
        self.node_id().to_string()
    }

    /// Check if the entity still exists.
    fn is_valid(&self) -> bool {
        self.store()
            .read(|tree| Ok(tree.contains(self.node_id())))
            .unwrap_or(false)
    }

    /// Creation time, seconds since the Unix epoch.
    fn created_at(&self) -> Result<i64> {
        view(self, |node| Ok(node.created_at))
    }

    /// Last modification time, seconds since the Unix epoch.
    fn updated_at(&self) -> Result<i64> {
        view(self, |node| Ok(node.updated_at))
    }
}

/// Construction of entity references from node ids.
pub(crate) trait FromNode: Sized {
    const KIND: Kind;

    fn from_node(store: Store, id: String) -> Self;
}

pub(crate) fn view<E, R>(entity: &E, f: impl FnOnce(&Node) -> Result<R>) -> Result<R>
where
    E: Stored + ?Sized,
{
    entity.store().read(|tree| f(tree.node(entity.node_id())?))
}

pub(crate) fn modify<E, R>(entity: &E, f: impl FnOnce(&mut Node) -> Result<R>) -> Result<R>
where
    E: Stored + ?Sized,
{
    entity.store().write(|tree| {
        let node = tree.node_mut(entity.node_id())?;
        let result = f(node)?;
        node.updated_at = now();
        Ok(result)
    })
}

pub(crate) fn wrap<C: FromNode>(store: &Store, ids: Vec<String>) -> Vec<C> {
    ids.into_iter()
        .map(|id| C::from_node(store.clone(), id))
        .collect()
}

pub(crate) fn list<C: FromNode>(store: &Store, parent: Option<&str>) -> Result<Vec<C>> {
    let ids = store.read(|tree| tree.children(parent, C::KIND))?;
    Ok(wrap(store, ids))
}

pub(crate) fn open<C: FromNode>(store: &Store, parent: Option<&str>, key: &str) -> Result<C> {
    let id = store.read(|tree| tree.child(parent, C::KIND, key))?;
    Ok(C::from_node(store.clone(), id))
}

pub(crate) fn has<C: FromNode>(store: &Store, parent: Option<&str>, key: &str) -> Result<bool> {
    store.read(|tree| Ok(tree.find_child(parent, C::KIND, key)?.is_some()))
}

pub(crate) fn create<C: FromNode>(
    store: &Store,
    parent: Option<&str>,
    name: String,
    type_name: String,
    body: Body,
) -> Result<C> {
    let id = store.write(|tree| tree.insert(parent, C::KIND, name, type_name, body))?;
    Ok(C::from_node(store.clone(), id))
}

pub(crate) fn delete<C: FromNode>(store: &Store, parent: Option<&str>, key: &str) -> Result<bool> {
    store.write(|tree| tree.remove_child(parent, C::KIND, key))
}

/// An entity with a name, a type and an optional definition.
pub trait NamedEntity: Stored {
    /// Name, unique among siblings of the same kind.
    fn name(&self) -> Result<String> {
        view(self, |node| Ok(node.name.clone()))
    }

    /// Free-form type string.
    fn type_name(&self) -> Result<String> {
        view(self, |node| Ok(node.type_name.clone()))
    }

    fn set_type(&self, type_name: String) -> Result<()> {
        modify(self, |node| {
            node.type_name = type_name;
            Ok(())
        })
    }

    fn definition(&self) -> Result<Option<String>> {
        view(self, |node| Ok(node.definition.clone()))
    }

    fn set_definition(&self, definition: Option<String>) -> Result<()> {
        modify(self, |node| {
            node.definition = definition;
            Ok(())
        })
    }
}

/// An entity that can link to a metadata section.
pub trait WithMetadata: Stored {
    /// Linked section, if any and still present.
    fn metadata(&self) -> Result<Option<Section>> {
        let id = self.store().read(|tree| {
            let node = tree.node(self.node_id())?;
            Ok(node.metadata.clone().filter(|id| tree.contains(id)))
        })?;
        Ok(id.map(|id| Section::from_node(self.store().clone(), id)))
    }

    /// Link to the section named by id or name anywhere in the file, or unlink.
    fn set_metadata(&self, key: Option<String>) -> Result<()> {
        self.store().write(|tree| {
            let section = match key {
                Some(key) => Some(tree.search(None, Kind::Section, &key)?),
                None => None,
            };
            let node = tree.node_mut(self.node_id())?;
            node.metadata = section;
            node.updated_at = now();
            Ok(())
        })
    }
}

/// An entity referencing sources of its block.
pub trait WithSources: Stored {
    /// Referenced sources accepted by `filter`.
    fn sources(&self, filter: &dyn Fn(&Source) -> bool) -> Result<Vec<Source>> {
        let ids = self
            .store()
            .read(|tree| Ok(tree.live(&tree.node(self.node_id())?.sources)))?;
        Ok(wrap::<Source>(self.store(), ids)
            .into_iter()
            .filter(|s| filter(s))
            .collect())
    }

    /// Referenced source with the given id or name.
    fn get_source(&self, key: &str) -> Result<Source> {
        self.sources(&|_| true)?
            .into_iter()
            .find(|s| s.node_id() == key || s.name().map(|n| n == key).unwrap_or(false))
            .ok_or_else(|| Error::NotFound {
                kind: Kind::Source.as_str(),
                key: key.to_string(),
            })
    }

    /// Reference a source of the enclosing block, found by id or name.
    fn add_source(&self, key: String) -> Result<()> {
        self.store().write(|tree| {
            let block = tree.enclosing(self.node_id(), Kind::Block)?;
            let source = tree.search(Some(&block), Kind::Source, &key)?;
            let node = tree.node_mut(self.node_id())?;
            if !node.sources.contains(&source) {
                node.sources.push(source);
            }
            node.updated_at = now();
            Ok(())
        })
    }

    /// Drop the reference to a source; `false` if it was not referenced.
    fn remove_source(&self, key: &str) -> Result<bool> {
        self.store().write(|tree| {
            let live = tree.live(&tree.node(self.node_id())?.sources);
            let target = live.into_iter().find(|id| {
                tree.node(id)
                    .map(|n| n.id == key || n.name == key)
                    .unwrap_or(false)
            });
            let node = tree.node_mut(self.node_id())?;
            match target {
                Some(id) => {
                    node.sources.retain(|s| *s != id);
                    node.updated_at = now();
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }
}
