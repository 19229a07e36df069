use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use super::block::Block;
use super::section::Section;
use super::{create, delete, has, list, open, Body, Error, Result, Store, Tree};

/// Format name reported by every file.
pub const FORMAT: &str = "nix";

/// Format version reported by every file.
pub const VERSION: [u64; 3] = [1, 0, 0];

/// Open files by location.
static FILES: Mutex<BTreeMap<String, Arc<RwLock<Tree>>>> = Mutex::new(BTreeMap::new());

/// How to open a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// The file must exist; writes fail.
    ReadOnly,
    /// Open an existing file or create a new one.
    ReadWrite,
    /// Create a new file, discarding existing contents.
    Overwrite,
}

impl FileMode {
    /// Mode for a numeric code: 0 read-only, 1 read-write, 2 overwrite.
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(FileMode::ReadOnly),
            1 => Ok(FileMode::ReadWrite),
            2 => Ok(FileMode::Overwrite),
            _ => Err(Error::InvalidArgument(format!("unknown file mode {}", code))),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMode::ReadOnly => write!(f, "readonly"),
            FileMode::ReadWrite => write!(f, "readwrite"),
            FileMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl FromStr for FileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "readonly" | "r" => Ok(FileMode::ReadOnly),
            "readwrite" | "rw" | "a" => Ok(FileMode::ReadWrite),
            "overwrite" | "w" => Ok(FileMode::Overwrite),
            _ => Err(Error::InvalidArgument(format!("unknown file mode '{}'", s))),
        }
    }
}

/// Root of a data tree, holding blocks and metadata sections.
#[derive(Debug, Clone)]
pub struct File {
    store: Store,
}

impl File {
    /// Open the file at `path`.
    ///
    /// Files live for the rest of the process; opening the same path again
    /// shares its contents.
    pub fn open(path: &str, mode: FileMode) -> Result<File> {
        let mut files = FILES.lock().unwrap_or_else(PoisonError::into_inner);
        let tree = match (files.get(path), mode) {
            (None, FileMode::ReadOnly) => return Err(Error::FileNotFound(path.to_string())),
            (Some(tree), FileMode::Overwrite) => {
                let tree = Arc::clone(tree);
                *tree.write().unwrap_or_else(PoisonError::into_inner) = Tree::new(path);
                tree
            }
            (Some(tree), _) => Arc::clone(tree),
            (None, _) => {
                let tree = Arc::new(RwLock::new(Tree::new(path)));
                files.insert(path.to_string(), Arc::clone(&tree));
                tree
            }
        };
        debug!(path, %mode, "file opened");
        Ok(File {
            store: Store::new(tree, mode != FileMode::ReadOnly),
        })
    }

    /// Check if a file exists at `path`.
    pub fn exists(path: &str) -> bool {
        FILES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn format(&self) -> &'static str {
        FORMAT
    }

    pub fn version(&self) -> Vec<u64> {
        VERSION.to_vec()
    }

    pub fn location(&self) -> Result<String> {
        self.store.read(|tree| Ok(tree.location.clone()))
    }

    pub fn created_at(&self) -> Result<i64> {
        self.store.read(|tree| Ok(tree.created_at))
    }

    pub fn updated_at(&self) -> Result<i64> {
        self.store.read(|tree| Ok(tree.updated_at))
    }

    pub fn blocks(&self) -> Result<Vec<Block>> {
        list(&self.store, None)
    }

    pub fn get_block(&self, key: &str) -> Result<Block> {
        open(&self.store, None, key)
    }

    pub fn has_block(&self, key: &str) -> Result<bool> {
        has::<Block>(&self.store, None, key)
    }

    pub fn create_block(&self, name: String, type_name: String) -> Result<Block> {
        create(&self.store, None, name, type_name, Body::Plain)
    }

    pub fn delete_block(&self, key: &str) -> Result<bool> {
        delete::<Block>(&self.store, None, key)
    }

    pub fn sections(&self) -> Result<Vec<Section>> {
        list(&self.store, None)
    }

    pub fn get_section(&self, key: &str) -> Result<Section> {
        open(&self.store, None, key)
    }

    pub fn has_section(&self, key: &str) -> Result<bool> {
        has::<Section>(&self.store, None, key)
    }

    pub fn create_section(&self, name: String, type_name: String) -> Result<Section> {
        create(&self.store, None, name, type_name, Section::body())
    }

    pub fn delete_section(&self, key: &str) -> Result<bool> {
        delete::<Section>(&self.store, None, key)
    }

    /// Discard every block and section.
    pub fn clear(&self) -> Result<()> {
        self.store.write(|tree| {
            tree.clear();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        ArrayData, BaseTag, DataType, LinkType, NamedEntity, Stored, Value, Variant,
        WithMetadata, WithSources, MAX_ELEMENTS,
    };

    fn scratch(mode: FileMode) -> File {
        let path = format!("/tmp/{}.nix", uuid::Uuid::new_v4());
        File::open(&path, mode).unwrap()
    }

    #[test]
    fn test_readonly_missing_file() {
        let err = File::open("/nonexistent/never-created.nix", FileMode::ReadOnly).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_readonly_rejects_writes() {
        let file = scratch(FileMode::ReadWrite);
        file.create_block("b".into(), "t".into()).unwrap();
        let path = file.location().unwrap();

        let ro = File::open(&path, FileMode::ReadOnly).unwrap();
        assert_eq!(ro.blocks().unwrap().len(), 1);
        let err = ro.create_block("c".into(), "t".into()).unwrap_err();
        assert!(matches!(err, Error::ReadOnly(_)));
        let block = ro.get_block("b").unwrap();
        assert!(matches!(block.set_type("x".into()), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn test_overwrite_discards_contents() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        let path = file.location().unwrap();

        let fresh = File::open(&path, FileMode::Overwrite).unwrap();
        assert!(fresh.blocks().unwrap().is_empty());
        assert!(matches!(block.name(), Err(Error::Deleted(_))));
    }

    #[test]
    fn test_lookup_by_name_or_id() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("trial".into(), "session".into()).unwrap();
        assert_eq!(file.get_block("trial").unwrap().id(), block.id());
        assert_eq!(file.get_block(&block.id()).unwrap().name().unwrap(), "trial");
        assert!(matches!(
            file.get_block("missing"),
            Err(Error::NotFound { kind: "Block", .. })
        ));
        assert!(matches!(
            file.create_block("trial".into(), "x".into()),
            Err(Error::DuplicateName { .. })
        ));
    }

    #[test]
    fn test_delete_removes_subtree_and_references() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        let da = block
            .create_data_array("signal".into(), "t".into(), DataType::Double, vec![4])
            .unwrap();
        let dim = da.append_sampled_dimension(0.5).unwrap();
        let tag = block.create_tag("event".into(), "t".into(), vec![1.0]).unwrap();
        tag.add_reference("signal".into()).unwrap();
        assert_eq!(tag.references().unwrap().len(), 1);

        assert!(block.delete_data_array("signal").unwrap());
        assert!(!block.delete_data_array("signal").unwrap());
        assert!(tag.references().unwrap().is_empty());
        assert!(!dim.is_valid());
    }

    #[test]
    fn test_dimensions_are_ordered_and_replaceable() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        let da = block
            .create_data_array("a".into(), "t".into(), DataType::Double, vec![2, 3])
            .unwrap();
        da.append_set_dimension().unwrap();
        da.append_range_dimension(vec![0.0, 1.0, 4.0]).unwrap();
        let kinds: Vec<_> = da
            .dimensions()
            .unwrap()
            .iter()
            .map(|d| d.dimension_type())
            .collect();
        assert_eq!(kinds, vec!["set", "range"]);

        da.create_sampled_dimension(1, 0.1).unwrap();
        let kinds: Vec<_> = da
            .dimensions()
            .unwrap()
            .iter()
            .map(|d| d.dimension_type())
            .collect();
        assert_eq!(kinds, vec!["sample", "range"]);

        assert!(matches!(
            da.create_set_dimension(5),
            Err(Error::OutOfBounds { index: 5, len: 2 })
        ));
        assert!(da.delete_dimension(2).unwrap());
        assert!(!da.delete_dimension(2).unwrap());
        assert_eq!(da.dimension_count().unwrap(), 1);
    }

    #[test]
    fn test_metadata_and_sources() {
        let file = scratch(FileMode::ReadWrite);
        let section = file.create_section("recording".into(), "odml".into()).unwrap();
        let nested = section.create_section("amp".into(), "hw".into()).unwrap();
        let block = file.create_block("b".into(), "t".into()).unwrap();

        block.set_metadata(Some("amp".into())).unwrap();
        assert_eq!(block.metadata().unwrap().unwrap().id(), nested.id());
        assert_eq!(nested.parent().unwrap().unwrap().id(), section.id());
        block.set_metadata(None).unwrap();
        assert!(block.metadata().unwrap().is_none());

        let src = block.create_source("cell".into(), "neuron".into()).unwrap();
        src.create_source("dendrite".into(), "part".into()).unwrap();
        let tag = block.create_tag("t".into(), "t".into(), vec![0.0]).unwrap();
        tag.add_source("dendrite".into()).unwrap();
        assert_eq!(tag.sources(&|_| true).unwrap().len(), 1);
        assert!(tag.remove_source("dendrite").unwrap());
        assert!(!tag.remove_source("dendrite").unwrap());
    }

    #[test]
    fn test_properties_and_features() {
        let file = scratch(FileMode::ReadWrite);
        let section = file.create_section("s".into(), "t".into()).unwrap();
        let prop = section
            .create_property_with_value(
                "gain".into(),
                vec![Value::new(Variant::Double(2.5))],
            )
            .unwrap();
        assert_eq!(prop.data_type().unwrap(), DataType::Double);
        assert!(prop
            .set_values(vec![Value::new(Variant::String("x".into()))])
            .is_err());
        assert!(section.has_property("gain").unwrap());

        let block = file.create_block("b".into(), "t".into()).unwrap();
        block
            .create_data_array("pos".into(), "t".into(), DataType::Double, vec![3])
            .unwrap();
        let mt = block
            .create_multi_tag("spikes".into(), "t".into(), "pos")
            .unwrap();
        assert!(mt.has_positions().unwrap());
        assert!(mt.extents().unwrap().is_none());
        let feature = mt.create_feature("pos", LinkType::Indexed).unwrap();
        assert_eq!(feature.link_type().unwrap(), LinkType::Indexed);
        assert_eq!(feature.data().unwrap().name().unwrap(), "pos");
        assert!(mt.delete_feature(&feature.id()).unwrap());
    }

    fn ramp(block: &crate::store::Block, name: &str, extent: Vec<usize>) -> crate::store::DataArray {
        let da = block
            .create_data_array(name.into(), "t".into(), DataType::Double, extent.clone())
            .unwrap();
        let count = extent.iter().product::<usize>();
        let values = (0..count).map(|v| v as f64).collect();
        da.write_all(ArrayData::new(DataType::Double, extent, values).unwrap())
            .unwrap();
        da
    }

    #[test]
    fn test_host_sized_allocations_are_bounded() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        let da = ramp(&block, "signal", vec![4]);
        let dim = da.append_sampled_dimension(0.5).unwrap();

        assert_eq!(dim.axis(3, 1).unwrap(), vec![0.5, 1.0, 1.5]);
        assert!(matches!(
            dim.axis(MAX_ELEMENTS + 1, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            dim.axis(2, usize::MAX),
            Err(Error::OutOfBounds { .. })
        ));

        assert!(matches!(
            block.create_data_array(
                "huge".into(),
                "t".into(),
                DataType::Double,
                vec![1_000_000, 10_000_000]
            ),
            Err(Error::InvalidArgument(_))
        ));
        assert!(!block.has_data_array("huge").unwrap());
        assert!(da.set_data_extent(vec![usize::MAX / 2 + 1, 2]).is_err());
        assert_eq!(da.data_extent().unwrap(), vec![4]);
    }

    #[test]
    fn test_tag_retrieves_its_region() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        let signal = ramp(&block, "signal", vec![10]);
        signal.append_sampled_dimension(0.5).unwrap();

        let tag = block.create_tag("burst".into(), "t".into(), vec![1.0]).unwrap();
        tag.set_extent(vec![1.5]).unwrap();
        tag.add_reference("signal".into()).unwrap();

        let data = tag.retrieve_data(0).unwrap();
        assert_eq!(data.extent, vec![3]);
        assert_eq!(data.values, vec![2.0, 3.0, 4.0]);
        assert!(matches!(
            tag.retrieve_data(1),
            Err(Error::OutOfBounds { index: 1, len: 1 })
        ));

        tag.set_extent(Vec::new()).unwrap();
        assert_eq!(tag.retrieve_data(0).unwrap().values, vec![2.0]);

        ramp(&block, "stimulus", vec![2, 3]);
        tag.create_feature("stimulus", LinkType::Untagged).unwrap();
        tag.create_feature("stimulus", LinkType::Indexed).unwrap();
        assert_eq!(tag.retrieve_feature_data(0).unwrap().extent, vec![2, 3]);
        let first_row = tag.retrieve_feature_data(1).unwrap();
        assert_eq!(first_row.extent, vec![1, 3]);
        assert_eq!(first_row.values, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_multi_tag_retrieves_each_position() {
        let file = scratch(FileMode::ReadWrite);
        let block = file.create_block("b".into(), "t".into()).unwrap();
        ramp(&block, "signal", vec![10]);
        let positions = block
            .create_data_array("pos".into(), "t".into(), DataType::Double, vec![3])
            .unwrap();
        positions
            .write_all(ArrayData::new(DataType::Double, vec![3], vec![0.0, 2.0, 4.0]).unwrap())
            .unwrap();
        let extents = block
            .create_data_array("ext".into(), "t".into(), DataType::Double, vec![3])
            .unwrap();
        extents
            .write_all(ArrayData::new(DataType::Double, vec![3], vec![2.0, 1.0, 1.0]).unwrap())
            .unwrap();

        let mt = block
            .create_multi_tag("events".into(), "t".into(), "pos")
            .unwrap();
        mt.set_extents(Some("ext".into())).unwrap();
        mt.add_reference("signal".into()).unwrap();

        assert_eq!(mt.retrieve_data(0, 0).unwrap().values, vec![0.0, 1.0]);
        assert_eq!(mt.retrieve_data(1, 0).unwrap().values, vec![2.0]);
        assert!(matches!(
            mt.retrieve_data(3, 0),
            Err(Error::OutOfBounds { .. })
        ));

        mt.create_feature("signal", LinkType::Indexed).unwrap();
        let slab = mt.retrieve_feature_data(2, 0).unwrap();
        assert_eq!(slab.values, vec![2.0]);
        let tagged = mt.create_feature("signal", LinkType::Tagged).unwrap();
        assert_eq!(mt.retrieve_feature_data(2, 1).unwrap().values, vec![4.0]);
        assert!(mt.delete_feature(&tagged.id()).unwrap());
    }
}
