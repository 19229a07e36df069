use super::{
    create, delete, has, list, modify, now, open, view, Body, DataType, Error,
    FromNode, Kind, NamedEntity, Result, Store,
};

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Bool(bool),
    Double(f64),
    String(String),
}

impl Variant {
    /// Data type a property needs to hold this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Variant::Bool(_) => DataType::Bool,
            Variant::Double(_) => DataType::Double,
            Variant::String(_) => DataType::String,
        }
    }

    fn fits(&self, dtype: DataType) -> bool {
        match self {
            Variant::Bool(_) => dtype == DataType::Bool,
            Variant::Double(_) => dtype.is_numeric(),
            Variant::String(_) => dtype == DataType::String,
        }
    }
}

/// A property value with its uncertainty.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub value: Variant,
    pub uncertainty: f64,
}

impl Value {
    pub fn new(value: Variant) -> Self {
        Self {
            value,
            uncertainty: 0.0,
        }
    }
}

fn check_values(dtype: DataType, values: &[Value]) -> Result<()> {
    match values.iter().find(|v| !v.value.fits(dtype)) {
        Some(v) => Err(Error::InvalidArgument(format!(
            "{} value does not fit a {} property",
            v.value.data_type(),
            dtype
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SectionState {
    repository: Option<String>,
    mapping: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PropertyState {
    unit: Option<String>,
    mapping: Option<String>,
    dtype: DataType,
    values: Vec<Value>,
}

/// A node of the metadata tree.
#[derive(Debug, Clone)]
pub struct Section {
    store: Store,
    id: String,
}

stored_entity!(Section, Kind::Section);

impl NamedEntity for Section {}

impl Section {
    pub(crate) fn body() -> Body {
        Body::Section(SectionState::default())
    }

    fn parent_key(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn read<R>(&self, f: impl FnOnce(&SectionState) -> R) -> Result<R> {
        view(self, |node| match &node.body {
            Body::Section(state) => Ok(f(state)),
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    fn update(&self, f: impl FnOnce(&mut SectionState)) -> Result<()> {
        modify(self, |node| match &mut node.body {
            Body::Section(state) => {
                f(state);
                Ok(())
            }
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    pub fn repository(&self) -> Result<Option<String>> {
        self.read(|s| s.repository.clone())
    }

    pub fn set_repository(&self, repository: Option<String>) -> Result<()> {
        self.update(|s| s.repository = repository)
    }

    pub fn mapping(&self) -> Result<Option<String>> {
        self.read(|s| s.mapping.clone())
    }

    pub fn set_mapping(&self, mapping: Option<String>) -> Result<()> {
        self.update(|s| s.mapping = mapping)
    }

    /// Linked section, if any and still present.
    pub fn link(&self) -> Result<Option<Section>> {
        let id = self.store.read(|tree| {
            let link = match &tree.node(&self.id)?.body {
                Body::Section(state) => state.link.clone(),
                _ => return Err(Error::Deleted(self.id.clone())),
            };
            Ok(link.filter(|id| tree.contains(id)))
        })?;
        Ok(id.map(|id| Section::from_node(self.store.clone(), id)))
    }

    /// Link to the section named by id or name anywhere in the file, or unlink.
    pub fn set_link(&self, key: Option<String>) -> Result<()> {
        self.store.write(|tree| {
            let target = match key {
                Some(key) => Some(tree.search(None, Kind::Section, &key)?),
                None => None,
            };
            let node = tree.node_mut(&self.id)?;
            match &mut node.body {
                Body::Section(state) => state.link = target,
                _ => return Err(Error::Deleted(self.id.clone())),
            }
            node.updated_at = now();
            Ok(())
        })
    }

    /// Enclosing section; `None` for top-level sections.
    pub fn parent(&self) -> Result<Option<Section>> {
        let parent = view(self, |node| Ok(node.parent.clone()))?;
        Ok(parent.map(|id| Section::from_node(self.store.clone(), id)))
    }

    pub fn sections(&self) -> Result<Vec<Section>> {
        list(&self.store, self.parent_key())
    }

    pub fn get_section(&self, key: &str) -> Result<Section> {
        open(&self.store, self.parent_key(), key)
    }

    pub fn has_section(&self, key: &str) -> Result<bool> {
        has::<Section>(&self.store, self.parent_key(), key)
    }

    pub fn create_section(&self, name: String, type_name: String) -> Result<Section> {
        create(&self.store, self.parent_key(), name, type_name, Section::body())
    }

    pub fn delete_section(&self, key: &str) -> Result<bool> {
        delete::<Section>(&self.store, self.parent_key(), key)
    }

    pub fn properties(&self) -> Result<Vec<Property>> {
        list(&self.store, self.parent_key())
    }

    pub fn get_property(&self, key: &str) -> Result<Property> {
        open(&self.store, self.parent_key(), key)
    }

    pub fn has_property(&self, key: &str) -> Result<bool> {
        has::<Property>(&self.store, self.parent_key(), key)
    }

    /// Create an empty property of `dtype`.
    pub fn create_property(&self, name: String, dtype: DataType) -> Result<Property> {
        let state = PropertyState {
            unit: None,
            mapping: None,
            dtype,
            values: Vec::new(),
        };
        create(&self.store, self.parent_key(), name, String::new(), Body::Property(state))
    }

    /// Create a property holding `values`; its type is taken from the first value.
    pub fn create_property_with_value(&self, name: String, values: Vec<Value>) -> Result<Property> {
        let dtype = values
            .first()
            .map(|v| v.value.data_type())
            .ok_or_else(|| Error::InvalidArgument("property needs at least one value".to_string()))?;
        check_values(dtype, &values)?;
        let state = PropertyState {
            unit: None,
            mapping: None,
            dtype,
            values,
        };
        create(&self.store, self.parent_key(), name, String::new(), Body::Property(state))
    }

    pub fn delete_property(&self, key: &str) -> Result<bool> {
        delete::<Property>(&self.store, self.parent_key(), key)
    }
}

/// Named, typed values of a section.
#[derive(Debug, Clone)]
pub struct Property {
    store: Store,
    id: String,
}

stored_entity!(Property, Kind::Property);

impl NamedEntity for Property {}

impl Property {
    fn read<R>(&self, f: impl FnOnce(&PropertyState) -> R) -> Result<R> {
        view(self, |node| match &node.body {
            Body::Property(state) => Ok(f(state)),
            _ => Err(Error::Deleted(self.id.clone())),
        })
    }

    fn update(&self, f: impl FnOnce(&mut PropertyState) -> Result<()>) -> Result<()> {
        modify(self, |node| match &mut node.body {
            Body::Property(state) => f(state),
            _ => Err(Error::Deleted(self.id.clone())),
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

    pub fn mapping(&self) -> Result<Option<String>> {
        self.read(|s| s.mapping.clone())
    }

    pub fn set_mapping(&self, mapping: Option<String>) -> Result<()> {
        self.update(|s| {
            s.mapping = mapping;
            Ok(())
        })
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.read(|s| s.dtype)
    }

    pub fn values(&self) -> Result<Vec<Value>> {
        self.read(|s| s.values.clone())
    }

    /// Replace all values; each must fit the property's data type.
    pub fn set_values(&self, values: Vec<Value>) -> Result<()> {
        self.update(|s| {
            check_values(s.dtype, &values)?;
            s.values = values;
            Ok(())
        })
    }

    pub fn value_count(&self) -> Result<usize> {
        self.read(|s| s.values.len())
    }
}
