//! `Section::*` and `Property::*` commands.
//!
//! Property values cross the boundary as a cell of `{value, uncertainty}`
//! records.

use crate::error::{Error, Result};
use crate::ffi::{Extractor, HostValue, Infusor};
use crate::registry::Registry;
use crate::store::{NamedEntity, Property, Section, Stored, Value, Variant};
use crate::structs::StructBuilder;

fn describe_section(section: &Section) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &["name", "id", "type", "definition", "repository", "mapping"],
    );
    sb.set(section.name()?)
        .set(section.id())
        .set(section.type_name()?)
        .set(section.definition()?)
        .set(section.repository()?)
        .set(section.mapping()?);
    sb.array()
}

fn describe_property(property: &Property) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &["id", "name", "definition", "unit", "mapping", "datatype"],
    );
    sb.set(property.id())
        .set(property.name()?)
        .set(property.definition()?)
        .set(property.unit()?)
        .set(property.mapping()?)
        .set(property.data_type()?.as_str());
    sb.array()
}

fn variant_to_host(variant: Variant) -> HostValue {
    match variant {
        Variant::Bool(b) => HostValue::logical(b),
        Variant::Double(d) => HostValue::scalar(d),
        Variant::String(s) => HostValue::Char(s),
    }
}

/// Cell of `{value, uncertainty}` records.
fn values_to_host(values: Vec<Value>) -> Result<HostValue> {
    let records = values
        .into_iter()
        .map(|v| {
            let mut sb = StructBuilder::new(&[1], &["value", "uncertainty"]);
            sb.set(variant_to_host(v.value)).set(v.uncertainty);
            sb.array()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(HostValue::cell(records))
}

fn unconvertible(value: &HostValue) -> Error {
    Error::ArgumentShape(format!(
        "cannot use a {} as a property value",
        value.class_id()
    ))
}

fn variant_from_host(value: &HostValue) -> Result<Variant> {
    match value {
        HostValue::Char(s) => Ok(Variant::String(s.clone())),
        HostValue::Logical(bits) if bits.len() == 1 => Ok(Variant::Bool(bits[0])),
        HostValue::Numeric(array) if array.data.len() == 1 => {
            Ok(Variant::Double(array.data.to_f64_vec()[0]))
        }
        other => Err(unconvertible(other)),
    }
}

/// Values from a cell of plain values or records, a struct array, or a single value.
fn values_from_host(value: &HostValue) -> Result<Vec<Value>> {
    match value {
        HostValue::Cell(items) => items
            .iter()
            .map(|item| match item {
                HostValue::Struct(_) => {
                    let mut values = values_from_host(item)?;
                    match values.len() {
                        1 => Ok(values.remove(0)),
                        _ => Err(unconvertible(item)),
                    }
                }
                other => variant_from_host(other).map(Value::new),
            })
            .collect(),
        HostValue::Struct(records) => (0..records.len())
            .map(|i| {
                let inner = records.field(i, "value").ok_or_else(|| unconvertible(value))?;
                let uncertainty = records
                    .field(i, "uncertainty")
                    .and_then(HostValue::scalar_value::<f64>)
                    .unwrap_or(0.0);
                Ok(Value {
                    value: variant_from_host(inner)?,
                    uncertainty,
                })
            })
            .collect(),
        other => Ok(vec![Value::new(variant_from_host(other)?)]),
    }
}

/// Cell with one `{name, id, definition, mapping, unit, values}` record per property.
fn properties(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let section = input.entity::<Section>(1)?;
    let records = section
        .properties()?
        .into_iter()
        .map(|p| {
            let mut sb = StructBuilder::new(
                &[1],
                &["name", "id", "definition", "mapping", "unit", "values"],
            );
            sb.set(p.name()?)
                .set(p.id())
                .set(p.definition()?)
                .set(p.mapping()?)
                .set(p.unit()?)
                .set(values_to_host(p.values()?)?);
            sb.array()
        })
        .collect::<Result<Vec<_>>>()?;
    output.set(0, records)
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<Section>("Section")
        .desc(describe_section)
        .getter("sections", |s: &Section| s.sections())
        .get_by("openSection", |s: &Section, key: &str| s.get_section(key))
        .get_by("hasSection", |s: &Section, key: &str| s.has_section(key))
        .get_by("hasProperty", |s: &Section, key: &str| s.has_property(key))
        .getter("openLink", |s: &Section| s.link())
        .opt_setter("link", |s: &Section, key: Option<String>| s.set_link(key))
        .getter("parent", |s: &Section| s.parent())
        .setter("set_type", |s: &Section, ty: String| s.set_type(ty))
        .opt_setter("definition", |s: &Section, d: Option<String>| {
            s.set_definition(d)
        })
        .opt_setter("repository", |s: &Section, r: Option<String>| {
            s.set_repository(r)
        })
        .opt_setter("mapping", |s: &Section, m: Option<String>| s.set_mapping(m))
        .method2("createSection", |s: &Section, name: String, ty: String| {
            s.create_section(name, ty)
        })
        .remover("deleteSection", |s: &Section, key: &str| s.delete_section(key))
        .get_by("openProperty", |s: &Section, key: &str| s.get_property(key))
        .remover("deleteProperty", |s: &Section, key: &str| {
            s.delete_property(key)
        })
        .add("properties", properties)
        .method2(
            "createProperty",
            |s: &Section, name: String, dtype: String| -> Result<Property> {
                Ok(s.create_property(name, dtype.parse()?)?)
            },
        )
        .method2(
            "createPropertyWithValue",
            |s: &Section, name: String, values: HostValue| -> Result<Property> {
                Ok(s.create_property_with_value(name, values_from_host(&values)?)?)
            },
        )
        .finish()?;

    registry
        .classdef::<Property>("Property")
        .desc(describe_property)
        .opt_setter("definition", |p: &Property, d: Option<String>| {
            p.set_definition(d)
        })
        .opt_setter("unit", |p: &Property, u: Option<String>| p.set_unit(u))
        .opt_setter("mapping", |p: &Property, m: Option<String>| p.set_mapping(m))
        .getter("values", |p: &Property| -> Result<HostValue> {
            values_to_host(p.values()?)
        })
        .setter("updateValues", |p: &Property, values: HostValue| -> Result<()> {
            p.set_values(values_from_host(&values)?)?;
            Ok(())
        })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_from_plain_cell() {
        let host = HostValue::cell(vec![HostValue::scalar(1.5f64), HostValue::scalar(2.0f64)]);
        let values = values_from_host(&host).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value, Variant::Double(1.5));
        assert_eq!(values[1].uncertainty, 0.0);
    }

    #[test]
    fn test_values_from_records() {
        let mut sb = StructBuilder::new(&[1], &["value", "uncertainty"]);
        sb.set("mV").set(0.25f64);
        let record = sb.array().unwrap();
        let values = values_from_host(&HostValue::cell(vec![record])).unwrap();
        assert_eq!(values[0].value, Variant::String("mV".into()));
        assert_eq!(values[0].uncertainty, 0.25);
    }

    #[test]
    fn test_values_round_trip_through_records() {
        let host = values_to_host(vec![Value::new(Variant::Bool(true))]).unwrap();
        let cell = host.as_cell().unwrap();
        let record = cell[0].as_struct().unwrap();
        assert_eq!(record.field(0, "value"), Some(&HostValue::logical(true)));
        assert_eq!(values_from_host(&host).unwrap()[0].value, Variant::Bool(true));
    }

    #[test]
    fn test_unsupported_value() {
        let host = HostValue::cell(vec![HostValue::Empty]);
        assert!(matches!(
            values_from_host(&host),
            Err(Error::ArgumentShape(_))
        ));
    }
}
