//! `DataArray::*` commands.
//!
//! Payloads travel as host numeric arrays in their stored type; one-dimensional
//! data is returned as a row.

use crate::error::{Error, Result};
use crate::ffi::{ClassId, Extractor, HostValue, Infusor};
use crate::registry::Registry;
use crate::store::{
    ArrayData, DataArray, DataType, Dimension, NamedEntity, Source, Stored, WithMetadata,
    WithSources,
};
use crate::structs::StructBuilder;

fn describe(da: &DataArray) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &[
            "id",
            "type",
            "name",
            "definition",
            "label",
            "shape",
            "unit",
            "polynom_coefficients",
        ],
    );
    sb.set(da.id())
        .set(da.type_name()?)
        .set(da.name()?)
        .set(da.definition()?)
        .set(da.label()?)
        .set(da.data_extent()?)
        .set(da.unit()?)
        .set(da.polynom_coefficients()?);
    sb.array()
}

fn data_type_of(class: ClassId) -> Option<DataType> {
    let dtype = match class {
        ClassId::Double => DataType::Double,
        ClassId::Single => DataType::Float,
        ClassId::Int8 => DataType::Int8,
        ClassId::Int16 => DataType::Int16,
        ClassId::Int32 => DataType::Int32,
        ClassId::Int64 => DataType::Int64,
        ClassId::UInt8 => DataType::UInt8,
        ClassId::UInt16 => DataType::UInt16,
        ClassId::UInt32 => DataType::UInt32,
        ClassId::UInt64 => DataType::UInt64,
        ClassId::Logical => DataType::Bool,
        _ => return None,
    };
    Some(dtype)
}

/// Host array holding `data` in its stored type; 1-d data becomes a row.
pub(super) fn to_host_array(data: ArrayData) -> HostValue {
    let ArrayData {
        dtype,
        mut extent,
        values,
    } = data;
    if extent.len() < 2 {
        extent.insert(0, 1);
    }
    match dtype {
        DataType::Bool => HostValue::Logical(values.into_iter().map(|v| v != 0.0).collect()),
        DataType::Float => HostValue::array(extent, values.into_iter().map(|v| v as f32).collect()),
        DataType::Int8 => HostValue::array(extent, values.into_iter().map(|v| v as i8).collect()),
        DataType::Int16 => HostValue::array(extent, values.into_iter().map(|v| v as i16).collect()),
        DataType::Int32 => HostValue::array(extent, values.into_iter().map(|v| v as i32).collect()),
        DataType::Int64 => HostValue::array(extent, values.into_iter().map(|v| v as i64).collect()),
        DataType::UInt8 => HostValue::array(extent, values.into_iter().map(|v| v as u8).collect()),
        DataType::UInt16 => HostValue::array(extent, values.into_iter().map(|v| v as u16).collect()),
        DataType::UInt32 => HostValue::array(extent, values.into_iter().map(|v| v as u32).collect()),
        DataType::UInt64 => HostValue::array(extent, values.into_iter().map(|v| v as u64).collect()),
        DataType::Double | DataType::String => HostValue::array(extent, values),
    }
}

fn read_all(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let da = input.entity::<DataArray>(1)?;
    output.set(0, to_host_array(da.read_all()?))
}

/// Replace the payload with the host array at position 2, taking its type and shape.
fn write_all(input: &Extractor<'_>, _output: &mut Infusor) -> Result<()> {
    let da = input.entity::<DataArray>(1)?;
    let data = match input.value(2)? {
        HostValue::Numeric(array) => {
            let dtype = data_type_of(array.data.class_id()).ok_or(Error::ArgumentType {
                pos: 2,
                expected: ClassId::Double,
                found: array.data.class_id(),
            })?;
            ArrayData::new(dtype, array.dims.clone(), array.data.to_f64_vec())?
        }
        HostValue::Logical(bits) => ArrayData::new(
            DataType::Bool,
            vec![1, bits.len()],
            bits.iter().map(|b| if *b { 1.0 } else { 0.0 }).collect(),
        )?,
        other => {
            return Err(Error::ArgumentType {
                pos: 2,
                expected: ClassId::Double,
                found: other.class_id(),
            })
        }
    };
    da.write_all(data)?;
    Ok(())
}

/// Struct array with one `{dtype, dimension}` record per dimension.
fn dimensions(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let da = input.entity::<DataArray>(1)?;
    let dims = da.dimensions()?;
    let mut sb = StructBuilder::new(&[1, dims.len()], &["dtype", "dimension"]);
    for dim in dims {
        sb.set(dim.dimension_type());
        match dim {
            Dimension::Set(d) => sb.set(d),
            Dimension::Sampled(d) => sb.set(d),
            Dimension::Range(d) => sb.set(d),
        };
    }
    output.set(0, sb.array()?)
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<DataArray>("DataArray")
        .desc(describe)
        .filtered(
            "sources",
            |da: &DataArray, accept: &dyn Fn(&Source) -> bool| da.sources(accept),
        )
        .setter("addSource", |da: &DataArray, key: String| da.add_source(key))
        .remover("removeSource", |da: &DataArray, key: &str| {
            da.remove_source(key)
        })
        .getter("openMetadataSection", |da: &DataArray| da.metadata())
        .opt_setter("metadata", |da: &DataArray, key: Option<String>| {
            da.set_metadata(key)
        })
        .setter("set_type", |da: &DataArray, ty: String| da.set_type(ty))
        .opt_setter("definition", |da: &DataArray, d: Option<String>| {
            da.set_definition(d)
        })
        .opt_setter("label", |da: &DataArray, l: Option<String>| da.set_label(l))
        .opt_setter("unit", |da: &DataArray, u: Option<String>| da.set_unit(u))
        .add("dimensions", dimensions)
        .method0("append_set_dimension", |da: &DataArray| {
            da.append_set_dimension()
        })
        .method1("append_range_dimension", |da: &DataArray, ticks: Vec<f64>| {
            da.append_range_dimension(ticks)
        })
        .method1("append_sampled_dimension", |da: &DataArray, interval: f64| {
            da.append_sampled_dimension(interval)
        })
        .method1("create_set_dimension", |da: &DataArray, index: usize| {
            da.create_set_dimension(index)
        })
        .method2(
            "create_range_dimension",
            |da: &DataArray, index: usize, ticks: Vec<f64>| da.create_range_dimension(index, ticks),
        )
        .method2(
            "create_sampled_dimension",
            |da: &DataArray, index: usize, interval: f64| {
                da.create_sampled_dimension(index, interval)
            },
        )
        .method1("delete_dimension", |da: &DataArray, index: usize| {
            da.delete_dimension(index)
        })
        .add("readAll", read_all)
        .add("writeAll", write_all)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_host_array_keeps_type_and_shape() {
        let data = ArrayData::new(DataType::Int16, vec![2, 2], vec![1.0, -2.0, 3.0, 4.0]).unwrap();
        let v = to_host_array(data);
        assert_eq!(v.class_id(), ClassId::Int16);
        assert_eq!(v.as_numeric().unwrap().dims, vec![2, 2]);
        assert_eq!(v.numbers::<i16>(), Some(&[1i16, -2, 3, 4][..]));
    }

    #[test]
    fn test_one_dimensional_data_is_a_row() {
        let data = ArrayData::new(DataType::Double, vec![3], vec![0.5; 3]).unwrap();
        let v = to_host_array(data);
        assert_eq!(v.as_numeric().unwrap().dims, vec![1, 3]);
    }

    #[test]
    fn test_class_mapping() {
        assert_eq!(data_type_of(ClassId::Single), Some(DataType::Float));
        assert_eq!(data_type_of(ClassId::Char), None);
    }
}
