//! Field-by-field construction of host struct arrays.

use crate::error::{Error, Result};
use crate::ffi::{HostValue, StructArray, ToHost};

/// Builds a struct array by assigning fields in declaration order.
///
/// Fields that are never assigned, or assigned an absent optional, are
/// present in the result as [`HostValue::Empty`].
///
/// # Example
///
/// ```
/// use nixmx::StructBuilder;
///
/// let mut sb = StructBuilder::new(&[1], &["name", "unit"]);
/// sb.set("trace").set(None::<String>);
/// let record = sb.array().unwrap();
/// let s = record.as_struct().unwrap();
/// assert!(s.field(0, "unit").unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct StructBuilder {
    dims: Vec<usize>,
    fields: Vec<String>,
    values: Vec<HostValue>,
    cursor: usize,
}

impl StructBuilder {
    /// Create a builder for `product(dims)` records with the given fields.
    pub fn new(dims: &[usize], fields: &[&str]) -> Self {
        let records: usize = dims.iter().product();
        Self {
            dims: dims.to_vec(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            values: vec![HostValue::Empty; records * fields.len()],
            cursor: 0,
        }
    }

    /// Assign the next field of the current record.
    pub fn set(&mut self, value: impl ToHost) -> &mut Self {
        if let Some(slot) = self.values.get_mut(self.cursor) {
            *slot = value.to_host();
        }
        self.cursor += 1;
        self
    }

    /// Skip to the first field of the next record.
    pub fn next_record(&mut self) -> &mut Self {
        let width = self.fields.len();
        if width > 0 && self.cursor % width != 0 {
            self.cursor += width - self.cursor % width;
        }
        self
    }

    /// Finish the struct array.
    pub fn array(self) -> Result<HostValue> {
        if self.cursor > self.values.len() {
            return Err(Error::StructOverflow {
                assigned: self.cursor,
                capacity: self.values.len(),
            });
        }
        Ok(HostValue::Struct(StructArray {
            dims: self.dims,
            fields: self.fields,
            values: self.values,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_in_order() {
        let mut sb = StructBuilder::new(&[1], &["id", "name", "shape"]);
        sb.set("abc").set("trace").set(vec![3usize, 4]);
        let v = sb.array().unwrap();
        let s = v.as_struct().unwrap();
        assert_eq!(s.field(0, "name"), Some(&HostValue::string("trace")));
        assert_eq!(
            s.field(0, "shape").and_then(|v| v.numbers::<u64>()),
            Some(&[3u64, 4][..])
        );
    }

    #[test]
    fn test_absent_fields_are_present_and_empty() {
        let mut sb = StructBuilder::new(&[1], &["a", "b", "c"]);
        sb.set(None::<String>);
        let v = sb.array().unwrap();
        let s = v.as_struct().unwrap();
        assert_eq!(s.fields.len(), 3);
        assert!(s.field(0, "a").unwrap().is_empty());
        assert!(s.field(0, "c").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_records() {
        let mut sb = StructBuilder::new(&[2, 1], &["name", "id"]);
        sb.set("first").next_record().set("second").set("2");
        let v = sb.array().unwrap();
        let s = v.as_struct().unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.field(0, "id").unwrap().is_empty());
        assert_eq!(s.field(1, "id"), Some(&HostValue::string("2")));
    }

    #[test]
    fn test_overflow_is_reported() {
        let mut sb = StructBuilder::new(&[1], &["only"]);
        sb.set(1.0f64).set(2.0f64);
        assert!(matches!(
            sb.array(),
            Err(Error::StructOverflow {
                assigned: 2,
                capacity: 1
            })
        ));
    }
}
