//! Host-side value representation.
//!
//! The host runtime passes and receives dynamically typed arrays. This module
//! models them as [`HostValue`] so that the argument view and result sink can
//! be written against a single codec.

use std::fmt;

/// Class of a host value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    /// Character array (string).
    Char,
    /// Double precision numeric array.
    Double,
    /// Single precision numeric array.
    Single,
    /// Signed 8-bit integer array.
    Int8,
    /// Unsigned 8-bit integer array.
    UInt8,
    /// Signed 16-bit integer array.
    Int16,
    /// Unsigned 16-bit integer array.
    UInt16,
    /// Signed 32-bit integer array.
    Int32,
    /// Unsigned 32-bit integer array.
    UInt32,
    /// Signed 64-bit integer array.
    Int64,
    /// Unsigned 64-bit integer array.
    UInt64,
    /// Logical array.
    Logical,
    /// Cell array.
    Cell,
    /// Struct array.
    Struct,
    /// Empty value.
    Void,
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassId::Char => "char",
            ClassId::Double => "double",
            ClassId::Single => "single",
            ClassId::Int8 => "int8",
            ClassId::UInt8 => "uint8",
            ClassId::Int16 => "int16",
            ClassId::UInt16 => "uint16",
            ClassId::Int32 => "int32",
            ClassId::UInt32 => "uint32",
            ClassId::Int64 => "int64",
            ClassId::UInt64 => "uint64",
            ClassId::Logical => "logical",
            ClassId::Cell => "cell",
            ClassId::Struct => "struct",
            ClassId::Void => "void",
        };
        f.write_str(name)
    }
}

/// Typed storage behind a numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Double(Vec<f64>),
    Single(Vec<f32>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
}

/// Rust primitives that map one-to-one onto a host numeric class.
pub trait Scalar: Copy + 'static {
    /// Host class with exactly this width and signedness.
    const CLASS: ClassId;

    /// Wrap a vector into numeric storage.
    fn wrap(values: Vec<Self>) -> NumericData;

    /// Borrow storage as a slice of `Self` if the class matches exactly.
    fn slice(data: &NumericData) -> Option<&[Self]>;
}

macro_rules! define_scalar {
    ($ty:ty, $variant:ident) => {
        impl Scalar for $ty {
            const CLASS: ClassId = ClassId::$variant;

            fn wrap(values: Vec<Self>) -> NumericData {
                NumericData::$variant(values)
            }

            fn slice(data: &NumericData) -> Option<&[Self]> {
                match data {
                    NumericData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

define_scalar!(f64, Double);
define_scalar!(f32, Single);
define_scalar!(i8, Int8);
define_scalar!(u8, UInt8);
define_scalar!(i16, Int16);
define_scalar!(u16, UInt16);
define_scalar!(i32, Int32);
define_scalar!(u32, UInt32);
define_scalar!(i64, Int64);
define_scalar!(u64, UInt64);

impl NumericData {
    /// Host class of the storage.
    pub fn class_id(&self) -> ClassId {
        match self {
            NumericData::Double(_) => ClassId::Double,
            NumericData::Single(_) => ClassId::Single,
            NumericData::Int8(_) => ClassId::Int8,
            NumericData::UInt8(_) => ClassId::UInt8,
            NumericData::Int16(_) => ClassId::Int16,
            NumericData::UInt16(_) => ClassId::UInt16,
            NumericData::Int32(_) => ClassId::Int32,
            NumericData::UInt32(_) => ClassId::UInt32,
            NumericData::Int64(_) => ClassId::Int64,
            NumericData::UInt64(_) => ClassId::UInt64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            NumericData::Double(v) => v.len(),
            NumericData::Single(v) => v.len(),
            NumericData::Int8(v) => v.len(),
            NumericData::UInt8(v) => v.len(),
            NumericData::Int16(v) => v.len(),
            NumericData::UInt16(v) => v.len(),
            NumericData::Int32(v) => v.len(),
            NumericData::UInt32(v) => v.len(),
            NumericData::Int64(v) => v.len(),
            NumericData::UInt64(v) => v.len(),
        }
    }

    /// Whether the storage holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lossy conversion of every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            NumericData::Double(v) => v.clone(),
            NumericData::Single(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int8(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt8(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int16(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt16(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt32(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            NumericData::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// A numeric array with its dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    /// Dimensions (at least two, host convention).
    pub dims: Vec<usize>,
    /// Element storage.
    pub data: NumericData,
}

/// A struct array: `records × fields` values stored record by record.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    /// Dimensions of the struct array.
    pub dims: Vec<usize>,
    /// Field names in declaration order.
    pub fields: Vec<String>,
    /// Field values, record-major.
    pub values: Vec<HostValue>,
}

impl StructArray {
    /// Number of records.
    ///
    /// Saturates when the host sends dimensions whose product overflows.
    pub fn len(&self) -> usize {
        self.dims
            .iter()
            .try_fold(1usize, |acc, n| acc.checked_mul(*n))
            .unwrap_or(usize::MAX)
    }

    /// Whether the struct array has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of `name` in record `record`.
    pub fn field(&self, record: usize, name: &str) -> Option<&HostValue> {
        let idx = self.fields.iter().position(|f| f == name)?;
        self.values.get(record * self.fields.len() + idx)
    }
}

/// A value crossing the host boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Character array.
    Char(String),
    /// Numeric array.
    Numeric(NumericArray),
    /// Logical row vector.
    Logical(Vec<bool>),
    /// Cell row vector.
    Cell(Vec<HostValue>),
    /// Struct array.
    Struct(StructArray),
    /// Empty matrix; used for absent optional values.
    Empty,
}

impl HostValue {
    /// Create a character array.
    pub fn string(s: impl Into<String>) -> Self {
        HostValue::Char(s.into())
    }

    /// Create a 1x1 numeric array.
    pub fn scalar<T: Scalar>(v: T) -> Self {
        HostValue::Numeric(NumericArray {
            dims: vec![1, 1],
            data: T::wrap(vec![v]),
        })
    }

    /// Create a 1xN numeric row vector.
    pub fn row<T: Scalar>(values: Vec<T>) -> Self {
        HostValue::Numeric(NumericArray {
            dims: vec![1, values.len()],
            data: T::wrap(values),
        })
    }

    /// Create a numeric array with explicit dimensions.
    pub fn array<T: Scalar>(dims: Vec<usize>, values: Vec<T>) -> Self {
        HostValue::Numeric(NumericArray {
            dims,
            data: T::wrap(values),
        })
    }

    /// Create a 1x1 logical.
    pub fn logical(v: bool) -> Self {
        HostValue::Logical(vec![v])
    }

    /// Create a cell row vector.
    pub fn cell(values: Vec<HostValue>) -> Self {
        HostValue::Cell(values)
    }

    /// Host class of this value.
    pub fn class_id(&self) -> ClassId {
        match self {
            HostValue::Char(_) => ClassId::Char,
            HostValue::Numeric(a) => a.data.class_id(),
            HostValue::Logical(_) => ClassId::Logical,
            HostValue::Cell(_) => ClassId::Cell,
            HostValue::Struct(_) => ClassId::Struct,
            HostValue::Empty => ClassId::Void,
        }
    }

    /// Whether this is the empty value.
    pub fn is_empty(&self) -> bool {
        matches!(self, HostValue::Empty)
    }

    /// Borrow as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Char(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a cell.
    pub fn as_cell(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Cell(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a struct array.
    pub fn as_struct(&self) -> Option<&StructArray> {
        match self {
            HostValue::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a numeric array.
    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            HostValue::Numeric(a) => Some(a),
            _ => None,
        }
    }

    /// Elements of a numeric array of exactly class `T`.
    pub fn numbers<T: Scalar>(&self) -> Option<&[T]> {
        self.as_numeric().and_then(|a| T::slice(&a.data))
    }

    /// First element of a numeric array of exactly class `T`.
    pub fn scalar_value<T: Scalar>(&self) -> Option<T> {
        self.numbers::<T>().and_then(|v| v.first().copied())
    }

    /// First element of a logical array.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Logical(v) => v.first().copied(),
            _ => None,
        }
    }
}
