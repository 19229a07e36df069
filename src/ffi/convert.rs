//! Conversion of native results into host values.

use super::handles::{Entity, Handle};
use super::value::HostValue;

/// A native value that can be written into a result slot.
pub trait ToHost {
    /// Produce the host representation.
    fn to_host(self) -> HostValue;
}

impl ToHost for HostValue {
    fn to_host(self) -> HostValue {
        self
    }
}

impl ToHost for String {
    fn to_host(self) -> HostValue {
        HostValue::Char(self)
    }
}

impl ToHost for &str {
    fn to_host(self) -> HostValue {
        HostValue::string(self)
    }
}

impl ToHost for bool {
    fn to_host(self) -> HostValue {
        HostValue::logical(self)
    }
}

impl ToHost for f64 {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self)
    }
}

impl ToHost for u64 {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self)
    }
}

impl ToHost for i64 {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self)
    }
}

impl ToHost for u32 {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self)
    }
}

impl ToHost for usize {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self as u64)
    }
}

impl ToHost for Vec<f64> {
    fn to_host(self) -> HostValue {
        HostValue::row(self)
    }
}

impl ToHost for Vec<u64> {
    fn to_host(self) -> HostValue {
        HostValue::row(self)
    }
}

impl ToHost for Vec<usize> {
    fn to_host(self) -> HostValue {
        HostValue::row(self.into_iter().map(|n| n as u64).collect::<Vec<u64>>())
    }
}

impl ToHost for Vec<String> {
    fn to_host(self) -> HostValue {
        HostValue::Cell(self.into_iter().map(HostValue::Char).collect())
    }
}

impl ToHost for Vec<HostValue> {
    fn to_host(self) -> HostValue {
        HostValue::Cell(self)
    }
}

impl<T: ToHost> ToHost for Option<T> {
    fn to_host(self) -> HostValue {
        match self {
            Some(v) => v.to_host(),
            None => HostValue::Empty,
        }
    }
}

impl ToHost for Handle {
    fn to_host(self) -> HostValue {
        HostValue::scalar(self.address())
    }
}

impl ToHost for Vec<Handle> {
    fn to_host(self) -> HostValue {
        HostValue::Cell(self.into_iter().map(ToHost::to_host).collect())
    }
}

impl<T: Entity + ToHost> ToHost for Vec<T> {
    fn to_host(self) -> HostValue {
        HostValue::Cell(self.into_iter().map(ToHost::to_host).collect())
    }
}

/// Implement [`ToHost`] for an entity type and collections of it.
///
/// A single entity is boxed into a fresh [`Handle`]; a collection becomes a
/// cell of tokens.
#[macro_export]
macro_rules! entity_to_host {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ffi::ToHost for $ty {
                fn to_host(self) -> $crate::ffi::HostValue {
                    $crate::ffi::ToHost::to_host($crate::ffi::Handle::new(self))
                }
            }
        )+
    };
}
