//! Positional views over the host's inbound arguments and outbound results.

use tracing::debug;

use super::convert::ToHost;
use super::handles::{Entity, Handle};
use super::value::{ClassId, HostValue, Scalar};
use crate::error::{Error, Result};

/// Read-only view over a call's arguments.
///
/// Position 0 holds the command name, position 1 the receiver token for
/// instance methods.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    args: &'a [HostValue],
}

impl<'a> Extractor<'a> {
    /// Wrap the host's argument list.
    pub fn new(args: &'a [HostValue]) -> Self {
        Self { args }
    }

    /// Number of arguments, command name included.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether no arguments were passed.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw value at `pos`.
    pub fn value(&self, pos: usize) -> Result<&'a HostValue> {
        self.args.get(pos).ok_or_else(|| {
            Error::ArgumentShape(format!(
                "argument {} requested but only {} given",
                pos,
                self.args.len()
            ))
        })
    }

    /// Host class of the value at `pos`.
    pub fn class_id(&self, pos: usize) -> Result<ClassId> {
        self.value(pos).map(HostValue::class_id)
    }

    /// Whether the value at `pos` is a string.
    pub fn is_str(&self, pos: usize) -> bool {
        matches!(self.class_id(pos), Ok(ClassId::Char))
    }

    fn mismatch(&self, pos: usize, expected: ClassId) -> Error {
        Error::ArgumentType {
            pos,
            expected,
            found: self
                .args
                .get(pos)
                .map(HostValue::class_id)
                .unwrap_or(ClassId::Void),
        }
    }

    /// String at `pos`.
    pub fn str(&self, pos: usize) -> Result<String> {
        self.value(pos)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.mismatch(pos, ClassId::Char))
    }

    /// Scalar of exactly class `T` at `pos`; no widening or sign changes.
    pub fn num<T: Scalar>(&self, pos: usize) -> Result<T> {
        self.value(pos)?
            .scalar_value::<T>()
            .ok_or_else(|| self.mismatch(pos, T::CLASS))
    }

    /// `uint64` scalar at `pos`.
    pub fn uint64(&self, pos: usize) -> Result<u64> {
        self.num::<u64>(pos)
    }

    /// Logical scalar at `pos`.
    pub fn logical(&self, pos: usize) -> Result<bool> {
        self.value(pos)?
            .as_bool()
            .ok_or_else(|| self.mismatch(pos, ClassId::Logical))
    }

    /// Handle named by the token at `pos`. Does not take ownership.
    pub fn hdl(&self, pos: usize) -> Result<Handle> {
        self.uint64(pos).map(Handle::from_token)
    }

    /// Entity of type `T` behind the token at `pos`.
    pub fn entity<T: Entity>(&self, pos: usize) -> Result<T> {
        self.hdl(pos)?.get::<T>()
    }

    /// A cell of strings at `pos`; a single string is accepted as one element.
    pub fn strings(&self, pos: usize) -> Result<Vec<String>> {
        match self.value(pos)? {
            HostValue::Char(s) => Ok(vec![s.clone()]),
            HostValue::Cell(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| self.mismatch(pos, ClassId::Char))
                })
                .collect(),
            _ => Err(self.mismatch(pos, ClassId::Cell)),
        }
    }

    /// A `double` vector at `pos`.
    pub fn doubles(&self, pos: usize) -> Result<Vec<f64>> {
        match self.value(pos)? {
            HostValue::Empty => Ok(Vec::new()),
            v => v
                .numbers::<f64>()
                .map(<[f64]>::to_vec)
                .ok_or_else(|| self.mismatch(pos, ClassId::Double)),
        }
    }

    /// Elements of the cell at `pos`; any other value is a one-element list.
    pub fn values(&self, pos: usize) -> Result<Vec<HostValue>> {
        match self.value(pos)? {
            HostValue::Cell(items) => Ok(items.clone()),
            v => Ok(vec![v.clone()]),
        }
    }

    /// Check arity and positional classes, starting at position 0.
    ///
    /// With `fatal` a mismatch is reported as [`Error::ArgumentShape`] so that
    /// nothing downstream runs against malformed input.
    pub fn require_arguments(&self, expected: &[ClassId], fatal: bool) -> Result<bool> {
        let ok = expected.len() <= self.args.len()
            && expected
                .iter()
                .zip(self.args)
                .all(|(class, value)| value.class_id() == *class);

        if !ok && fatal {
            let found: Vec<String> = self.args.iter().map(|v| v.class_id().to_string()).collect();
            let wanted: Vec<String> = expected.iter().map(ToString::to_string).collect();
            return Err(Error::ArgumentShape(format!(
                "expected ({}), got ({})",
                wanted.join(", "),
                found.join(", ")
            )));
        }

        Ok(ok)
    }
}

/// An argument type that can be extracted from a position.
pub trait FromArg: Sized {
    /// Extract from `input` at `pos`.
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self>;
}

impl FromArg for String {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.str(pos)
    }
}

impl FromArg for f64 {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.num::<f64>(pos)
    }
}

impl FromArg for u64 {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.uint64(pos)
    }
}

/// An index or count: a `uint64`, or a `double` holding a non-negative integer.
impl FromArg for usize {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        if input.class_id(pos)? == ClassId::UInt64 {
            return Ok(input.uint64(pos)? as usize);
        }
        let v = input.num::<f64>(pos)?;
        if v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
            Ok(v as usize)
        } else {
            Err(Error::ArgumentShape(format!(
                "argument {} must be a non-negative integer, got {}",
                pos, v
            )))
        }
    }
}

/// Absent when the position is past the end or holds the empty value.
impl<T: FromArg> FromArg for Option<T> {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        if pos >= input.len() || input.value(pos)?.is_empty() {
            return Ok(None);
        }
        T::from_arg(input, pos).map(Some)
    }
}

impl FromArg for bool {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.logical(pos)
    }
}

impl FromArg for Vec<String> {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.strings(pos)
    }
}

impl FromArg for Vec<f64> {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.doubles(pos)
    }
}

impl FromArg for Handle {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.hdl(pos)
    }
}

impl FromArg for HostValue {
    fn from_arg(input: &Extractor<'_>, pos: usize) -> Result<Self> {
        input.value(pos).cloned()
    }
}

/// Implement [`FromArg`] for entity types, recovering them through their token.
#[macro_export]
macro_rules! entity_from_arg {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ffi::FromArg for $ty {
                fn from_arg(
                    input: &$crate::ffi::Extractor<'_>,
                    pos: usize,
                ) -> $crate::Result<Self> {
                    input.entity::<$ty>(pos)
                }
            }
        )+
    };
}

/// Write-only view over a call's result slots.
#[derive(Debug)]
pub struct Infusor {
    slots: Vec<Option<HostValue>>,
}

impl Infusor {
    /// Create a sink for `nlhs` requested outputs.
    ///
    /// Slot 0 always exists, as the host's implicit answer.
    pub fn new(nlhs: usize) -> Self {
        Self {
            slots: vec![None; nlhs.max(1)],
        }
    }

    /// Number of result slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no result slots. Always false.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Assign slot `pos`.
    pub fn set(&mut self, pos: usize, value: impl ToHost) -> Result<()> {
        let bound = self.slots.len();
        let slot = self.slots.get_mut(pos).ok_or_else(|| {
            debug!(pos, bound, "result slot out of range");
            Error::OutputOverflow { pos, bound }
        })?;
        *slot = Some(value.to_host());
        Ok(())
    }

    /// Value currently in slot `pos`.
    pub fn get(&self, pos: usize) -> Option<&HostValue> {
        self.slots.get(pos).and_then(Option::as_ref)
    }

    /// Whether no slot has been assigned.
    pub fn is_untouched(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Consume the sink, yielding every slot.
    pub fn into_slots(self) -> Vec<Option<HostValue>> {
        self.slots
    }
}
