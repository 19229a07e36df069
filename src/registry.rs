//! Command registry and per-class binding builder.
//!
//! Every command has the uniform signature `(Extractor, Infusor) -> Result<()>`.
//! [`ClassDef`] adapts strongly typed native methods into that signature:
//! the receiver is recovered from position 1, further arguments from
//! positions 2.. through [`FromArg`], and the return value is written to
//! result slot 0 through [`ToHost`].

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ffi::{Entity, Extractor, FromArg, HostValue, Infusor, ToHost};

/// A type-erased command.
pub type Method = Box<dyn Fn(&Extractor<'_>, &mut Infusor) -> Result<()> + Send + Sync>;

/// A native return value: unit produces no output, anything else is written
/// to result slot 0.
pub trait IntoOutput {
    /// Write `self` into `output`.
    fn emit(self, output: &mut Infusor) -> Result<()>;
}

impl<T: ToHost> IntoOutput for T {
    fn emit(self, output: &mut Infusor) -> Result<()> {
        output.set(0, self)
    }
}

impl IntoOutput for () {
    fn emit(self, _output: &mut Infusor) -> Result<()> {
        Ok(())
    }
}

/// Table mapping `"Class::method"` names to commands.
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, Method>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.methods.len())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command.
    ///
    /// Duplicate names are rejected and the existing entry is kept.
    pub fn add<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&Extractor<'_>, &mut Infusor) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.methods.contains_key(&name) {
            warn!(command = %name, "duplicate registration rejected");
            return Err(Error::DuplicateCommand(name));
        }
        debug!(command = %name, "registered");
        self.methods.insert(name, Box::new(f));
        Ok(())
    }

    /// Begin registering methods of class `class` for entity type `T`.
    pub fn classdef<T: Entity>(&mut self, class: &str) -> ClassDef<'_, T> {
        ClassDef {
            registry: self,
            class: class.to_string(),
            error: None,
            _entity: PhantomData,
        }
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run command `name`.
    ///
    /// Returns `Ok(false)` without touching `output` if `name` is unknown.
    pub fn dispatch(&self, name: &str, input: &Extractor<'_>, output: &mut Infusor) -> Result<bool> {
        match self.methods.get(name) {
            Some(method) => {
                method(input, output)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Fluent builder registering methods under a `"Class::"` prefix.
///
/// Registration errors are collected; [`ClassDef::finish`] reports the first.
#[must_use = "call finish() to observe registration errors"]
pub struct ClassDef<'r, T> {
    registry: &'r mut Registry,
    class: String,
    error: Option<Error>,
    _entity: PhantomData<fn() -> T>,
}

impl<'r, T: Entity> ClassDef<'r, T> {
    /// Register a raw command under this class.
    pub fn add<F>(mut self, method: &str, f: F) -> Self
    where
        F: Fn(&Extractor<'_>, &mut Infusor) -> Result<()> + Send + Sync + 'static,
    {
        let name = format!("{}::{}", self.class, method);
        if let Err(err) = self.registry.add(name, f) {
            self.error.get_or_insert(err);
        }
        self
    }

    /// Register `Class::describe`, producing a record for the receiver.
    pub fn desc<F>(self, f: F) -> Self
    where
        F: Fn(&T) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.method0("describe", f)
    }

    /// Register a method without arguments.
    pub fn method0<R, E, F>(self, method: &str, f: F) -> Self
    where
        R: IntoOutput + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.add(method, move |input, output| {
            let this = input.entity::<T>(1)?;
            f(&this).map_err(Into::<Error>::into)?.emit(output)
        })
    }

    /// Register a method with one argument.
    pub fn method1<A, R, E, F>(self, method: &str, f: F) -> Self
    where
        A: FromArg + 'static,
        R: IntoOutput + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.add(method, move |input, output| {
            let this = input.entity::<T>(1)?;
            let a = A::from_arg(input, 2)?;
            f(&this, a).map_err(Into::<Error>::into)?.emit(output)
        })
    }

    /// Register a method with two arguments.
    pub fn method2<A, B, R, E, F>(self, method: &str, f: F) -> Self
    where
        A: FromArg + 'static,
        B: FromArg + 'static,
        R: IntoOutput + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, A, B) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.add(method, move |input, output| {
            let this = input.entity::<T>(1)?;
            let a = A::from_arg(input, 2)?;
            let b = B::from_arg(input, 3)?;
            f(&this, a, b).map_err(Into::<Error>::into)?.emit(output)
        })
    }

    /// Register a method with three arguments.
    pub fn method3<A, B, C, R, E, F>(self, method: &str, f: F) -> Self
    where
        A: FromArg + 'static,
        B: FromArg + 'static,
        C: FromArg + 'static,
        R: IntoOutput + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, A, B, C) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.add(method, move |input, output| {
            let this = input.entity::<T>(1)?;
            let a = A::from_arg(input, 2)?;
            let b = B::from_arg(input, 3)?;
            let c = C::from_arg(input, 4)?;
            f(&this, a, b, c).map_err(Into::<Error>::into)?.emit(output)
        })
    }

    /// Register a zero-argument getter.
    pub fn getter<R, E, F>(self, method: &str, f: F) -> Self
    where
        R: ToHost + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.method0(method, f)
    }

    /// Register a getter keyed by a name or id string.
    pub fn get_by<R, E, F>(self, method: &str, f: F) -> Self
    where
        R: ToHost + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, &str) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.method1(method, move |this: &T, key: String| f(this, &key))
    }

    /// Register a single-argument setter.
    pub fn setter<A, E, F>(self, method: &str, f: F) -> Self
    where
        A: FromArg + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, A) -> std::result::Result<(), E> + Send + Sync + 'static,
    {
        self.method1(method, f)
    }

    /// Register `set_<field>` and its clearing twin `set_none_<field>`.
    pub fn opt_setter<A, E, F>(self, field: &str, f: F) -> Self
    where
        A: FromArg + 'static,
        E: Into<Error> + 'static,
        F: Fn(&T, Option<A>) -> std::result::Result<(), E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let clear = Arc::clone(&f);
        self.method1(&format!("set_{}", field), move |this: &T, value: A| {
            (*f)(this, Some(value))
        })
        .method0(&format!("set_none_{}", field), move |this: &T| (*clear)(this, None))
    }

    /// Register a predicate-filtered collection getter.
    ///
    /// The host cannot pass predicates, so every element is accepted.
    pub fn filtered<S, E, F>(self, method: &str, f: F) -> Self
    where
        S: 'static,
        Vec<S>: ToHost,
        E: Into<Error> + 'static,
        F: Fn(&T, &dyn Fn(&S) -> bool) -> std::result::Result<Vec<S>, E> + Send + Sync + 'static,
    {
        self.method0(method, move |this: &T| f(this, &|_: &S| true))
    }

    /// Register a remover returning whether something was removed.
    pub fn remover<E, F>(self, method: &str, f: F) -> Self
    where
        E: Into<Error> + 'static,
        F: Fn(&T, &str) -> std::result::Result<bool, E> + Send + Sync + 'static,
    {
        self.method1(method, move |this: &T, key: String| f(this, &key))
    }

    /// Finish the class, reporting the first registration error.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
