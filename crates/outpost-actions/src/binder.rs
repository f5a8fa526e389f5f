//! Argument binding: matches untyped wire arguments to an action's
//! declared parameter list.
//!
//! An action declares its parameters as a tuple of three kinds:
//!
//! - [`ProtocolVersion`]: injected from the request, never read from `arguments`.
//!   Only valid as the first element.
//! - [`Arg<T>`]: one required positional argument, decoded into `T`.
//! - [`Rest<T>`]: every remaining argument, each decoded into `T`.
//!   Only valid as the last element.
//!
//! The tuple is the descriptor: [`Signature::of`] reads the kinds off it and
//! [`bind`] walks it left to right. Arguments past a non-variadic list are
//! dropped so newer orchestrators can send trailing fields older agents
//! don't know about.

use std::any::type_name;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde_json::Value;

use outpost_core::ProtocolVersion;

use crate::error::BindError;

// ── Parameter kinds ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Injected protocol version.
    Protocol,
    /// One required positional argument.
    Required,
    /// Trailing repeatable argument.
    Variadic,
}

/// Required positional parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg<T>(pub T);

impl<T> Arg<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Arg<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Trailing variadic parameter. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rest<T>(pub Vec<T>);

impl<T> Rest<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Deref for Rest<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

// ── Cursor ────────────────────────────────────────────────────────────────────

/// Walks the request's arguments while parameters are bound.
pub struct ArgCursor {
    protocol: ProtocolVersion,
    args: std::vec::IntoIter<Value>,
    position: usize,
    required: usize,
    supplied: usize,
}

impl ArgCursor {
    fn new(protocol: ProtocolVersion, arguments: Vec<Value>, required: usize) -> Self {
        let supplied = arguments.len();
        Self {
            protocol,
            args: arguments.into_iter(),
            position: 0,
            required,
            supplied,
        }
    }

    fn next_arg(&mut self) -> Option<(usize, Value)> {
        let value = self.args.next()?;
        let position = self.position;
        self.position += 1;
        Some((position, value))
    }

    fn remaining(&self) -> usize {
        self.args.len()
    }
}

fn coerce<T: DeserializeOwned>(position: usize, value: Value) -> Result<T, BindError> {
    serde_json::from_value(value).map_err(|e| BindError::Coercion {
        position,
        expected: type_name::<T>(),
        message: e.to_string(),
    })
}

// ── Param / Params ────────────────────────────────────────────────────────────

/// One element of a parameter tuple.
pub trait Param: Sized + Send + 'static {
    const KIND: ParamKind;

    fn take(cursor: &mut ArgCursor) -> Result<Self, BindError>;
}

impl Param for ProtocolVersion {
    const KIND: ParamKind = ParamKind::Protocol;

    fn take(cursor: &mut ArgCursor) -> Result<Self, BindError> {
        Ok(cursor.protocol)
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for Arg<T> {
    const KIND: ParamKind = ParamKind::Required;

    fn take(cursor: &mut ArgCursor) -> Result<Self, BindError> {
        let (position, value) = cursor.next_arg().ok_or(BindError::Arity {
            expected: cursor.required,
            got: cursor.supplied,
        })?;
        coerce(position, value).map(Arg)
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for Rest<T> {
    const KIND: ParamKind = ParamKind::Variadic;

    fn take(cursor: &mut ArgCursor) -> Result<Self, BindError> {
        let mut values = Vec::with_capacity(cursor.remaining());
        while let Some((position, value)) = cursor.next_arg() {
            values.push(coerce(position, value)?);
        }
        Ok(Rest(values))
    }
}

/// A full parameter list. Implemented for tuples of up to six [`Param`]s.
pub trait Params: Sized + Send + 'static {
    fn kinds() -> Vec<ParamKind>;

    fn take_all(cursor: &mut ArgCursor) -> Result<Self, BindError>;
}

macro_rules! tuple_params {
    ($($p:ident),*) => {
        impl<$($p: Param),*> Params for ($($p,)*) {
            fn kinds() -> Vec<ParamKind> {
                vec![$($p::KIND),*]
            }

            #[allow(unused_variables)]
            fn take_all(cursor: &mut ArgCursor) -> Result<Self, BindError> {
                Ok(($($p::take(cursor)?,)*))
            }
        }
    };
}

tuple_params!();
tuple_params!(A);
tuple_params!(A, B);
tuple_params!(A, B, C);
tuple_params!(A, B, C, D);
tuple_params!(A, B, C, D, E);
tuple_params!(A, B, C, D, E, F);

// ── Signature ─────────────────────────────────────────────────────────────────

/// The declared shape of an action's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    kinds: Vec<ParamKind>,
}

impl Signature {
    pub fn of<P: Params>() -> Self {
        Self { kinds: P::kinds() }
    }

    pub fn kinds(&self) -> &[ParamKind] {
        &self.kinds
    }

    pub fn injects_protocol(&self) -> bool {
        self.kinds.first() == Some(&ParamKind::Protocol)
    }

    pub fn is_variadic(&self) -> bool {
        self.kinds.last() == Some(&ParamKind::Variadic)
    }

    /// Arguments the request must supply: excludes the injected protocol
    /// version and the variadic slot.
    pub fn required(&self) -> usize {
        self.kinds
            .iter()
            .filter(|k| **k == ParamKind::Required)
            .count()
    }

    /// Reject shapes the binder can't walk unambiguously.
    pub fn validate(&self) -> Result<(), BindError> {
        let last = self.kinds.len().saturating_sub(1);
        for (i, kind) in self.kinds.iter().enumerate() {
            match kind {
                ParamKind::Protocol if i != 0 => {
                    return Err(BindError::Signature(format!(
                        "protocol version must be the first parameter, found at {i}"
                    )));
                }
                ParamKind::Variadic if i != last => {
                    return Err(BindError::Signature(format!(
                        "variadic parameter must be last, found at {i} of {}",
                        self.kinds.len()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Bind `arguments` to the parameter tuple `P`.
///
/// Fails with [`BindError::Arity`] before decoding anything when fewer
/// arguments than required are supplied.
pub fn bind<P: Params>(protocol: ProtocolVersion, arguments: Vec<Value>) -> Result<P, BindError> {
    let signature = Signature::of::<P>();
    signature.validate()?;

    let required = signature.required();
    if arguments.len() < required {
        return Err(BindError::Arity {
            expected: required,
            got: arguments.len(),
        });
    }

    let mut cursor = ArgCursor::new(protocol, arguments, required);
    let params = P::take_all(&mut cursor)?;

    let ignored = cursor.remaining();
    if ignored > 0 {
        tracing::debug!(ignored, "dropping trailing arguments");
    }
    Ok(params)
}
