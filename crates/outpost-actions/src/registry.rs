//! Maps wire method names to action constructors.
//!
//! Each lookup constructs a fresh action, so per-invocation state (such as
//! an errand's cancellation slot) is never shared between two tasks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{Action, DynAction};
use crate::binder::Signature;
use crate::error::BindError;

type Constructor = Box<dyn Fn() -> Arc<dyn DynAction> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    Duplicate(String),
    #[error("action '{method}': {source}")]
    Signature {
        method: String,
        #[source]
        source: BindError,
    },
}

#[derive(Default)]
pub struct ActionRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method`. The action's parameter signature is validated
    /// here, once, instead of on every request.
    pub fn register<A, F>(&mut self, method: &str, constructor: F) -> Result<(), RegistryError>
    where
        A: Action,
        F: Fn() -> A + Send + Sync + 'static,
    {
        Signature::of::<A::Params>()
            .validate()
            .map_err(|source| RegistryError::Signature {
                method: method.to_string(),
                source,
            })?;

        if self.constructors.contains_key(method) {
            return Err(RegistryError::Duplicate(method.to_string()));
        }
        self.constructors.insert(
            method.to_string(),
            Box::new(move || Arc::new(constructor()) as Arc<dyn DynAction>),
        );
        Ok(())
    }

    /// Construct the action for `method`.
    pub fn create(&self, method: &str) -> Option<Arc<dyn DynAction>> {
        self.constructors.get(method).map(|construct| construct())
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}
