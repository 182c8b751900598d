//! # Transition Arguments
//!
//! What a mutation receives: the keyword arguments computed by the owning
//! component's hook, plus the caller identity when the transition accepts
//! one and the hook did not already supply `by`.

use anyhow::Context;
use serde::de::DeserializeOwned;

/// Keyword arguments for a transition, as a JSON object.
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

/// Reserved keyword for the caller identity.
pub const BY: &str = "by";

/// Arguments passed to a [`crate::Mutation`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionArgs<C> {
    /// Hook-provided keyword arguments.
    pub kwargs: Kwargs,
    /// The injected caller identity. `None` when the transition does not
    /// accept the caller, or when `kwargs` already carries `by`.
    pub by: Option<C>,
}

impl<C> Default for TransitionArgs<C> {
    fn default() -> Self {
        Self {
            kwargs: Kwargs::new(),
            by: None,
        }
    }
}

impl<C> TransitionArgs<C> {
    /// Arguments with the given kwargs and no caller.
    pub fn new(kwargs: Kwargs) -> Self {
        Self { kwargs, by: None }
    }

    /// Merge the caller into `kwargs` the way a `by` parameter is filled:
    /// only when the transition accepts it and the hook did not supply it.
    pub fn merge(kwargs: Kwargs, accepts_caller: bool, caller: &C) -> Self
    where
        C: Clone,
    {
        let by = (accepts_caller && !kwargs.contains_key(BY)).then(|| caller.clone());
        Self { kwargs, by }
    }

    /// Deserialize an optional keyword argument. JSON `null` counts as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.kwargs.get(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .with_context(|| format!("invalid transition argument {key:?}")),
        }
    }

    /// Deserialize a required keyword argument.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        self.get(key)?
            .with_context(|| format!("missing transition argument {key:?}"))
    }
}
