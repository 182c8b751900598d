//! # Transition Tables
//!
//! A [`TransitionTable`] is the explicit declaration of every transition on
//! one state field of an entity type. Entity types hand their tables out
//! through [`StateMachine::transition_table`]; the HTTP layer iterates a
//! table once, at startup, to build one action per transition.
//!
//! Names are unique per table. Declaring the same name twice is a
//! [`TableError::DuplicateTransition`], never a silent overwrite.

use std::sync::Arc;

use crate::error::TableError;
use crate::name::TransitionName;
use crate::prefetch::PrefetchCache;
use crate::transition::Transition;

/// State field used when none is specified.
pub const DEFAULT_STATE_FIELD: &str = "state";

/// Entity types whose transitions can be exposed as actions.
pub trait StateMachine: Sized + Send + Sync + 'static {
    /// Identity type handed to permission predicates and `by` injection.
    type Caller: Clone + Send + Sync + 'static;

    /// Declare the transitions on `field`.
    ///
    /// Returns [`TableError::UnknownField`] when the type has no state
    /// machine on that field.
    fn transition_table(field: &str) -> Result<TransitionTable<Self, Self::Caller>, TableError>;

    /// The entity's prefetched-relations cache, if it keeps one.
    fn prefetch_cache_mut(&mut self) -> Option<&mut PrefetchCache> {
        None
    }
}

/// Ordered, name-unique set of transitions on one state field.
pub struct TransitionTable<E, C> {
    field: String,
    transitions: Vec<Arc<Transition<E, C>>>,
}

impl<E, C> TransitionTable<E, C> {
    /// An empty table for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            transitions: Vec::new(),
        }
    }

    /// Add a transition, rejecting a name already in the table.
    pub fn with(mut self, transition: Transition<E, C>) -> Result<Self, TableError> {
        if self.contains(transition.name()) {
            return Err(TableError::DuplicateTransition {
                field: self.field.clone(),
                name: transition.name().to_string(),
            });
        }
        self.transitions.push(Arc::new(transition));
        Ok(self)
    }

    /// The state field this table describes.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Look up a transition by name.
    pub fn get(&self, name: &TransitionName) -> Option<&Arc<Transition<E, C>>> {
        self.transitions.iter().find(|t| t.name() == name)
    }

    /// Whether a transition with this name is declared.
    pub fn contains(&self, name: &TransitionName) -> bool {
        self.get(name).is_some()
    }

    /// All declared transitions, in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Transition<E, C>>> {
        self.transitions.iter()
    }

    /// All declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &TransitionName> {
        self.transitions.iter().map(|t| t.name())
    }

    /// Transitions whose guard currently passes for `entity`, in declaration
    /// order. Permissions are not consulted.
    pub fn available<'a>(
        &'a self,
        entity: &'a E,
    ) -> impl Iterator<Item = &'a Arc<Transition<E, C>>> {
        self.transitions.iter().filter(move |t| t.can_proceed(entity))
    }

    /// Number of declared transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the table declares nothing.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<E, C> std::fmt::Debug for TransitionTable<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionTable")
            .field("field", &self.field)
            .field("transitions", &self.transitions)
            .finish()
    }
}
