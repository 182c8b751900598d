//! # Transitions
//!
//! A transition is a named, guarded state change with an associated
//! permission rule. Each piece is a boxed closure so tables can be
//! authored declaratively next to the entity type.
//!
//! ```text
//! guard(entity) ──▶ permission(entity, caller) ──▶ mutation(entity, args)
//! ```
//!
//! The guard decides whether the transition may fire given the entity's
//! current state. The permission decides whether the caller may invoke it.
//! The mutation changes the state field (and anything else it likes).

use crate::args::TransitionArgs;
use crate::name::TransitionName;

/// Pure predicate over the entity deciding if a transition may fire.
pub struct Guard<E> {
    predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> Guard<E> {
    /// Create a guard from a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// A guard that always passes.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Evaluate the guard.
    pub fn check(&self, entity: &E) -> bool {
        (self.predicate)(entity)
    }
}

/// Predicate over the entity and caller deciding if the caller may invoke
/// a transition.
pub struct Permission<E, C> {
    predicate: Box<dyn Fn(&E, &C) -> bool + Send + Sync>,
}

impl<E, C> Permission<E, C> {
    /// Create a permission rule from a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&E, &C) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }

    /// A permission rule that admits every caller.
    pub fn anyone() -> Self {
        Self::new(|_, _| true)
    }

    /// Evaluate the rule.
    pub fn check(&self, entity: &E, caller: &C) -> bool {
        (self.predicate)(entity, caller)
    }
}

/// The state change itself. Errors are returned to the caller untranslated.
pub struct Mutation<E, C> {
    body: Box<dyn Fn(&mut E, TransitionArgs<C>) -> anyhow::Result<()> + Send + Sync>,
}

impl<E, C> Mutation<E, C> {
    /// Create a mutation from a closure.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut E, TransitionArgs<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            body: Box::new(body),
        }
    }

    /// Run the mutation.
    pub fn call(&self, entity: &mut E, args: TransitionArgs<C>) -> anyhow::Result<()> {
        (self.body)(entity, args)
    }
}

/// A declared transition.
pub struct Transition<E, C> {
    name: TransitionName,
    guard: Guard<E>,
    permission: Permission<E, C>,
    mutation: Mutation<E, C>,
    accepts_caller: bool,
    description: Option<String>,
}

impl<E, C> Transition<E, C> {
    /// Declare a transition with an always-passing guard, a permission rule
    /// that admits everyone, and no caller injection.
    pub fn new<F>(name: TransitionName, mutation: F) -> Self
    where
        F: Fn(&mut E, TransitionArgs<C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            guard: Guard::always(),
            permission: Permission::anyone(),
            mutation: Mutation::new(mutation),
            accepts_caller: false,
            description: None,
        }
    }

    /// Set the guard.
    pub fn guard<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.guard = Guard::new(predicate);
        self
    }

    /// Set the permission rule.
    pub fn permission<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E, &C) -> bool + Send + Sync + 'static,
    {
        self.permission = Permission::new(predicate);
        self
    }

    /// Mark the mutation as taking the caller identity as `by`.
    pub fn accepts_caller(mut self) -> Self {
        self.accepts_caller = true;
        self
    }

    /// Attach a human-readable description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The transition's name.
    pub fn name(&self) -> &TransitionName {
        &self.name
    }

    /// Whether the mutation takes the caller identity as `by`.
    pub fn takes_caller(&self) -> bool {
        self.accepts_caller
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the guard currently allows the transition.
    pub fn can_proceed(&self, entity: &E) -> bool {
        self.guard.check(entity)
    }

    /// Whether the caller may invoke the transition.
    pub fn has_perm(&self, entity: &E, caller: &C) -> bool {
        self.permission.check(entity, caller)
    }

    /// Run the mutation. Does not check the guard or the permission.
    pub fn apply(&self, entity: &mut E, args: TransitionArgs<C>) -> anyhow::Result<()> {
        self.mutation.call(entity, args)
    }
}

impl<E, C> std::fmt::Debug for Transition<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("accepts_caller", &self.accepts_caller)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
