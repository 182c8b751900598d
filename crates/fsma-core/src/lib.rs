//! # fsma-core — Transition Declarations
//!
//! Foundational types for exposing entity state machines as HTTP actions.
//! Every other crate in the workspace depends on `fsma-core`; it depends on
//! nothing internal and knows nothing about HTTP.
//!
//! ## Key Design Principles
//!
//! 1. **Static declaration, no reflection.** An entity type declares its
//!    transitions per state field through [`StateMachine::transition_table`].
//!    Nothing is discovered by constructing a throwaway instance.
//!
//! 2. **Explicit capabilities.** Whether a mutation receives the calling
//!    identity as `by` is a flag on the [`Transition`], set when the table is
//!    authored.
//!
//! 3. **Unique names per table.** [`TransitionTable::with`] rejects a
//!    duplicate name instead of letting the last registration win.
//!
//! 4. **Validated names.** [`TransitionName`] is the only way to name a
//!    transition, and it owns the `_` → `-` rendering used for URL segments.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fsma-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod args;
pub mod error;
pub mod identity;
pub mod name;
pub mod prefetch;
pub mod table;
pub mod transition;

pub use args::{Kwargs, TransitionArgs};
pub use error::{NameError, TableError};
pub use identity::{CallerIdentity, Role};
pub use name::TransitionName;
pub use prefetch::PrefetchCache;
pub use table::{StateMachine, TransitionTable, DEFAULT_STATE_FIELD};
pub use transition::{Guard, Mutation, Permission, Transition};
