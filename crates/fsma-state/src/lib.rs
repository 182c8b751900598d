//! # fsma-state — Entity State Machines
//!
//! Concrete entity types whose lifecycles are declared as
//! [`fsma_core::TransitionTable`]s and therefore exposable as HTTP actions.
//!
//! ## State Machines
//!
//! - **Document** (`document.rs`): review workflow
//!   `Draft → Approved → Published`, with `Rejected` reachable from any
//!   state by staff.
//!
//! - **License** (`license.rs`): license lifecycle
//!   (Application → Review → Issued → Active ⇄ Suspended → Revoked/Expired,
//!   or Review → Rejected).
//!
//! ## Design
//!
//! Guards check the source state. Mutation bodies re-validate before
//! changing anything, so a mutation invoked directly (without its guard)
//! fails with a typed error instead of corrupting the lifecycle.

pub mod document;
pub mod license;

// ─── Document re-exports ────────────────────────────────────────────

pub use document::{Document, DocumentError, DocumentState, DocumentTransitionRecord};

// ─── License re-exports ─────────────────────────────────────────────

pub use license::{License, LicenseError, LicenseState, LicenseTransitionRecord};
