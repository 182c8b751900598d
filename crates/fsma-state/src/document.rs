//! # Document Review Workflow
//!
//! ## States
//!
//! ```text
//! Draft ──approve──▶ Approved ──publish──▶ Published
//!   │                   │                      │
//!   └───────────────────┴──────reject──────────┴──▶ Rejected
//! ```
//!
//! ## Transitions on `state`
//!
//! | Name      | Guard              | Permission | Caller |
//! |-----------|--------------------|------------|--------|
//! | `approve` | state is `draft`   | anyone     | reviewer recorded |
//! | `reject`  | always             | staff      | reviewer recorded |
//! | `publish` | state is `approved`| staff      | publisher recorded |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fsma_core::{
    CallerIdentity, PrefetchCache, StateMachine, TableError, Transition, TransitionArgs,
    TransitionName, TransitionTable,
};

/// Relation name under which the transition history is prefetched.
pub const HISTORY_RELATION: &str = "history";

/// The lifecycle state of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Being written, awaiting review.
    Draft,
    /// Approved by a reviewer.
    Approved,
    /// Visible to readers.
    Published,
    /// Rejected (terminal).
    Rejected,
}

impl DocumentState {
    /// Return the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by document mutations invoked out of order.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid document transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: DocumentState,
        /// Attempted target state.
        to: DocumentState,
    },
}

/// Record of a document state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTransitionRecord {
    /// Name of the transition that fired.
    pub transition: String,
    /// State before the transition.
    pub from_state: DocumentState,
    /// State after the transition.
    pub to_state: DocumentState,
    /// Who performed it, when known.
    pub actor: Option<String>,
    /// Free-form reason.
    pub reason: Option<String>,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
}

/// A document under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    /// Username of the author.
    pub owner: String,
    /// Current lifecycle state.
    pub state: DocumentState,
    /// Who approved or rejected the document.
    pub reviewed_by: Option<String>,
    /// Who published the document.
    pub published_by: Option<String>,
    pub rejection_reason: Option<String>,
    /// Ordered log of all state transitions.
    pub history: Vec<DocumentTransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every successful save.
    #[serde(default)]
    pub version: u64,
    /// Related data loaded together with the document. Never persisted.
    #[serde(skip)]
    pub prefetched: PrefetchCache,
}

impl Document {
    /// Create a new draft.
    pub fn new(title: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            owner: owner.into(),
            state: DocumentState::Draft,
            reviewed_by: None,
            published_by: None,
            rejection_reason: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            prefetched: PrefetchCache::new(),
        }
    }

    /// Approve a draft (DRAFT → APPROVED).
    pub fn approve(&mut self, reviewer: Option<String>) -> Result<(), DocumentError> {
        self.require_state(DocumentState::Draft, DocumentState::Approved)?;
        self.reviewed_by = reviewer.clone();
        self.do_transition("approve", DocumentState::Approved, reviewer, None);
        Ok(())
    }

    /// Reject the document from any state.
    pub fn reject(&mut self, reviewer: Option<String>, reason: Option<String>) {
        self.reviewed_by = reviewer.clone();
        self.rejection_reason = reason.clone();
        self.do_transition("reject", DocumentState::Rejected, reviewer, reason);
    }

    /// Publish an approved document (APPROVED → PUBLISHED).
    pub fn publish(&mut self, publisher: Option<String>) -> Result<(), DocumentError> {
        self.require_state(DocumentState::Approved, DocumentState::Published)?;
        self.published_by = publisher.clone();
        self.do_transition("publish", DocumentState::Published, publisher, None);
        Ok(())
    }

    fn require_state(
        &self,
        expected: DocumentState,
        to: DocumentState,
    ) -> Result<(), DocumentError> {
        if self.state != expected {
            return Err(DocumentError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    fn do_transition(
        &mut self,
        transition: &str,
        to: DocumentState,
        actor: Option<String>,
        reason: Option<String>,
    ) {
        let now = Utc::now();
        self.history.push(DocumentTransitionRecord {
            transition: transition.to_string(),
            from_state: self.state,
            to_state: to,
            actor,
            reason,
            timestamp: now,
        });
        self.state = to;
        self.updated_at = now;
    }

    fn state_table() -> Result<TransitionTable<Self, CallerIdentity>, TableError> {
        TransitionTable::new("state")
            .with(
                Transition::new(TransitionName::new("approve")?, |doc: &mut Document, args| {
                    doc.approve(actor(&args)?)?;
                    Ok(())
                })
                .guard(|doc| doc.state == DocumentState::Draft)
                .accepts_caller()
                .describe("Approve a draft"),
            )?
            .with(
                Transition::new(TransitionName::new("reject")?, |doc: &mut Document, args| {
                    let reason = args.get::<String>("reason")?;
                    doc.reject(actor(&args)?, reason);
                    Ok(())
                })
                .permission(|_, caller: &CallerIdentity| caller.is_staff())
                .accepts_caller()
                .describe("Reject the document"),
            )?
            .with(
                Transition::new(TransitionName::new("publish")?, |doc: &mut Document, args| {
                    doc.publish(actor(&args)?)?;
                    Ok(())
                })
                .guard(|doc| doc.state == DocumentState::Approved)
                .permission(|_, caller: &CallerIdentity| caller.is_staff())
                .accepts_caller()
                .describe("Publish an approved document"),
            )
    }
}

/// The acting username: the injected caller, or a `by` kwarg supplied by
/// the owning component's hook.
pub(crate) fn actor(args: &TransitionArgs<CallerIdentity>) -> anyhow::Result<Option<String>> {
    match &args.by {
        Some(caller) => Ok(Some(caller.username.clone())),
        None => args.get::<String>(fsma_core::args::BY),
    }
}

impl StateMachine for Document {
    type Caller = CallerIdentity;

    fn transition_table(field: &str) -> Result<TransitionTable<Self, Self::Caller>, TableError> {
        match field {
            "state" => Self::state_table(),
            other => Err(TableError::UnknownField(other.to_string())),
        }
    }

    fn prefetch_cache_mut(&mut self) -> Option<&mut PrefetchCache> {
        Some(&mut self.prefetched)
    }
}
