//! # License Lifecycle State Machine
//!
//! Models the lifecycle of a license from application through expiration
//! or revocation.
//!
//! ## States
//!
//! ```text
//! Application ──▶ Review ──▶ Issued ──▶ Active ──▶ Suspended ──▶ Active (reinstatement)
//!                   │                     │            │
//!                   │                     │            └──▶ Revoked (terminal)
//!                   │                     │
//!                   └──▶ Rejected         └──▶ Expired (terminal)
//!                       (terminal)
//! ```
//!
//! ## Permissions
//!
//! The holder (or staff) submits the application. Everything else is a
//! staff action. Every transition records its actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fsma_core::{
    CallerIdentity, StateMachine, TableError, Transition, TransitionArgs, TransitionName,
    TransitionTable,
};

use crate::document::actor;

// ─── License State ───────────────────────────────────────────────────

/// The lifecycle state of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseState {
    /// License application submitted, awaiting review.
    Application,
    /// Application is under review.
    Review,
    /// License has been issued but not yet activated.
    Issued,
    /// License is active and valid.
    Active,
    /// License has been temporarily suspended.
    Suspended,
    /// License has been permanently revoked (terminal).
    Revoked,
    /// License has expired (terminal).
    Expired,
    /// License application was rejected (terminal).
    Rejected,
}

impl LicenseState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked | Self::Expired | Self::Rejected)
    }

    /// Whether the license is currently valid for operations.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for LicenseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Application => "APPLICATION",
            Self::Review => "REVIEW",
            Self::Issued => "ISSUED",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
            Self::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during license lifecycle transitions.
#[derive(Error, Debug)]
pub enum LicenseError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid license transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: LicenseState,
        /// Attempted target state.
        to: LicenseState,
    },

    /// License is in a terminal state.
    #[error("license is in terminal state {0}")]
    TerminalState(LicenseState),

    /// Expiry date is not after the issue date.
    #[error("expiry {expires_at} is not in the future")]
    ExpiryInPast {
        /// The rejected expiry.
        expires_at: DateTime<Utc>,
    },
}

/// Record of a license state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseTransitionRecord {
    /// State before the transition.
    pub from_state: LicenseState,
    /// State after the transition.
    pub to_state: LicenseState,
    /// Who performed the transition.
    pub actor: Option<String>,
    /// Reason for the transition.
    pub reason: Option<String>,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
}

// ─── License ─────────────────────────────────────────────────────────

/// A license with its lifecycle state and transition history.
///
/// The license type is metadata; the lifecycle is the same for every
/// category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    /// Current lifecycle state.
    pub state: LicenseState,
    /// License category (e.g., "business_incorporation", "import_export").
    pub license_type: String,
    /// Username of the holder.
    pub holder: String,
    /// When the application was submitted.
    pub created_at: DateTime<Utc>,
    /// When the license expires (if set).
    pub expires_at: Option<DateTime<Utc>>,
    /// Ordered log of all state transitions.
    pub transitions: Vec<LicenseTransitionRecord>,
    /// Incremented by the store on every successful save.
    #[serde(default)]
    pub version: u64,
}

impl License {
    /// Create a new license application.
    pub fn new_application(license_type: impl Into<String>, holder: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: LicenseState::Application,
            license_type: license_type.into(),
            holder: holder.into(),
            created_at: Utc::now(),
            expires_at: None,
            transitions: Vec::new(),
            version: 0,
        }
    }

    /// Submit application for review (APPLICATION → REVIEW).
    pub fn submit_for_review(&mut self, actor: Option<String>) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Application, LicenseState::Review)?;
        self.do_transition(LicenseState::Review, actor, None);
        Ok(())
    }

    /// Issue the license after review (REVIEW → ISSUED).
    pub fn issue(
        &mut self,
        actor: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Review, LicenseState::Issued)?;
        if let Some(expiry) = expires_at {
            if expiry <= Utc::now() {
                return Err(LicenseError::ExpiryInPast { expires_at: expiry });
            }
        }
        self.expires_at = expires_at;
        self.do_transition(LicenseState::Issued, actor, None);
        Ok(())
    }

    /// Reject the application (REVIEW → REJECTED).
    pub fn reject(
        &mut self,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Review, LicenseState::Rejected)?;
        self.do_transition(LicenseState::Rejected, actor, reason);
        Ok(())
    }

    /// Activate the license (ISSUED → ACTIVE).
    pub fn activate(&mut self, actor: Option<String>) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Issued, LicenseState::Active)?;
        self.do_transition(LicenseState::Active, actor, None);
        Ok(())
    }

    /// Suspend the license (ACTIVE → SUSPENDED).
    pub fn suspend(
        &mut self,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Active, LicenseState::Suspended)?;
        self.do_transition(LicenseState::Suspended, actor, reason);
        Ok(())
    }

    /// Reinstate a suspended license (SUSPENDED → ACTIVE).
    pub fn reinstate(&mut self, actor: Option<String>) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Suspended, LicenseState::Active)?;
        self.do_transition(LicenseState::Active, actor, None);
        Ok(())
    }

    /// Revoke the license permanently (ACTIVE or SUSPENDED → REVOKED).
    pub fn revoke(
        &mut self,
        actor: Option<String>,
        reason: Option<String>,
    ) -> Result<(), LicenseError> {
        if self.state.is_terminal() {
            return Err(LicenseError::TerminalState(self.state));
        }
        if !Self::revocable(self) {
            return Err(LicenseError::InvalidTransition {
                from: self.state,
                to: LicenseState::Revoked,
            });
        }
        self.do_transition(LicenseState::Revoked, actor, reason);
        Ok(())
    }

    /// Expire the license (ACTIVE → EXPIRED).
    pub fn expire(&mut self, actor: Option<String>) -> Result<(), LicenseError> {
        self.require_state(LicenseState::Active, LicenseState::Expired)?;
        self.do_transition(LicenseState::Expired, actor, None);
        Ok(())
    }

    /// Whether the license is currently valid for operations.
    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    /// Whether the license is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn revocable(&self) -> bool {
        matches!(self.state, LicenseState::Active | LicenseState::Suspended)
    }

    /// Validate that the license is in the expected state.
    fn require_state(&self, expected: LicenseState, to: LicenseState) -> Result<(), LicenseError> {
        if self.state.is_terminal() {
            return Err(LicenseError::TerminalState(self.state));
        }
        if self.state != expected {
            return Err(LicenseError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        Ok(())
    }

    /// Record a state transition.
    fn do_transition(&mut self, to: LicenseState, actor: Option<String>, reason: Option<String>) {
        self.transitions.push(LicenseTransitionRecord {
            from_state: self.state,
            to_state: to,
            actor,
            reason,
            timestamp: Utc::now(),
        });
        self.state = to;
    }

    fn state_table() -> Result<TransitionTable<Self, CallerIdentity>, TableError> {
        let staff_only = |_: &License, caller: &CallerIdentity| caller.is_staff();
        let in_state = |expected: LicenseState| move |lic: &License| lic.state == expected;

        TransitionTable::new("state")
            .with(
                Transition::new(name("submit_for_review")?, |lic: &mut License, args| {
                    lic.submit_for_review(actor(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Application))
                .permission(|lic, caller: &CallerIdentity| {
                    caller.is_staff() || caller.username == lic.holder
                })
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("issue")?, |lic: &mut License, args| {
                    let expires_at = args.get::<DateTime<Utc>>("expires_at")?;
                    lic.issue(actor(&args)?, expires_at)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Review))
                .permission(staff_only)
                .describe("Issue a reviewed application")
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("reject")?, |lic: &mut License, args| {
                    lic.reject(actor(&args)?, reason(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Review))
                .permission(staff_only)
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("activate")?, |lic: &mut License, args| {
                    lic.activate(actor(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Issued))
                .permission(staff_only)
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("suspend")?, |lic: &mut License, args| {
                    lic.suspend(actor(&args)?, reason(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Active))
                .permission(staff_only)
                .describe("Suspend an active license")
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("reinstate")?, |lic: &mut License, args| {
                    lic.reinstate(actor(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Suspended))
                .permission(staff_only)
                .describe("Reinstate a suspended license")
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("revoke")?, |lic: &mut License, args| {
                    lic.revoke(actor(&args)?, reason(&args)?)?;
                    Ok(())
                })
                .guard(License::revocable)
                .permission(staff_only)
                .describe("Revoke the license")
                .accepts_caller(),
            )?
            .with(
                Transition::new(name("expire")?, |lic: &mut License, args| {
                    lic.expire(actor(&args)?)?;
                    Ok(())
                })
                .guard(in_state(LicenseState::Active))
                .permission(staff_only)
                .accepts_caller(),
            )
    }
}

fn name(s: &str) -> Result<TransitionName, TableError> {
    Ok(TransitionName::new(s)?)
}

fn reason(args: &TransitionArgs<CallerIdentity>) -> anyhow::Result<Option<String>> {
    args.get::<String>("reason")
}

impl StateMachine for License {
    type Caller = CallerIdentity;

    fn transition_table(field: &str) -> Result<TransitionTable<Self, Self::Caller>, TableError> {
        match field {
            "state" => Self::state_table(),
            other => Err(TableError::UnknownField(other.to_string())),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
