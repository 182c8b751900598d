//! # Transition Actions
//!
//! One [`TransitionAction`] exists per declared transition. Executing it
//! runs the fixed request pipeline:
//!
//! ```text
//! get_object → guard (400) → permission (403) → kwargs hook
//!   → merge caller into `by` → mutation → save? → drop prefetch cache
//!   → serialize (200)
//! ```
//!
//! Nothing is persisted unless every step up to the mutation succeeds.

use std::sync::Arc;

use serde_json::Value;

use fsma_core::{Kwargs, StateMachine, TransitionArgs, TransitionName, TransitionTable};

use crate::error::AppError;
use crate::viewset::{TransitionRequest, TransitionViewSet};

/// Table type shared by every action of one view set.
pub type SharedTable<V> = Arc<
    TransitionTable<<V as TransitionViewSet>::Entity, <V as TransitionViewSet>::Caller>,
>;

/// The HTTP action bound to a single named transition.
pub struct TransitionAction<V: TransitionViewSet> {
    name: TransitionName,
    table: SharedTable<V>,
    save_after_transition: bool,
}

impl<V: TransitionViewSet> Clone for TransitionAction<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            table: Arc::clone(&self.table),
            save_after_transition: self.save_after_transition,
        }
    }
}

impl<V: TransitionViewSet> std::fmt::Debug for TransitionAction<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionAction")
            .field("name", &self.name)
            .field("field", &self.table.field())
            .field("save_after_transition", &self.save_after_transition)
            .finish()
    }
}

/// Build the action for transition `name` of `table`.
///
/// The transition is looked up when the action executes, so an action
/// for a name the table lacks fails every request with a 500.
pub fn build_transition_handler<V: TransitionViewSet>(
    name: TransitionName,
    table: SharedTable<V>,
    save_after_transition: bool,
) -> TransitionAction<V> {
    TransitionAction {
        name,
        table,
        save_after_transition,
    }
}

impl<V: TransitionViewSet> TransitionAction<V> {
    pub fn name(&self) -> &TransitionName {
        &self.name
    }

    /// Path segment under which the action is routed.
    pub fn url_segment(&self) -> String {
        self.name.url_segment()
    }

    /// Description declared on the transition, if any.
    pub fn description(&self) -> Option<&str> {
        self.table.get(&self.name).and_then(|t| t.description())
    }

    pub fn saves_after_transition(&self) -> bool {
        self.save_after_transition
    }

    pub(crate) fn set_save_after_transition(&mut self, save: bool) {
        self.save_after_transition = save;
    }

    /// Run the transition against entity `id` on behalf of `caller`.
    ///
    /// Returns the serialized entity after the transition.
    pub fn execute(
        &self,
        viewset: &V,
        id: &V::Id,
        caller: &V::Caller,
        body: &[u8],
    ) -> Result<Value, AppError> {
        let mut instance = viewset.get_object(id)?;

        let transition = self.table.get(&self.name).ok_or_else(|| {
            AppError::Internal(format!(
                "transition {} is not declared on field {}",
                self.name,
                self.table.field()
            ))
        })?;

        if !transition.can_proceed(&instance) {
            tracing::debug!(transition = %self.name, id = %id, "transition conditions not met");
            return Err(AppError::ConditionsNotMet);
        }

        if !transition.has_perm(&instance, caller) {
            tracing::warn!(transition = %self.name, id = %id, "transition permission denied");
            return Err(AppError::PermissionDenied);
        }

        let request = TransitionRequest::new(caller, body);
        let kwargs = match viewset.transition_kwargs(&self.name, &request) {
            Some(result) => result?,
            None => Kwargs::new(),
        };
        let args = TransitionArgs::merge(kwargs, transition.takes_caller(), caller);

        transition.apply(&mut instance, args).map_err(|err| {
            AppError::Internal(format!("transition {} failed on {id}: {err:#}", self.name))
        })?;

        if self.save_after_transition {
            viewset.save(id, &mut instance)?;
        }

        if let Some(cache) = instance.prefetch_cache_mut() {
            if !cache.is_empty() {
                cache.clear();
            }
        }

        let rendered = viewset.serialize(&instance)?;
        tracing::info!(
            transition = %self.name,
            field = self.table.field(),
            id = %id,
            saved = self.save_after_transition,
            "transition applied"
        );
        Ok(rendered)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde::Serialize;
    use serde_json::json;

    use fsma_core::{PrefetchCache, TableError, Transition};

    use super::*;

    #[derive(Debug, Clone, Default, Serialize)]
    pub(crate) struct Ticket {
        pub open: bool,
        pub count: u32,
        pub received: Option<Kwargs>,
        pub by: Option<String>,
        #[serde(skip)]
        pub cache: PrefetchCache,
    }

    impl StateMachine for Ticket {
        type Caller = String;

        fn transition_table(field: &str) -> Result<TransitionTable<Self, String>, TableError> {
            if field != "state" {
                return Err(TableError::UnknownField(field.to_string()));
            }
            TransitionTable::new("state")
                .with(
                    Transition::new(TransitionName::new("bump")?, |t: &mut Ticket, args| {
                        t.count += 1;
                        t.received = Some(args.kwargs);
                        t.by = args.by;
                        Ok(())
                    })
                    .guard(|t: &Ticket| t.open)
                    .permission(|_: &Ticket, caller: &String| caller != "intruder")
                    .accepts_caller(),
                )?
                .with(
                    Transition::new(
                        TransitionName::new("bump_quietly")?,
                        |t: &mut Ticket, args: TransitionArgs<String>| {
                            t.count += 1;
                            t.by = args.by;
                            Ok(())
                        },
                    )
                    .describe("Bump without recording the caller"),
                )?
                .with(Transition::new(
                    TransitionName::new("explode")?,
                    |_: &mut Ticket, _| Err(anyhow::anyhow!("boom")),
                ))
        }

        fn prefetch_cache_mut(&mut self) -> Option<&mut PrefetchCache> {
            Some(&mut self.cache)
        }
    }

    /// In-memory view set that records what the action did to it.
    #[derive(Clone, Default)]
    pub(crate) struct Tickets {
        pub rows: Arc<Mutex<HashMap<u32, Ticket>>>,
        pub saves: Arc<AtomicUsize>,
        pub hook_calls: Arc<AtomicUsize>,
        pub cache_len_at_render: Arc<Mutex<Option<usize>>>,
    }

    impl Tickets {
        pub fn with_ticket(id: u32, open: bool) -> Self {
            let tickets = Self::default();
            tickets.rows.lock().insert(
                id,
                Ticket {
                    open,
                    ..Ticket::default()
                },
            );
            tickets
        }

        pub fn stored(&self, id: u32) -> Ticket {
            self.rows.lock()[&id].clone()
        }
    }

    impl TransitionViewSet for Tickets {
        type Entity = Ticket;
        type Caller = String;
        type Id = u32;

        fn get_object(&self, id: &u32) -> Result<Ticket, AppError> {
            let mut ticket = self
                .rows
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("ticket {id}")))?;
            ticket.cache.insert("notes", json!(["cached"]));
            Ok(ticket)
        }

        fn save(&self, id: &u32, entity: &mut Ticket) -> Result<(), AppError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.rows.lock().insert(*id, entity.clone());
            Ok(())
        }

        fn serialize(&self, entity: &Ticket) -> Result<Value, AppError> {
            *self.cache_len_at_render.lock() = Some(entity.cache.len());
            serde_json::to_value(entity).map_err(|e| AppError::Internal(e.to_string()))
        }

        fn transition_kwargs(
            &self,
            transition: &TransitionName,
            request: &TransitionRequest<'_, String>,
        ) -> Option<Result<Kwargs, AppError>> {
            if transition.as_str() != "bump" {
                return None;
            }
            self.hook_calls.fetch_add(1, Ordering::SeqCst);
            Some(request.body_field::<i64>("amount").map(|amount| {
                let mut kwargs = Kwargs::new();
                if let Some(amount) = amount {
                    kwargs.insert("amount".to_string(), json!(amount));
                }
                kwargs
            }))
        }
    }

    fn action(name: &str, save: bool) -> TransitionAction<Tickets> {
        let table = Arc::new(Ticket::transition_table("state").unwrap());
        build_transition_handler(TransitionName::new(name).unwrap(), table, save)
    }

    fn caller(name: &str) -> String {
        name.to_string()
    }

    #[test]
    fn success_runs_full_pipeline() {
        let tickets = Tickets::with_ticket(1, true);
        let body = action("bump", true)
            .execute(&tickets, &1, &caller("alice"), br#"{"amount": 3}"#)
            .unwrap();

        assert_eq!(body["count"], 1);
        assert_eq!(body["received"], json!({"amount": 3}));
        assert_eq!(body["by"], "alice");
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 1);
        assert_eq!(tickets.hook_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tickets.stored(1).count, 1);
    }

    #[test]
    fn prefetch_cache_is_empty_when_rendered() {
        let tickets = Tickets::with_ticket(1, true);
        action("bump", true)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap();
        assert_eq!(*tickets.cache_len_at_render.lock(), Some(0));
    }

    #[test]
    fn guard_failure_is_conditions_not_met() {
        let tickets = Tickets::with_ticket(1, false);
        let err = action("bump", true)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::ConditionsNotMet));
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.hook_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.stored(1).count, 0);
    }

    #[test]
    fn guard_is_checked_before_permission() {
        let tickets = Tickets::with_ticket(1, false);
        let err = action("bump", true)
            .execute(&tickets, &1, &caller("intruder"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::ConditionsNotMet));
    }

    #[test]
    fn permission_failure_is_denied_without_side_effects() {
        let tickets = Tickets::with_ticket(1, true);
        let err = action("bump", true)
            .execute(&tickets, &1, &caller("intruder"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.hook_calls.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.stored(1).count, 0);
    }

    #[test]
    fn no_save_when_disabled() {
        let tickets = Tickets::with_ticket(1, true);
        let body = action("bump", false)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.stored(1).count, 0);
    }

    #[test]
    fn missing_entity_is_not_found() {
        let tickets = Tickets::default();
        let err = action("bump", true)
            .execute(&tickets, &9, &caller("alice"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn caller_not_injected_when_not_accepted() {
        let tickets = Tickets::with_ticket(1, true);
        let body = action("bump_quietly", true)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["by"], Value::Null);
        assert_eq!(tickets.hook_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mutation_failure_is_internal_and_not_saved() {
        let tickets = Tickets::with_ticket(1, true);
        let err = action("explode", true)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(ref m) if m.contains("boom")));
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_body_is_rejected_before_mutation() {
        let tickets = Tickets::with_ticket(1, true);
        let err = action("bump", true)
            .execute(&tickets, &1, &caller("alice"), b"{oops")
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(tickets.stored(1).count, 0);
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn undeclared_name_is_internal() {
        let tickets = Tickets::with_ticket(1, true);
        let err = action("ghost", true)
            .execute(&tickets, &1, &caller("alice"), b"")
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn description_comes_from_declaration() {
        assert_eq!(
            action("bump_quietly", true).description(),
            Some("Bump without recording the caller")
        );
        assert_eq!(action("bump", true).description(), None);
        assert_eq!(action("ghost", true).description(), None);
    }

    #[test]
    fn url_segment_uses_hyphens() {
        assert_eq!(action("bump_quietly", true).url_segment(), "bump-quietly");
    }
}
