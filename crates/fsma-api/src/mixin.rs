//! # Transition Mixin
//!
//! Turns the transition table of one state field into HTTP routes:
//!
//! ```text
//! POST {prefix}/{id}/{transition-name}/     one per transition
//! GET  {prefix}/{id}/possible-transitions/  discovery
//! ```
//!
//! The table is read once, when the mixin is built. Transition names
//! are routed with `_` replaced by `-`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fsma_core::{StateMachine, TableError, DEFAULT_STATE_FIELD};

use crate::action::{build_transition_handler, SharedTable, TransitionAction};
use crate::auth::Caller;
use crate::error::AppError;
use crate::viewset::TransitionViewSet;

/// Path segment of the discovery endpoint.
pub const POSSIBLE_TRANSITIONS_SEGMENT: &str = "possible-transitions";

/// Body of the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleTransitions {
    /// URL segments of the transitions the caller may run right now.
    pub transitions: Vec<String>,
}

/// A route registered by [`TransitionMixin::router`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRoute {
    pub method: Method,
    pub path: String,
    /// Declared description of the transition; `None` for discovery.
    pub description: Option<String>,
}

/// The set of transition actions for one view set and state field.
pub struct TransitionMixin<V: TransitionViewSet> {
    table: SharedTable<V>,
    actions: Vec<TransitionAction<V>>,
    save_after_transition: bool,
}

impl<V: TransitionViewSet> std::fmt::Debug for TransitionMixin<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionMixin")
            .field("field", &self.table.field())
            .field("actions", &self.actions)
            .field("save_after_transition", &self.save_after_transition)
            .finish()
    }
}

/// Build a mixin exposing every transition declared on `field`.
///
/// Each action saves after a successful transition; use
/// [`TransitionMixin::save_after_transition`] to turn that off.
pub fn build_transition_mixin<V: TransitionViewSet>(
    field: &str,
) -> Result<TransitionMixin<V>, TableError> {
    let table: SharedTable<V> = Arc::new(<V::Entity as StateMachine>::transition_table(field)?);
    let actions = table
        .names()
        .map(|name| build_transition_handler(name.clone(), Arc::clone(&table), true))
        .collect();
    tracing::debug!(field, transitions = table.len(), "transition mixin built");
    Ok(TransitionMixin {
        table,
        actions,
        save_after_transition: true,
    })
}

impl<V: TransitionViewSet> TransitionMixin<V> {
    /// Mixin over the default `state` field.
    pub fn new() -> Result<Self, TableError> {
        build_transition_mixin(DEFAULT_STATE_FIELD)
    }

    /// Whether actions persist the entity after a successful transition.
    pub fn save_after_transition(mut self, save: bool) -> Self {
        self.save_after_transition = save;
        for action in &mut self.actions {
            action.set_save_after_transition(save);
        }
        self
    }

    pub fn field(&self) -> &str {
        self.table.field()
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> &[TransitionAction<V>] {
        &self.actions
    }

    /// The action for the transition called `name`, if declared.
    pub fn action(&self, name: &str) -> Option<&TransitionAction<V>> {
        self.actions.iter().find(|a| a.name().as_str() == name)
    }

    /// Transitions whose guard passes for the entity and whose permission
    /// admits the caller, in declaration order.
    pub fn possible_transitions(
        &self,
        viewset: &V,
        id: &V::Id,
        caller: &V::Caller,
    ) -> Result<PossibleTransitions, AppError> {
        let instance = viewset.get_object(id)?;
        let transitions = self
            .table
            .available(&instance)
            .filter(|t| t.has_perm(&instance, caller))
            .map(|t| t.name().url_segment())
            .collect();
        Ok(PossibleTransitions { transitions })
    }

    /// Every route [`Self::router`] registers, in registration order.
    pub fn routes(&self, prefix: &str) -> Vec<TransitionRoute> {
        let prefix = prefix.trim_end_matches('/');
        let mut routes: Vec<TransitionRoute> = self
            .actions
            .iter()
            .map(|a| TransitionRoute {
                method: Method::POST,
                path: format!("{prefix}/{{id}}/{}/", a.url_segment()),
                description: a.description().map(str::to_string),
            })
            .collect();
        routes.push(TransitionRoute {
            method: Method::GET,
            path: format!("{prefix}/{{id}}/{POSSIBLE_TRANSITIONS_SEGMENT}/"),
            description: None,
        });
        routes
    }

    /// Register the action and discovery routes under `prefix`.
    pub fn router(self, prefix: &str) -> Router<V> {
        let prefix = prefix.trim_end_matches('/').to_string();
        let mixin = Arc::new(self);
        let mut router = Router::new();

        for action in mixin.actions.iter().cloned() {
            let path = format!("{prefix}/{{id}}/{}/", action.url_segment());
            let action = Arc::new(action);
            router = router.route(
                &path,
                post(
                    move |State(viewset): State<V>,
                          Path(id): Path<V::Id>,
                          Caller(caller): Caller<V::Caller>,
                          body: Bytes| {
                        let action = Arc::clone(&action);
                        async move { action.execute(&viewset, &id, &caller, &body).map(Json) }
                    },
                ),
            );
        }

        let discovery = Arc::clone(&mixin);
        router.route(
            &format!("{prefix}/{{id}}/{POSSIBLE_TRANSITIONS_SEGMENT}/"),
            get(
                move |State(viewset): State<V>,
                      Path(id): Path<V::Id>,
                      Caller(caller): Caller<V::Caller>| {
                    let mixin = Arc::clone(&discovery);
                    async move { mixin.possible_transitions(&viewset, &id, &caller).map(Json) }
                },
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::{Ticket, Tickets};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn app(tickets: Tickets, caller: &str, save: bool) -> Router {
        TransitionMixin::<Tickets>::new()
            .unwrap()
            .save_after_transition(save)
            .router("/tickets/")
            .with_state(tickets)
            .layer(axum::Extension(caller.to_string()))
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn one_action_per_transition_in_order() {
        let mixin = TransitionMixin::<Tickets>::new().unwrap();
        let names: Vec<&str> = mixin.actions().iter().map(|a| a.name().as_str()).collect();
        assert_eq!(names, vec!["bump", "bump_quietly", "explode"]);
        assert_eq!(mixin.field(), "state");
        assert!(mixin.action("bump").is_some());
        assert!(mixin.action("nope").is_none());
    }

    #[test]
    fn unknown_field_fails_to_build() {
        let err = build_transition_mixin::<Tickets>("status").unwrap_err();
        assert_eq!(err, TableError::UnknownField("status".into()));
    }

    #[test]
    fn save_flag_propagates_to_actions() {
        let mixin = TransitionMixin::<Tickets>::new()
            .unwrap()
            .save_after_transition(false);
        assert!(mixin.actions().iter().all(|a| !a.saves_after_transition()));
    }

    #[test]
    fn routes_use_hyphenated_segments() {
        let mixin = TransitionMixin::<Tickets>::new().unwrap();
        let paths: Vec<String> = mixin
            .routes("/tickets/")
            .into_iter()
            .map(|route| format!("{} {}", route.method, route.path))
            .collect();
        assert_eq!(
            paths,
            vec![
                "POST /tickets/{id}/bump/",
                "POST /tickets/{id}/bump-quietly/",
                "POST /tickets/{id}/explode/",
                "GET /tickets/{id}/possible-transitions/",
            ]
        );
    }

    #[test]
    fn routes_carry_declared_descriptions() {
        let mixin = TransitionMixin::<Tickets>::new().unwrap();
        let descriptions: Vec<Option<String>> = mixin
            .routes("/tickets")
            .into_iter()
            .map(|route| route.description)
            .collect();
        assert_eq!(
            descriptions,
            vec![
                None,
                Some("Bump without recording the caller".to_string()),
                None,
                None,
            ]
        );
    }

    #[test]
    fn possible_transitions_filters_guard_and_permission() {
        let tickets = Tickets::with_ticket(1, true);
        let mixin = TransitionMixin::<Tickets>::new().unwrap();

        let alice = mixin
            .possible_transitions(&tickets, &1, &"alice".to_string())
            .unwrap();
        assert_eq!(alice.transitions, vec!["bump", "bump-quietly", "explode"]);

        let intruder = mixin
            .possible_transitions(&tickets, &1, &"intruder".to_string())
            .unwrap();
        assert_eq!(intruder.transitions, vec!["bump-quietly", "explode"]);
    }

    #[test]
    fn possible_transitions_does_not_mutate() {
        let tickets = Tickets::with_ticket(1, false);
        let mixin = TransitionMixin::<Tickets>::new().unwrap();
        let result = mixin
            .possible_transitions(&tickets, &1, &"alice".to_string())
            .unwrap();
        assert_eq!(result.transitions, vec!["bump-quietly", "explode"]);
        assert_eq!(tickets.saves.load(Ordering::SeqCst), 0);
        assert_eq!(tickets.stored(1).count, 0);
    }

    #[tokio::test]
    async fn post_routes_execute_actions() {
        let tickets = Tickets::with_ticket(1, true);
        let response = send(
            app(tickets.clone(), "alice", true),
            Method::POST,
            "/tickets/1/bump-quietly/",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["count"], 1);
        assert_eq!(tickets.stored(1).count, 1);
    }

    #[tokio::test]
    async fn guard_failure_maps_to_400() {
        let tickets = Tickets::with_ticket(1, false);
        let response = send(app(tickets, "alice", true), Method::POST, "/tickets/1/bump/").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json(response).await,
            serde_json::json!({"detail": "Conditions not met"})
        );
    }

    #[tokio::test]
    async fn permission_failure_maps_to_403() {
        let tickets = Tickets::with_ticket(1, true);
        let response = send(app(tickets, "intruder", true), Method::POST, "/tickets/1/bump/").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unsaved_mixin_leaves_store_untouched() {
        let tickets = Tickets::with_ticket(1, true);
        let response = send(
            app(tickets.clone(), "alice", false),
            Method::POST,
            "/tickets/1/bump/",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(tickets.stored(1).count, 0);
    }

    #[tokio::test]
    async fn discovery_route_lists_segments() {
        let tickets = Tickets::with_ticket(1, true);
        let response = send(
            app(tickets, "intruder", true),
            Method::GET,
            "/tickets/1/possible-transitions/",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: PossibleTransitions = serde_json::from_value(json(response).await).unwrap();
        assert_eq!(body.transitions, vec!["bump-quietly", "explode"]);
    }

    #[tokio::test]
    async fn missing_entity_maps_to_404() {
        let response = send(
            app(Tickets::default(), "alice", true),
            Method::POST,
            "/tickets/7/bump/",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unparsable_id_is_rejected() {
        let tickets = Tickets::with_ticket(1, true);
        let response = send(app(tickets, "alice", true), Method::POST, "/tickets/abc/bump/").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_caller_is_unauthorized() {
        let tickets = Tickets::with_ticket(1, true);
        let app = TransitionMixin::<Tickets>::new()
            .unwrap()
            .router("/tickets")
            .with_state(tickets);
        let response = send(app, Method::POST, "/tickets/1/bump/").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn ticket_table_is_static() {
        let first = Ticket::transition_table("state").unwrap();
        let second = Ticket::transition_table("state").unwrap();
        assert_eq!(
            first.names().collect::<Vec<_>>(),
            second.names().collect::<Vec<_>>()
        );
    }
}
