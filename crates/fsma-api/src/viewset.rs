//! # Transition View Sets
//!
//! The seam between the generic transition machinery and a concrete
//! resource. A view set knows how to load an entity by its path id,
//! persist it, render it, and (optionally) turn a request body into
//! keyword arguments for a given transition.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use fsma_core::{Kwargs, StateMachine, TransitionName};

use crate::error::AppError;

/// A resource whose entities expose state-machine transitions over HTTP.
///
/// Implementors are cheap to clone (they usually wrap shared stores) and
/// serve as the Axum router state for the routes built by
/// [`TransitionMixin`](crate::mixin::TransitionMixin).
pub trait TransitionViewSet: Clone + Send + Sync + 'static {
    /// The entity type carrying the state field.
    type Entity: StateMachine<Caller = Self::Caller> + Serialize;
    /// The authenticated caller type.
    type Caller: Clone + Send + Sync + 'static;
    /// The identifier parsed from the `{id}` path segment.
    type Id: DeserializeOwned + Display + Send + Sync + 'static;

    /// Load the entity. Missing entities must map to [`AppError::NotFound`].
    fn get_object(&self, id: &Self::Id) -> Result<Self::Entity, AppError>;

    /// Persist the entity after a successful transition.
    ///
    /// May update bookkeeping fields on `entity` (such as a version) so the
    /// response reflects what was stored.
    fn save(&self, id: &Self::Id, entity: &mut Self::Entity) -> Result<(), AppError>;

    /// Render the entity for the response body.
    fn serialize(&self, entity: &Self::Entity) -> Result<Value, AppError> {
        serde_json::to_value(entity)
            .map_err(|e| AppError::Internal(format!("failed to serialize entity: {e}")))
    }

    /// Keyword arguments for `transition`, built from the request.
    ///
    /// `None` means no hook is defined for this transition and the
    /// mutation receives no extra keyword arguments.
    fn transition_kwargs(
        &self,
        transition: &TransitionName,
        request: &TransitionRequest<'_, Self::Caller>,
    ) -> Option<Result<Kwargs, AppError>> {
        let _ = (transition, request);
        None
    }
}

/// The parts of an incoming transition request visible to kwargs hooks.
#[derive(Debug)]
pub struct TransitionRequest<'a, C> {
    /// The authenticated caller.
    pub caller: &'a C,
    body: &'a [u8],
}

impl<'a, C> TransitionRequest<'a, C> {
    pub fn new(caller: &'a C, body: &'a [u8]) -> Self {
        Self { caller, body }
    }

    /// The raw request body.
    pub fn body(&self) -> &[u8] {
        self.body
    }

    /// Parse the body as JSON. An empty body parses as `null`.
    pub fn body_json(&self) -> Result<Value, AppError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(self.body)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
    }

    /// Read one optional field from a JSON object body.
    ///
    /// Absent fields, `null` values and an empty body all yield `None`.
    pub fn body_field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.body_json()? {
            Value::Null => Ok(None),
            Value::Object(mut map) => match map.remove(key) {
                None | Some(Value::Null) => Ok(None),
                Some(value) => serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| AppError::Validation(format!("invalid `{key}`: {e}"))),
            },
            _ => Err(AppError::BadRequest("request body must be a JSON object".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &[u8]) -> TransitionRequest<'_, ()> {
        TransitionRequest::new(&(), body)
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(request(b"").body_json().unwrap(), Value::Null);
        assert_eq!(request(b"  \n").body_json().unwrap(), Value::Null);
        assert_eq!(request(b"").body_field::<String>("reason").unwrap(), None);
    }

    #[test]
    fn reads_object_fields() {
        let req = request(br#"{"reason": "late", "other": null}"#);
        assert_eq!(
            req.body_field::<String>("reason").unwrap().as_deref(),
            Some("late")
        );
        assert_eq!(req.body_field::<String>("other").unwrap(), None);
        assert_eq!(req.body_field::<String>("missing").unwrap(), None);
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = request(b"{not json").body_json().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn non_object_body_is_bad_request() {
        let err = request(b"[1, 2]").body_field::<String>("reason").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn wrong_field_type_is_validation_error() {
        let err = request(br#"{"reason": 5}"#)
            .body_field::<String>("reason")
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("reason")));
    }
}
