//! # License API
//!
//! CRUD for license applications plus one POST route per lifecycle
//! transition (`submit-for-review`, `issue`, `reject`, `activate`,
//! `suspend`, `reinstate`, `revoke`, `expire`) and the
//! `possible-transitions` discovery route, all under `/v1/licenses`.
//!
//! Request bodies feed the mutations:
//!
//! - `issue` takes an optional RFC 3339 `expires_at`.
//! - `reject`, `suspend` and `revoke` take an optional `reason`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use fsma_core::{CallerIdentity, Kwargs, TableError, TransitionName};
use fsma_state::License;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::mixin::TransitionMixin;
use crate::state::{AppState, Store};
use crate::viewset::{TransitionRequest, TransitionViewSet};

pub const PREFIX: &str = "/v1/licenses";

/// Request to open a license application.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateLicenseRequest {
    pub license_type: String,
}

impl Validate for CreateLicenseRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("license_type", &self.license_type)
    }
}

/// Transition view set over the license store.
#[derive(Debug, Clone)]
pub struct LicenseViewSet {
    store: Store<License>,
}

impl LicenseViewSet {
    pub fn new(store: Store<License>) -> Self {
        Self { store }
    }
}

impl TransitionViewSet for LicenseViewSet {
    type Entity = License;
    type Caller = CallerIdentity;
    type Id = Uuid;

    fn get_object(&self, id: &Uuid) -> Result<License, AppError> {
        self.store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("license {id} not found")))
    }

    fn save(&self, id: &Uuid, entity: &mut License) -> Result<(), AppError> {
        let loaded = entity.version;
        let mut stored = entity.clone();
        stored.version = loaded + 1;
        self.store
            .try_update(id, |current| {
                if current.version != loaded {
                    return Err(AppError::Conflict(format!(
                        "license {id} was modified by another request"
                    )));
                }
                *current = stored;
                Ok(())
            })
            .ok_or_else(|| AppError::NotFound(format!("license {id} not found")))??;
        entity.version = loaded + 1;
        Ok(())
    }

    fn transition_kwargs(
        &self,
        transition: &TransitionName,
        request: &TransitionRequest<'_, CallerIdentity>,
    ) -> Option<Result<Kwargs, AppError>> {
        match transition.as_str() {
            "issue" => Some(issue_kwargs(request)),
            "reject" | "suspend" | "revoke" => Some(super::reason_kwargs(request)),
            _ => None,
        }
    }
}

fn issue_kwargs(request: &TransitionRequest<'_, CallerIdentity>) -> Result<Kwargs, AppError> {
    let mut kwargs = Kwargs::new();
    if let Some(expires_at) = request.body_field::<DateTime<Utc>>("expires_at")? {
        kwargs.insert(
            "expires_at".to_string(),
            Value::String(expires_at.to_rfc3339()),
        );
    }
    Ok(kwargs)
}

/// Transition actions for licenses.
pub fn transitions() -> Result<TransitionMixin<LicenseViewSet>, TableError> {
    TransitionMixin::new()
}

/// Build the licenses router.
pub fn router(state: &AppState) -> Result<Router<AppState>, TableError> {
    let mixin = transitions()?;
    super::log_routes("licenses", &mixin.routes(PREFIX));
    let viewset = LicenseViewSet::new(state.licenses.clone());

    Ok(Router::new()
        .route(PREFIX, get(list_licenses).post(create_license))
        .route(&format!("{PREFIX}/{{id}}"), get(get_license))
        .merge(mixin.router(PREFIX).with_state::<AppState>(viewset)))
}

async fn list_licenses(State(state): State<AppState>) -> Json<Vec<License>> {
    let mut licenses = state.licenses.list();
    licenses.sort_by_key(|l| l.created_at);
    Json(licenses)
}

async fn create_license(
    State(state): State<AppState>,
    Caller(caller): Caller<CallerIdentity>,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<License>), AppError> {
    let req = extract_validated_json(body)?;
    let license = License::new_application(req.license_type.trim(), caller.username);
    state.licenses.insert(license.id, license.clone());
    tracing::info!(
        license_id = %license.id,
        holder = %license.holder,
        "license application created"
    );
    Ok((StatusCode::CREATED, Json(license)))
}

async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<License>, AppError> {
    state
        .licenses
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("license {id} not found")))
}
