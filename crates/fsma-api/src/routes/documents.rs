//! # Document API
//!
//! | Method | Path                                        |
//! |--------|---------------------------------------------|
//! | GET    | `/v1/documents`                             |
//! | POST   | `/v1/documents`                             |
//! | GET    | `/v1/documents/{id}`                        |
//! | POST   | `/v1/documents/{id}/{approve,reject,publish}/` |
//! | GET    | `/v1/documents/{id}/possible-transitions/`  |
//!
//! Loading a document prefetches its history. The serializer prefers the
//! prefetched copy, so a response rendered from a stale cache would show
//! the pre-transition history.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use fsma_core::{CallerIdentity, Kwargs, TableError, TransitionName};
use fsma_state::document::HISTORY_RELATION;
use fsma_state::Document;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::mixin::TransitionMixin;
use crate::state::{AppState, Store};
use crate::viewset::{TransitionRequest, TransitionViewSet};

pub const PREFIX: &str = "/v1/documents";

/// Request to create a draft document.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateDocumentRequest {
    pub title: String,
}

impl Validate for CreateDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank("title", &self.title)
    }
}

/// Transition view set over the document store.
#[derive(Debug, Clone)]
pub struct DocumentViewSet {
    store: Store<Document>,
}

impl DocumentViewSet {
    pub fn new(store: Store<Document>) -> Self {
        Self { store }
    }
}

impl TransitionViewSet for DocumentViewSet {
    type Entity = Document;
    type Caller = CallerIdentity;
    type Id = Uuid;

    fn get_object(&self, id: &Uuid) -> Result<Document, AppError> {
        let mut doc = self
            .store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))?;
        let history = serde_json::to_value(&doc.history)
            .map_err(|e| AppError::Internal(format!("failed to prefetch history: {e}")))?;
        doc.prefetched.insert(HISTORY_RELATION, history);
        Ok(doc)
    }

    /// Writes only if the stored version still matches the loaded one.
    fn save(&self, id: &Uuid, entity: &mut Document) -> Result<(), AppError> {
        let loaded = entity.version;
        let mut stored = entity.clone();
        stored.prefetched.clear();
        stored.version = loaded + 1;
        self.store
            .try_update(id, |current| {
                if current.version != loaded {
                    return Err(AppError::Conflict(format!(
                        "document {id} was modified by another request"
                    )));
                }
                *current = stored;
                Ok(())
            })
            .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))??;
        entity.version = loaded + 1;
        Ok(())
    }

    fn serialize(&self, entity: &Document) -> Result<Value, AppError> {
        render(entity)
    }

    fn transition_kwargs(
        &self,
        transition: &TransitionName,
        request: &TransitionRequest<'_, CallerIdentity>,
    ) -> Option<Result<Kwargs, AppError>> {
        match transition.as_str() {
            "reject" => Some(super::reason_kwargs(request)),
            _ => None,
        }
    }
}

/// Render a document, taking `history` from the prefetch cache when loaded.
fn render(doc: &Document) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(doc)
        .map_err(|e| AppError::Internal(format!("failed to serialize document: {e}")))?;
    if let (Some(history), Value::Object(map)) = (doc.prefetched.get(HISTORY_RELATION), &mut value)
    {
        map.insert(HISTORY_RELATION.to_string(), history.clone());
    }
    Ok(value)
}

/// Transition actions for documents.
pub fn transitions() -> Result<TransitionMixin<DocumentViewSet>, TableError> {
    TransitionMixin::new()
}

/// Build the documents router.
pub fn router(state: &AppState) -> Result<Router<AppState>, TableError> {
    let mixin = transitions()?;
    super::log_routes("documents", &mixin.routes(PREFIX));
    let viewset = DocumentViewSet::new(state.documents.clone());

    Ok(Router::new()
        .route(PREFIX, get(list_documents).post(create_document))
        .route(&format!("{PREFIX}/{{id}}"), get(get_document))
        .merge(mixin.router(PREFIX).with_state::<AppState>(viewset)))
}

async fn list_documents(State(state): State<AppState>) -> Json<Vec<Document>> {
    let mut docs = state.documents.list();
    docs.sort_by_key(|d| d.created_at);
    Json(docs)
}

async fn create_document(
    State(state): State<AppState>,
    Caller(caller): Caller<CallerIdentity>,
    body: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let req = extract_validated_json(body)?;
    let doc = Document::new(req.title.trim(), caller.username);
    state.documents.insert(doc.id, doc.clone());
    tracing::info!(document_id = %doc.id, owner = %doc.owner, "document created");
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    state
        .documents
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("document {id} not found")))
}
