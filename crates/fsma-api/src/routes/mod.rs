//! # API Route Modules
//!
//! - `documents` — document CRUD plus review-workflow transitions
//!   under `/v1/documents`.
//! - `licenses` — license CRUD plus lifecycle transitions under
//!   `/v1/licenses`.

pub mod documents;
pub mod licenses;

use fsma_core::Kwargs;

use crate::error::AppError;
use crate::mixin::TransitionRoute;
use crate::viewset::TransitionRequest;

/// Kwargs carrying the optional `reason` string from the request body.
pub(crate) fn reason_kwargs<C>(request: &TransitionRequest<'_, C>) -> Result<Kwargs, AppError> {
    let mut kwargs = Kwargs::new();
    if let Some(reason) = request.body_field::<String>("reason")? {
        kwargs.insert("reason".to_string(), serde_json::Value::String(reason));
    }
    Ok(kwargs)
}

pub(crate) fn log_routes(resource: &str, routes: &[TransitionRoute]) {
    for route in routes {
        tracing::info!(
            resource,
            method = %route.method,
            path = %route.path,
            description = route.description.as_deref().unwrap_or(""),
            "transition route registered"
        );
    }
}
