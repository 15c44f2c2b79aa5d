//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ACTIONS, ActionRequest, DeleteResponse, ErrorResponse, HealthResponse, ImageQueryResponse,
        InsertResponse, LinksResponse, StatusResponse, TagEditResponse, decode_image,
        search_constraints,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use birdtag_core::CatalogError;
use serde::Serialize;

// =============================================================================
// RESPONSE HELPERS
// =============================================================================

fn ok<T: Serialize>(body: &T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(msg))).into_response()
}

/// Map an engine error to its HTTP status and message.
fn catalog_error_response(e: &CatalogError) -> Response {
    match e {
        CatalogError::InvalidArgument(msg) | CatalogError::InvalidBlobUrl(msg) => {
            error_response(StatusCode::BAD_REQUEST, msg.clone())
        }
        CatalogError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg.clone()),
        CatalogError::Unsupported(msg) => error_response(StatusCode::NOT_IMPLEMENTED, msg.clone()),
        CatalogError::StoreFailure(_)
        | CatalogError::BlobFailure(_)
        | CatalogError::Serialization(_)
        | CatalogError::Io(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get catalog status.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let engine = state.engine.read().await;
    match engine.backend_status() {
        Ok(status) => ok(&StatusResponse {
            records: status.records,
            distinct_tags: status.distinct_tags,
            backend: status.backend,
            blob_backend: status.blob_backend,
            add_policy: status.add_policy,
            classifier: state.classifier.is_some(),
        }),
        Err(e) => {
            tracing::error!(error = %e, "status failed");
            catalog_error_response(&e)
        }
    }
}

// =============================================================================
// ACTION HANDLER
// =============================================================================

/// Single action-dispatch endpoint.
///
/// The body is parsed here rather than by the `Json` extractor so that a
/// missing content type is not a rejection and every parse failure gets the
/// same error envelope.
pub async fn action_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed body");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e));
        }
    };

    let known = value
        .get("action")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|action| ACTIONS.contains(&action));
    if !known {
        return error_response(StatusCode::BAD_REQUEST, "Invalid or missing action");
    }

    let request: ActionRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid parameters: {}", e));
        }
    };

    let action = request.name();
    match dispatch(&state, request).await {
        Ok(response) => {
            tracing::debug!(action, "action completed");
            response
        }
        Err(e) => {
            tracing::warn!(action, error = %e, "action failed");
            catalog_error_response(&e)
        }
    }
}

/// Run one action against the engine.
///
/// Reads share the engine lock; writes hold it exclusively for the whole
/// batch.
async fn dispatch(state: &AppState, request: ActionRequest) -> Result<Response, CatalogError> {
    match request {
        ActionRequest::Search { tags } => {
            let constraints = search_constraints(tags.as_ref())?;
            let engine = state.engine.read().await;
            let links = engine.search(constraints)?;
            Ok(ok(&LinksResponse { links }))
        }

        ActionRequest::Fuzzy { tags } => {
            let engine = state.engine.read().await;
            let links = engine.fuzzy(tags.unwrap_or_default())?;
            Ok(ok(&LinksResponse { links }))
        }

        ActionRequest::Thumbnail { thumbnail } => {
            let engine = state.engine.read().await;
            match engine.thumbnail(thumbnail.as_deref().unwrap_or_default())? {
                Some(record) => Ok(ok(&record)),
                None => Ok(ok(&serde_json::json!({}))),
            }
        }

        ActionRequest::TagEdit {
            urls,
            tags,
            operation,
        } => {
            let operation = operation
                .ok_or_else(|| CatalogError::InvalidArgument("Missing operation".to_string()))?
                .to_operation()?;
            let mut engine = state.engine.write().await;
            let report = engine.edit_tags(&urls, &tags[..], operation)?;
            Ok(ok(&TagEditResponse::success(report.updated)))
        }

        ActionRequest::Delete { urls } => {
            let mut engine = state.engine.write().await;
            let report = engine.delete(&urls)?;
            Ok(ok(&DeleteResponse {
                deleted: report.deleted,
                blob_failures: report.blob_failures,
            }))
        }

        ActionRequest::Insert(new) => {
            let mut engine = state.engine.write().await;
            let filename = engine.insert(new)?;
            Ok(ok(&InsertResponse::success(filename)))
        }

        ActionRequest::UploadQuery { image } => {
            let classifier = state.classifier.as_ref().ok_or_else(|| {
                CatalogError::Unsupported("No image classifier configured".to_string())
            })?;
            let bytes = decode_image(image.as_deref())?;
            let engine = state.engine.read().await;
            let result = engine.search_by_image(classifier.as_ref(), &bytes)?;
            Ok(ok(&ImageQueryResponse::from(result)))
        }
    }
}
