//! Payment proxy routes.
//!
//! - POST `/checkout` - JSON checkout request
//! - POST `/manual` - Manual payment proof upload (multipart form data)

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    response::{IntoResponse, Response},
    routing::post,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{info, warn};

use super::error::{ApiError, Reply, parse_json_object};
use crate::auth::RequireBearer;
use crate::client::{ApiClient, FetchRequest};
use crate::impl_has_cookie_settings;

/// Largest accepted payment proof upload: 10 MiB.
pub const MAX_PROOF_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct PaymentsState {
    pub api: ApiClient,
    pub secure_cookies: bool,
}

impl_has_cookie_settings!(PaymentsState);

pub fn router(state: PaymentsState) -> Router {
    Router::new()
        .route("/checkout", post(checkout))
        .route(
            "/manual",
            post(submit_manual_payment).layer(DefaultBodyLimit::max(MAX_PROOF_BYTES)),
        )
        .with_state(state)
}

async fn checkout(
    State(state): State<PaymentsState>,
    RequireBearer(store): RequireBearer,
    body: Bytes,
) -> Result<Response, ApiError> {
    let fields = parse_json_object(&body)?;
    let request = FetchRequest::post("/payments/checkout").json(Value::Object(fields));

    let response = state.api.fetch(&store, request).await?.error_for_status()?;
    info!("Payment checkout relayed");

    Ok(store.apply(Reply::relay(&response, "Checkout created").into_response()))
}

/// One field of the incoming multipart form.
#[derive(Debug)]
enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

async fn read_fields(mut multipart: Multipart) -> Result<Vec<FormField>, ApiError> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Failed to read multipart field");
        ApiError::bad_request("Invalid form data")
    })? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("Invalid form data"))?;

        fields.push(match file_name {
            Some(file_name) => FormField::File {
                name,
                file_name,
                content_type,
                bytes,
            },
            None => FormField::Text {
                name,
                value: String::from_utf8_lossy(&bytes).into_owned(),
            },
        });
    }
    Ok(fields)
}

fn build_form(fields: Vec<FormField>) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        match field {
            FormField::Text { name, value } => {
                form = form.text(name, value);
            }
            FormField::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.to_vec()).file_name(file_name);
                if let Some(content_type) = content_type {
                    part = part
                        .mime_str(&content_type)
                        .map_err(|_| ApiError::bad_request("Invalid file content type"))?;
                }
                form = form.part(name, part);
            }
        }
    }
    Ok(form)
}

async fn submit_manual_payment(
    State(state): State<PaymentsState>,
    RequireBearer(store): RequireBearer,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::bad_request("Expected multipart form data"))?;
    let fields = read_fields(multipart).await?;

    let file_count = fields
        .iter()
        .filter(|f| matches!(f, FormField::File { bytes, .. } if !bytes.is_empty()))
        .count();
    if file_count == 0 {
        return Err(ApiError::bad_request("Payment proof file is required"));
    }

    let request = FetchRequest::post("/payments/manual").multipart(build_form(fields)?);
    let response = state.api.fetch(&store, request).await?.error_for_status()?;
    info!(files = file_count, "Manual payment proof relayed");

    Ok(store.apply(Reply::relay(&response, "Payment proof submitted").into_response()))
}
