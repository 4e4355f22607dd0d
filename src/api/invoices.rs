//! Invoice endpoints: save, fetch, update status.

use super::{ApiError, AppState};
use crate::error::Error;
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Response to `POST /api/save-invoice`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// Key the invoice was stored under.
    pub invoice_number: String,
}

/// Persist a new (or replacement) invoice.
///
/// # Errors
///
/// 400 when a required field is missing or empty; 500 on backend failure.
pub async fn save(
    State(state): State<AppState>,
    Json(draft): Json<InvoiceDraft>,
) -> Result<Json<SaveResponse>, ApiError> {
    let record = state.store.put(draft).await?;
    info!("Saved invoice {}", record.invoice_number);
    Ok(Json(SaveResponse {
        success: true,
        message: "Invoice saved successfully".to_string(),
        invoice_number: record.invoice_number,
    }))
}

/// Response to `GET /api/get-invoice/{invoiceNumber}`.
#[derive(Debug, Serialize)]
pub struct GetResponse {
    /// Always `true` on success.
    pub success: bool,
    /// The stored invoice.
    pub invoice: InvoiceRecord,
}

/// Fetch one invoice by its number.
///
/// # Errors
///
/// 400 for a blank invoice number, 404 when nothing is stored under it,
/// 500 on backend failure.
pub async fn get_one(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<Json<GetResponse>, ApiError> {
    if invoice_number.trim().is_empty() {
        return Err(Error::Validation("invoice number is required".to_string()).into());
    }
    let record = state
        .store
        .get(&invoice_number)
        .await?
        .ok_or_else(|| Error::NotFound(invoice_number))?;
    Ok(Json(GetResponse {
        success: true,
        invoice: record,
    }))
}

/// Request body for `PUT /api/update-invoice`. `status` stays a string so an
/// unknown value is a validation error, not a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Key of the invoice to update.
    #[serde(default)]
    pub invoice_number: String,
    /// New status: `pending`, `paid` or `overdue`.
    #[serde(default)]
    pub status: String,
}

/// Response to `PUT /api/update-invoice`.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    /// Always `true` on success.
    pub success: bool,
    /// Human-readable confirmation.
    pub message: String,
    /// The invoice after the update.
    pub invoice: InvoiceRecord,
}

/// Change the status of an existing invoice.
///
/// # Errors
///
/// 400 for missing fields or an unknown status, 404 when the invoice does
/// not exist, 500 on backend failure.
pub async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    if request.invoice_number.trim().is_empty() || request.status.trim().is_empty() {
        return Err(
            Error::Validation("invoice number and status are required".to_string()).into(),
        );
    }
    let status: InvoiceStatus = request.status.parse()?;
    let record = state
        .store
        .update_status(&request.invoice_number, status)
        .await?;
    info!("Invoice {} marked {}", record.invoice_number, record.status);
    Ok(Json(UpdateResponse {
        success: true,
        message: "Invoice status updated successfully".to_string(),
        invoice: record,
    }))
}
