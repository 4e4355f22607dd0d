//! Invoice records and their validation.
//!
//! The wire format is camelCase JSON; the same shape is stored by every
//! backend so records round-trip byte-identically between the HTTP layer and
//! storage. Incoming writes arrive as an [`InvoiceDraft`] and are completed
//! into an [`InvoiceRecord`] before anything is persisted.

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    /// Payment received.
    Paid,
    /// Past its due date without payment.
    Overdue,
}

impl InvoiceStatus {
    /// The lowercase wire name of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            other => Err(Error::Validation(format!("unknown status: {other}"))),
        }
    }
}

/// A complete, stored invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    /// Unique key; all lookups and updates go through it.
    pub invoice_number: String,
    /// Name of the party being billed.
    pub client_name: String,
    /// What the invoice is for.
    pub description: String,
    /// Amount due, kept as a decimal string to avoid float drift.
    pub amount: String,
    /// ISO due date; absent for open-ended invoices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Receiving wallet address for the payment.
    pub wallet_address: String,
    /// ISO date (`YYYY-MM-DD`) the invoice was created.
    pub created_date: String,
    /// Current lifecycle state.
    pub status: InvoiceStatus,
    /// True when the invoice deliberately has no due date.
    #[serde(default)]
    pub no_deadline: bool,
}

/// A partial invoice as submitted by a client.
///
/// Required string fields default to empty when the JSON omits them, so a
/// missing field and an empty field fail validation identically. `status`
/// stays a plain string here so an unknown value surfaces as a validation
/// error rather than a body-deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    /// Unique key for the new invoice.
    #[serde(default)]
    pub invoice_number: String,
    /// Name of the party being billed.
    #[serde(default)]
    pub client_name: String,
    /// What the invoice is for.
    #[serde(default)]
    pub description: String,
    /// Amount due as a decimal string.
    #[serde(default)]
    pub amount: String,
    /// ISO due date, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Receiving wallet address.
    #[serde(default)]
    pub wallet_address: String,
    /// Creation date override; filled with today (UTC) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    /// Initial status; defaults to `pending` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// True when the invoice deliberately has no due date.
    #[serde(default)]
    pub no_deadline: bool,
}

impl InvoiceDraft {
    /// Validate the draft and complete it into a storable record.
    ///
    /// `createdDate` falls back to today's UTC date and `status` to
    /// `pending`. Empty-string optionals are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a required field is missing or
    /// empty, or when `status` is not one of `pending`, `paid`, `overdue`.
    pub fn into_record(self) -> Result<InvoiceRecord> {
        let required = [
            ("invoiceNumber", &self.invoice_number),
            ("clientName", &self.client_name),
            ("description", &self.description),
            ("amount", &self.amount),
            ("walletAddress", &self.wallet_address),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("missing required field: {name}")));
            }
        }

        let status = match self.status.as_deref() {
            None | Some("") => InvoiceStatus::default(),
            Some(s) => s.parse()?,
        };

        Ok(InvoiceRecord {
            invoice_number: self.invoice_number,
            client_name: self.client_name,
            description: self.description,
            amount: self.amount,
            due_date: self.due_date.filter(|d| !d.is_empty()),
            wallet_address: self.wallet_address,
            created_date: self
                .created_date
                .filter(|d| !d.is_empty())
                .unwrap_or_else(today),
            status,
            no_deadline: self.no_deadline,
        })
    }
}

/// Today's UTC date in the `YYYY-MM-DD` form stored in `createdDate`.
fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Generate a timestamp-derived invoice number (`INV-<unix millis>`).
///
/// Matches the numbering scheme the web client uses when the user does not
/// pick a number themselves.
#[must_use]
pub fn fresh_invoice_number() -> String {
    format!("INV-{}", Utc::now().timestamp_millis())
}
