use serde::{Deserialize, Serialize};

use warung_sales::CartItem;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Body of every JSON response except `/health`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    /// Machine-readable error code; only set on failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            error: None,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn failure(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(code),
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}
