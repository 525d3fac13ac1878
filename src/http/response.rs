//! Error responses.
//!
//! Every gateway failure becomes a JSON body with a stable `error` kind, so
//! clients can branch without parsing messages:
//!
//! ```json
//! { "error": "partial_funding_failure", "message": "...", "transfer_hash": "0x..." }
//! ```

use alloy::primitives::TxHash;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::gateway::GatewayError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_hash: Option<TxHash>,
}

/// HTTP status for a gateway error.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::WalletConnectionRejected(_) => StatusCode::FORBIDDEN,
        GatewayError::InvalidContractConfiguration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::SignerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::InvalidAmount(_) | GatewayError::InvalidRecipient(_) => StatusCode::BAD_REQUEST,
        GatewayError::TransactionFailed(_)
        | GatewayError::TransferUnconfirmed { .. }
        | GatewayError::PartialFundingFailure { .. } => StatusCode::BAD_GATEWAY,
        GatewayError::OperationInFlight(_) => StatusCode::CONFLICT,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            transfer_hash: self.transfer_hash(),
        };
        (status, Json(body)).into_response()
    }
}
