//! API handlers. Each one is a thin adapter over a gateway operation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::gateway::{
    DonationReceipt, DonationRequest, FundingReceipt, GatewayError, PendingFormData,
    TransactionRecord, WalletSession,
};
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: bool,
    pub connected: bool,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundLoanRequest {
    pub recipient: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: Option<u64>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let session = state.gateway.session().await;
    Json(HealthResponse {
        status: "ok",
        provider: state.gateway.has_provider(),
        connected: session.is_connected,
        loading: state.gateway.is_loading(),
    })
}

pub async fn get_session(State(state): State<AppState>) -> Json<WalletSession> {
    Json(state.gateway.session().await)
}

pub async fn connect(State(state): State<AppState>) -> Result<Json<WalletSession>, GatewayError> {
    state.gateway.connect().await.map(Json)
}

pub async fn send_donation(
    State(state): State<AppState>,
    Json(request): Json<DonationRequest>,
) -> Result<Json<DonationReceipt>, GatewayError> {
    state.gateway.send_donation(request).await.map(Json)
}

pub async fn fund_loan(
    State(state): State<AppState>,
    Json(request): Json<FundLoanRequest>,
) -> Result<Json<FundingReceipt>, GatewayError> {
    state
        .gateway
        .fund_fixed_recipient(&request.recipient, &request.amount)
        .await
        .map(Json)
}

/// Fresh read of the full ledger. Always 200; an unreachable chain yields `[]`.
pub async fn list_transactions(State(state): State<AppState>) -> Json<Vec<TransactionRecord>> {
    Json(state.gateway.fetch_all_transactions().await)
}

pub async fn list_zakat_transactions(State(state): State<AppState>) -> Json<Vec<TransactionRecord>> {
    Json(state.gateway.fetch_zakat_transactions().await)
}

pub async fn transaction_count(State(state): State<AppState>) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.gateway.refresh_transaction_count().await,
    })
}

pub async fn get_form(State(state): State<AppState>) -> Json<PendingFormData> {
    Json(state.gateway.pending_form().await)
}

pub async fn put_form(
    State(state): State<AppState>,
    Json(form): Json<PendingFormData>,
) -> StatusCode {
    state.gateway.update_pending_form(form).await;
    StatusCode::NO_CONTENT
}

pub async fn submit_form(State(state): State<AppState>) -> Result<Json<DonationReceipt>, GatewayError> {
    state.gateway.submit_pending_form().await.map(Json)
}
