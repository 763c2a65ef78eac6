use axum::{
    extract::{Query, State},
    Json,
};
use basket_core::{Money, ReceiptId, UserId};
use basket_storage::{
    DeleteOutcome, MostBoughtItem, ReceiptItemRecord, ReceiptRecord, MOST_BOUGHT_LIMIT,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

// ── Request shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptRequest {
    pub image_base64: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsQuery {
    pub receipt_id: Option<String>,
}

// ── Response shapes ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptResponse {
    pub ok: bool,
    pub receipt_id: ReceiptId,
    /// Number of line items stored.
    pub items: usize,
}

#[derive(Debug, Serialize)]
pub struct ReceiptListResponse {
    pub ok: bool,
    pub receipts: Vec<ReceiptRecord>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptDetailsResponse {
    pub ok: bool,
    pub receipt: ReceiptRecord,
    pub items: Vec<ReceiptItemRecord>,
}

#[derive(Debug, Serialize)]
pub struct DeleteReceiptResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: DeleteOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendSummaryResponse {
    pub total_spent: Money,
}

// ── Parameter helpers ────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require_user(value: Option<String>) -> Result<UserId, AppError> {
    non_empty(value)
        .map(UserId)
        .ok_or(AppError::BadRequest("Missing userId"))
}

fn require_receipt_id(value: Option<String>) -> Result<ReceiptId, AppError> {
    let raw = non_empty(value).ok_or(AppError::BadRequest("Missing receipt id"))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid receipt id"))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// OCR an uploaded receipt photo, parse it and store the result.
pub async fn create_receipt(
    State(state): State<AppState>,
    Json(req): Json<CreateReceiptRequest>,
) -> Result<Json<CreateReceiptResponse>, AppError> {
    let (image, user_id) = match (non_empty(req.image_base64), non_empty(req.user_id)) {
        (Some(image), Some(user)) => (image, UserId(user)),
        _ => return Err(AppError::BadRequest("Missing data")),
    };

    tracing::info!(user = %user_id, bytes = image.len(), "running receipt OCR");
    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.process_base64(&image))
        .await
        .map_err(|e| AppError::Internal(format!("OCR task failed: {e}")))??;

    let receipt_id =
        basket_storage::insert_receipt(&state.db, &user_id, &result.ocr_text, &result.parsed).await?;

    Ok(Json(CreateReceiptResponse {
        ok: true,
        receipt_id,
        items: result.parsed.items.len(),
    }))
}

pub async fn list_receipts(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<ReceiptListResponse>, AppError> {
    let user_id = require_user(q.user_id)?;
    let receipts = basket_storage::list_receipts(&state.db, &user_id).await?;
    Ok(Json(ReceiptListResponse { ok: true, receipts }))
}

pub async fn receipt_details(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Json<ReceiptDetailsResponse>, AppError> {
    let id = require_receipt_id(q.id)?;
    let receipt = basket_storage::get_receipt_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Receipt not found"))?;
    let items = basket_storage::get_receipt_items(&state.db, id).await?;
    Ok(Json(ReceiptDetailsResponse { ok: true, receipt, items }))
}

/// Deleting an unknown id succeeds with zero counts.
pub async fn delete_receipt(
    State(state): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Json<DeleteReceiptResponse>, AppError> {
    let id = require_receipt_id(q.id)?;
    let outcome = basket_storage::delete_receipt(&state.db, id).await?;
    tracing::info!(receipt_id = %id, removed = outcome.removed, "receipt deleted");
    Ok(Json(DeleteReceiptResponse { ok: true, outcome }))
}

pub async fn receipt_items(
    State(state): State<AppState>,
    Query(q): Query<ItemsQuery>,
) -> Result<Json<Vec<ReceiptItemRecord>>, AppError> {
    let id = require_receipt_id(q.receipt_id)?;
    Ok(Json(basket_storage::get_receipt_items(&state.db, id).await?))
}

pub async fn spend_summary(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<SpendSummaryResponse>, AppError> {
    let user_id = require_user(q.user_id)?;
    let total_spent = basket_storage::total_spent(&state.db, &user_id).await?;
    Ok(Json(SpendSummaryResponse { total_spent }))
}

pub async fn most_bought(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<MostBoughtItem>>, AppError> {
    let user_id = require_user(q.user_id)?;
    Ok(Json(
        basket_storage::most_bought_items(&state.db, &user_id, MOST_BOUGHT_LIMIT).await?,
    ))
}
