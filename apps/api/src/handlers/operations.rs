use super::*;

/// Charges one play on a machine terminal.
pub async fn punch_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<TenantQuery>,
    Json(payload): Json<PunchRequest>,
) -> ApiResult<Json<PunchResponse>> {
    let receipt = state
        .ledger_service
        .punch(
            &caller,
            query.requested_tenant(&caller)?,
            &payload.card_id,
            &payload.machine_id,
        )
        .await?;

    Ok(Json(PunchResponse::from(receipt)))
}

pub async fn card_status_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(card_id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> ApiResult<Json<CardStatusResponse>> {
    let status = state
        .ledger_service
        .card_status(&caller, query.requested_tenant(&caller)?, &card_id)
        .await?;

    Ok(Json(CardStatusResponse::from(status)))
}
