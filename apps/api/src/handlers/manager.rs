use super::*;

pub async fn register_card_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<TenantQuery>,
    Json(payload): Json<RegisterCardRequest>,
) -> ApiResult<(StatusCode, Json<CardResponse>)> {
    let card = state
        .ledger_service
        .register_card(&caller, query.requested_tenant(&caller)?, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(CardResponse::from(card))))
}

pub async fn recharge_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<TenantQuery>,
    Json(payload): Json<RechargeRequest>,
) -> ApiResult<Json<RechargeResponse>> {
    let receipt = state
        .ledger_service
        .recharge(
            &caller,
            query.requested_tenant(&caller)?,
            &payload.card_id,
            payload.amount,
        )
        .await?;

    Ok(Json(RechargeResponse::from(receipt)))
}

pub async fn refund_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<TenantQuery>,
    Json(payload): Json<RefundRequest>,
) -> ApiResult<Json<RefundResponse>> {
    let receipt = state
        .ledger_service
        .refund(
            &caller,
            query.requested_tenant(&caller)?,
            &payload.card_id,
            payload.reason.as_deref(),
        )
        .await?;

    Ok(Json(RefundResponse::from(receipt)))
}

pub async fn list_cards_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<CardResponse>>> {
    let cards = state
        .ledger_service
        .list_cards(&caller, query.requested_tenant(&caller)?, query.page())
        .await?
        .into_iter()
        .map(CardResponse::from)
        .collect();

    Ok(Json(cards))
}

pub async fn card_history_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(card_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let records = state
        .ledger_service
        .card_history(&caller, query.requested_tenant(&caller)?, &card_id, query.page())
        .await?
        .into_iter()
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn list_machines_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<MachineResponse>>> {
    let machines = state
        .ledger_service
        .list_machines(&caller, query.requested_tenant(&caller)?, query.page())
        .await?
        .into_iter()
        .map(MachineResponse::from)
        .collect();

    Ok(Json(machines))
}

pub async fn list_transactions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<TransactionFilterQuery>,
) -> ApiResult<Json<Vec<TransactionResponse>>> {
    let records = state
        .ledger_service
        .list_transactions(&caller, query.requested_tenant(&caller)?, query.to_query()?)
        .await?
        .into_iter()
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(records))
}

pub async fn list_audit_log_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<AuditLogEntryResponse>>> {
    let entries = state
        .ledger_service
        .list_audit_log(&caller, query.requested_tenant(&caller)?, query.page())
        .await?
        .into_iter()
        .map(AuditLogEntryResponse::from)
        .collect();

    Ok(Json(entries))
}
