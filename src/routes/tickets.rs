use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::ApiJson;
use crate::AppState;
use crate::error::AppError;
use crate::middlewares::{AuthUser, require_auth};
use crate::models::{NewTicket, TicketView};

async fn insert_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewTicket>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let ticket = state.catalog.insert(req, &user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Ticket inserted successfully",
            "ticket": TicketView::from(&ticket),
            "created_by": user.id,
        })),
    ))
}

async fn all_tickets(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let tickets: Vec<TicketView> = state
        .catalog
        .all()
        .await?
        .iter()
        .map(TicketView::from)
        .collect();

    Ok(Json(json!({
        "message": "All tickets retrieved successfully",
        "total_tickets": tickets.len(),
        "tickets": tickets,
    })))
}

async fn ticket_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let ticket = state.catalog.by_id(&id).await?;

    Ok(Json(json!({
        "message": "Ticket retrieved successfully",
        "ticket": TicketView::from(&ticket),
    })))
}

pub fn ticket_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/insert_ticket", post(insert_ticket))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/all", get(all_tickets))
        .route("/:id", get(ticket_by_id))
        .merge(protected)
}
