use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::ApiJson;
use crate::AppState;
use crate::error::AppError;
use crate::middlewares::{AuthUser, RequireAdmin, require_auth};

async fn my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let tickets = state.reports.my_tickets(&user.id).await?;

    Ok(Json(json!({
        "message": "My tickets",
        "total_tickets": tickets.len(),
        "tickets": tickets,
    })))
}

#[derive(Deserialize)]
struct BuyTicketRequest {
    ticket_id: String,
}

async fn buy_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<BuyTicketRequest>,
) -> Result<Json<Value>, AppError> {
    let ticket_id = req.ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(AppError::Validation("ticket_id is required".to_string()));
    }

    let receipt = state.purchases.buy(&user.id, ticket_id).await?;

    Ok(Json(json!({
        "message": "Ticket was bought successfully",
        "user": receipt.user,
        "ticket": receipt.ticket,
    })))
}

async fn all_users(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Value>, AppError> {
    let users = state.reports.all_users().await?;
    Ok(Json(json!({ "users": users })))
}

async fn user_by_id(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = state.reports.user_by_id(&id).await?;
    Ok(Json(json!({ "user": user })))
}

async fn all_users_with_tickets(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Value>, AppError> {
    let users = state.reports.users_with_tickets().await?;
    Ok(Json(json!({
        "message": "All users with tickets",
        "users": users,
    })))
}

async fn user_by_id_with_tickets(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = state.reports.user_with_tickets(&id).await?;
    Ok(Json(json!({
        "message": "User by id with tickets",
        "user": user,
    })))
}

/// Routes behind the auth gate. Listing endpoints additionally require the admin role.
pub fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/my-tickets", get(my_tickets))
        .route("/buyTicket", post(buy_ticket))
        .route("/getAllUsers", get(all_users))
        .route("/getUserById/:id", get(user_by_id))
        .route("/getAllUsersWithTickets", get(all_users_with_tickets))
        .route("/getUserByIdWithTickets/:id", get(user_by_id_with_tickets))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
