use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::ApiJson;
use crate::AppState;
use crate::error::AppError;
use crate::models::UserView;
use crate::services::{Credentials, Registration};

async fn sign_up(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> Result<Json<Value>, AppError> {
    let (user, tokens) = state.accounts.register(req).await?;

    Ok(Json(json!({
        "message": "User was created successfully",
        "jwt_token": tokens.jwt_token,
        "jwt_refresh_token": tokens.jwt_refresh_token,
        "user": UserView::from(user),
    })))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> Result<Json<Value>, AppError> {
    let tokens = state.accounts.login(req).await?;

    Ok(Json(json!({
        "message": "Logged in successfully",
        "jwt_token": tokens.jwt_token,
        "jwt_refresh_token": tokens.jwt_refresh_token,
    })))
}

#[derive(Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    jwt_refresh_token: String,
}

async fn new_jwt_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let tokens = state.accounts.refresh(&req.jwt_refresh_token).await?;

    Ok(Json(json!({
        "message": "New JWT token created",
        "jwt_token": tokens.jwt_token,
        "jwt_refresh_token": tokens.jwt_refresh_token,
    })))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signUp", post(sign_up))
        .route("/login", post(login))
        .route("/getNewJwtToken", post(new_jwt_token))
}
