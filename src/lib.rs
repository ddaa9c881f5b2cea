pub mod config;
pub mod db;
pub mod error;
pub mod middlewares;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::routes::auth::auth_routes;
use crate::routes::tickets::ticket_routes;
use crate::routes::users::user_routes;
use crate::services::{Accounts, Catalog, PasswordService, PurchaseService, Reports, TokenService};
use crate::store::{TicketStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<Accounts>,
    pub catalog: Arc<Catalog>,
    pub purchases: Arc<PurchaseService>,
    pub reports: Arc<Reports>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        tickets: Arc<dyn TicketStore>,
    ) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenService::new(&config.tokens));
        let passwords = PasswordService::new(config.hashing)?;

        Ok(Self {
            accounts: Arc::new(Accounts::new(
                users.clone(),
                tokens.clone(),
                passwords,
                config.starting_balance,
                config.admin_emails.clone(),
            )),
            catalog: Arc::new(Catalog::new(tickets.clone())),
            purchases: Arc::new(PurchaseService::new(users.clone(), tickets.clone())),
            reports: Arc::new(Reports::new(users.clone(), tickets)),
            users,
            tokens,
        })
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn app(state: AppState) -> Router {
    let user_router = Router::new()
        .merge(auth_routes())
        .merge(user_routes(state.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/users", user_router)
        .nest("/tickets", ticket_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
