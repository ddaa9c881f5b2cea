use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ticket::TicketView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub money_balance: Decimal,
    pub bought_tickets: Vec<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a freshly registered user with a new id and no tickets.
    pub fn new(
        name: &str,
        email: &str,
        password_hash: String,
        starting_balance: Decimal,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: normalize_name(name),
            email: email.trim().to_string(),
            password_hash,
            money_balance: starting_balance,
            bought_tickets: Vec::new(),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn owns(&self, ticket_id: &str) -> bool {
        self.bought_tickets.iter().any(|id| id == ticket_id)
    }

    pub fn can_afford(&self, price: Decimal) -> bool {
        self.money_balance >= price
    }
}

/// Client-facing shape of a user. Carries no password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub money_balance: Decimal,
    pub bought_tickets: Vec<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            money_balance: user.money_balance,
            bought_tickets: user.bought_tickets.clone(),
        }
    }
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            money_balance: user.money_balance,
            bought_tickets: user.bought_tickets,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithTickets {
    #[serde(flatten)]
    pub user: UserView,
    pub user_tickets: Vec<TicketView>,
}

/// Upper-cases the first character and lower-cases the rest.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
