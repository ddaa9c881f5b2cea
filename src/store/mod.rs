//! Persistence ports for users and tickets.
//!
//! Two backends implement them: [`MongoStore`] for deployments and
//! [`MemoryStore`] for tests and local runs without a database.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Ticket, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index (user id, email, ticket id) rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("stored document is malformed: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// All users ordered by name.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Debits `price` and records `ticket_id` as owned in one atomic step.
    ///
    /// The write only applies while the user does not own the ticket and the
    /// balance covers the price. Returns the updated user, or `None` when the
    /// condition did not hold (or the user vanished) at write time.
    async fn purchase(
        &self,
        user_id: &str,
        ticket_id: &str,
        price: Decimal,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, StoreError>;

    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError>;

    /// Tickets whose id appears in `ids`, ordered by title. Unknown ids are skipped.
    async fn find_tickets(&self, ids: &[String]) -> Result<Vec<Ticket>, StoreError>;

    /// All tickets ordered by title.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError>;
}
