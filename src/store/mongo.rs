use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, Decimal128, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{StoreError, TicketStore, UserStore};
use crate::models::{Role, Ticket, User};

const USERS: &str = "users";
const TICKETS: &str = "tickets";
const DUPLICATE_KEY: i32 = 11000;

// `_id` is left to MongoDB; records are addressed by their `id` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    money_balance: Decimal128,
    #[serde(default)]
    bought_tickets: Vec<String>,
    #[serde(default)]
    role: Role,
    created_at: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TicketDocument {
    id: String,
    title: String,
    ticket_price: Decimal128,
    from_location: String,
    to_location: String,
    to_location_photo_url: String,
    #[serde(default)]
    created_by: Option<String>,
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn users(&self) -> Collection<UserDocument> {
        self.db.collection(USERS)
    }

    fn tickets(&self) -> Collection<TicketDocument> {
        self.db.collection(TICKETS)
    }

    /// Creates the unique indexes the stores rely on for id and email uniqueness.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        for key in ["id", "email"] {
            let mut keys = Document::new();
            keys.insert(key, 1);
            let model = IndexModel::builder()
                .keys(keys)
                .options(unique())
                .build();
            self.users().create_index(model, None).await?;
        }
        let model = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(unique())
            .build();
        self.tickets().create_index(model, None).await?;

        tracing::debug!("MongoDB indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let document = UserDocument::try_from(&user)?;
        self.users()
            .insert_one(document, None)
            .await
            .map_err(|e| classify_write_error(e, &user.email))?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "id": id }, None)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "email": email }, None)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "name": 1, "id": 1 })
            .build();
        let documents: Vec<UserDocument> =
            self.users().find(doc! {}, options).await?.try_collect().await?;
        documents.into_iter().map(User::try_from).collect()
    }

    async fn purchase(
        &self,
        user_id: &str,
        ticket_id: &str,
        price: Decimal,
    ) -> Result<Option<User>, StoreError> {
        let (filter, update) = purchase_write(user_id, ticket_id, price)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.users()
            .find_one_and_update(filter, update, options)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

/// Filter and update for a purchase. The filter re-checks ownership and
/// balance at write time.
fn purchase_write(
    user_id: &str,
    ticket_id: &str,
    price: Decimal,
) -> Result<(Document, Document), StoreError> {
    let minimum = to_decimal128(price)?;
    let debit = to_decimal128(-price)?;
    let filter = doc! {
        "id": user_id,
        "bought_tickets": { "$ne": ticket_id },
        "money_balance": { "$gte": minimum },
    };
    let update = doc! {
        "$inc": { "money_balance": debit },
        "$push": { "bought_tickets": ticket_id },
    };
    Ok((filter, update))
}

#[async_trait]
impl TicketStore for MongoStore {
    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, StoreError> {
        let document = TicketDocument::try_from(&ticket)?;
        self.tickets()
            .insert_one(document, None)
            .await
            .map_err(|e| classify_write_error(e, &ticket.id))?;
        Ok(ticket)
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        self.tickets()
            .find_one(doc! { "id": id }, None)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn find_tickets(&self, ids: &[String]) -> Result<Vec<Ticket>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let options = FindOptions::builder().sort(doc! { "title": 1 }).build();
        let documents: Vec<TicketDocument> = self
            .tickets()
            .find(doc! { "id": { "$in": ids.to_vec() } }, options)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(Ticket::try_from).collect()
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "title": 1 }).build();
        let documents: Vec<TicketDocument> = self
            .tickets()
            .find(doc! {}, options)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(Ticket::try_from).collect()
    }
}

fn classify_write_error(err: mongodb::error::Error, key: &str) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY {
            return StoreError::Duplicate(key.to_string());
        }
    }
    StoreError::Mongo(err)
}

fn to_decimal128(value: Decimal) -> Result<Decimal128, StoreError> {
    Decimal128::from_str(&value.to_string())
        .map_err(|e| StoreError::Corrupt(format!("cannot encode {value} as Decimal128: {e:?}")))
}

fn from_decimal128(value: &Decimal128) -> Result<Decimal, StoreError> {
    let text = value.to_string();
    // Decimal128 renders large exponents in scientific notation.
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| StoreError::Corrupt(format!("cannot decode Decimal128 {text}: {e}")))
}

impl TryFrom<&User> for UserDocument {
    type Error = StoreError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        Ok(Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            money_balance: to_decimal128(user.money_balance)?,
            bought_tickets: user.bought_tickets.clone(),
            role: user.role,
            created_at: bson::DateTime::from_millis(user.created_at.timestamp_millis()),
        })
    }
}

impl TryFrom<UserDocument> for User {
    type Error = StoreError;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(document.created_at.timestamp_millis())
            .ok_or_else(|| StoreError::Corrupt(format!("user {} has bad created_at", document.id)))?;
        Ok(Self {
            money_balance: from_decimal128(&document.money_balance)?,
            id: document.id,
            name: document.name,
            email: document.email,
            password_hash: document.password_hash,
            bought_tickets: document.bought_tickets,
            role: document.role,
            created_at,
        })
    }
}

impl TryFrom<&Ticket> for TicketDocument {
    type Error = StoreError;

    fn try_from(ticket: &Ticket) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ticket.id.clone(),
            title: ticket.title.clone(),
            ticket_price: to_decimal128(ticket.price)?,
            from_location: ticket.from_location.clone(),
            to_location: ticket.to_location.clone(),
            to_location_photo_url: ticket.to_location_photo_url.clone(),
            created_by: ticket.created_by.clone(),
        })
    }
}

impl TryFrom<TicketDocument> for Ticket {
    type Error = StoreError;

    fn try_from(document: TicketDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            price: from_decimal128(&document.ticket_price)?,
            id: document.id,
            title: document.title,
            from_location: document.from_location,
            to_location: document.to_location,
            to_location_photo_url: document.to_location_photo_url,
            created_by: document.created_by,
        })
    }
}
