use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub from_location: String,
    pub to_location: String,
    pub to_location_photo_url: String,
    pub created_by: Option<String>,
}

/// Ticket fields as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub title: String,
    #[serde(rename = "ticket_price")]
    pub price: Decimal,
    pub from_location: String,
    pub to_location: String,
    pub to_location_photo_url: String,
}

impl NewTicket {
    pub fn validate(&self) -> Result<()> {
        let text_fields = [
            ("title", &self.title),
            ("from_location", &self.from_location),
            ("to_location", &self.to_location),
            ("to_location_photo_url", &self.to_location_photo_url),
        ];
        if let Some((field, _)) = text_fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{field} must not be empty")));
        }
        if self.price <= Decimal::ZERO {
            return Err(AppError::Validation(
                "ticket_price must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_ticket(self, created_by: Option<String>) -> Ticket {
        Ticket {
            id: Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            price: self.price,
            from_location: self.from_location.trim().to_string(),
            to_location: self.to_location.trim().to_string(),
            to_location_photo_url: self.to_location_photo_url.trim().to_string(),
            created_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketView {
    pub id: String,
    pub title: String,
    pub ticket_price: Decimal,
    pub from_location: String,
    pub to_location: String,
    pub to_location_photo_url: String,
}

impl From<&Ticket> for TicketView {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id.clone(),
            title: ticket.title.clone(),
            ticket_price: ticket.price,
            from_location: ticket.from_location.clone(),
            to_location: ticket.to_location.clone(),
            to_location_photo_url: ticket.to_location_photo_url.clone(),
        }
    }
}
