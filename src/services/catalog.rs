use std::sync::Arc;

use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{NewTicket, Ticket};
use crate::store::TicketStore;

pub struct Catalog {
    tickets: Arc<dyn TicketStore>,
}

impl Catalog {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    #[instrument(name = "catalog::insert", skip(self, new_ticket), fields(title = %new_ticket.title))]
    pub async fn insert(&self, new_ticket: NewTicket, created_by: &str) -> Result<Ticket> {
        new_ticket.validate()?;
        let ticket = self
            .tickets
            .insert_ticket(new_ticket.into_ticket(Some(created_by.to_string())))
            .await?;
        tracing::info!(ticket_id = %ticket.id, price = %ticket.price, "Ticket inserted");
        Ok(ticket)
    }

    pub async fn all(&self) -> Result<Vec<Ticket>> {
        Ok(self.tickets.list_tickets().await?)
    }

    pub async fn by_id(&self, id: &str) -> Result<Ticket> {
        self.tickets
            .find_ticket(id)
            .await?
            .ok_or(AppError::TicketNotFound)
    }
}
