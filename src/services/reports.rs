use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Ticket, TicketView, User, UserView, UserWithTickets};
use crate::store::{TicketStore, UserStore};

/// Read-only views joining users to the tickets they bought.
pub struct Reports {
    users: Arc<dyn UserStore>,
    tickets: Arc<dyn TicketStore>,
}

impl Reports {
    pub fn new(users: Arc<dyn UserStore>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { users, tickets }
    }

    pub async fn all_users(&self) -> Result<Vec<UserView>> {
        let users = self.users.list_users().await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn user_by_id(&self, id: &str) -> Result<UserView> {
        self.users
            .find_user_by_id(id)
            .await?
            .map(UserView::from)
            .ok_or(AppError::UserNotFound)
    }

    /// Users owning at least one ticket, by name, each with full ticket details.
    pub async fn users_with_tickets(&self) -> Result<Vec<UserWithTickets>> {
        let owners: Vec<User> = self
            .users
            .list_users()
            .await?
            .into_iter()
            .filter(|u| !u.bought_tickets.is_empty())
            .collect();

        let mut wanted: Vec<String> = owners
            .iter()
            .flat_map(|u| u.bought_tickets.iter().cloned())
            .collect();
        wanted.sort();
        wanted.dedup();

        let by_id: HashMap<String, Ticket> = self
            .tickets
            .find_tickets(&wanted)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        Ok(owners
            .into_iter()
            .map(|user| join(user, &by_id))
            .collect())
    }

    pub async fn user_with_tickets(&self, id: &str) -> Result<UserWithTickets> {
        let user = self
            .users
            .find_user_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let tickets = self.tickets.find_tickets(&user.bought_tickets).await?;
        Ok(UserWithTickets {
            user: UserView::from(user),
            user_tickets: tickets.iter().map(TicketView::from).collect(),
        })
    }

    /// Tickets owned by `user_id`, ordered by title.
    pub async fn my_tickets(&self, user_id: &str) -> Result<Vec<TicketView>> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let tickets = self.tickets.find_tickets(&user.bought_tickets).await?;
        Ok(tickets.iter().map(TicketView::from).collect())
    }
}

fn join(user: User, by_id: &HashMap<String, Ticket>) -> UserWithTickets {
    let mut user_tickets: Vec<TicketView> = user
        .bought_tickets
        .iter()
        .filter_map(|id| by_id.get(id))
        .map(TicketView::from)
        .collect();
    user_tickets.sort_by(|a, b| a.title.cmp(&b.title));
    UserWithTickets {
        user: UserView::from(user),
        user_tickets,
    }
}
