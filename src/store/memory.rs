use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use super::{StoreError, TicketStore, UserStore};
use crate::models::{Ticket, User};

/// Process-local store. Every mutation happens inside a single write-lock
/// critical section, which makes [`UserStore::purchase`] atomic.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    tickets: RwLock<HashMap<String, Ticket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("id {}", user.id)));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn purchase(
        &self,
        user_id: &str,
        ticket_id: &str,
        price: Decimal,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write();
        let Some(user) = users.get_mut(user_id) else {
            return Ok(None);
        };
        if user.owns(ticket_id) || !user.can_afford(price) {
            return Ok(None);
        }
        user.money_balance -= price;
        user.bought_tickets.push(ticket_id.to_string());
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: Ticket) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write();
        if tickets.contains_key(&ticket.id) {
            return Err(StoreError::Duplicate(format!("id {}", ticket.id)));
        }
        tickets.insert(ticket.id.clone(), ticket.clone());
        Ok(ticket)
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tickets.read().get(id).cloned())
    }

    async fn find_tickets(&self, ids: &[String]) -> Result<Vec<Ticket>, StoreError> {
        let tickets = self.tickets.read();
        let mut found: Vec<Ticket> = tickets
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(found)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self.tickets.read().values().cloned().collect();
        tickets.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(name: &str, email: &str, balance: i64) -> User {
        User::new(name, email, "hash".into(), Decimal::from(balance), Role::User)
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(user("a", "a@x.io", 10)).await.unwrap();
        let err = store.insert_user(user("b", "a@x.io", 10)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn purchase_applies_debit_and_grant_together() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("a", "a@x.io", 100)).await.unwrap();

        let updated = store
            .purchase(&u.id, "t-1", Decimal::from(40))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.money_balance, Decimal::from(60));
        assert_eq!(updated.bought_tickets, vec!["t-1".to_string()]);
    }

    #[tokio::test]
    async fn purchase_condition_failure_leaves_user_untouched() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("a", "a@x.io", 30)).await.unwrap();

        assert!(store
            .purchase(&u.id, "t-1", Decimal::from(40))
            .await
            .unwrap()
            .is_none());
        store.purchase(&u.id, "t-2", Decimal::from(10)).await.unwrap();
        assert!(store
            .purchase(&u.id, "t-2", Decimal::from(10))
            .await
            .unwrap()
            .is_none());

        let stored = store.find_user_by_id(&u.id).await.unwrap().unwrap();
        assert_eq!(stored.money_balance, Decimal::from(20));
        assert_eq!(stored.bought_tickets, vec!["t-2".to_string()]);
    }

    #[tokio::test]
    async fn users_are_listed_by_name() {
        let store = MemoryStore::new();
        store.insert_user(user("zoe", "z@x.io", 1)).await.unwrap();
        store.insert_user(user("adam", "a@x.io", 1)).await.unwrap();
        let names: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Adam", "Zoe"]);
    }
}
