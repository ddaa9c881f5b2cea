//! The balance-debiting ticket purchase.
//!
//! Preconditions are checked in a fixed order so each failure is reported
//! distinctly: unknown user, unknown ticket, already owned, not enough money.
//! The write itself is a single conditional store operation that re-checks
//! ownership and balance, so concurrent purchases by the same user can never
//! overdraw or grant a ticket twice.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::models::{Ticket, TicketView, User, UserView};
use crate::store::{TicketStore, UserStore};

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub user: UserView,
    pub ticket: TicketView,
}

pub struct PurchaseService {
    users: Arc<dyn UserStore>,
    tickets: Arc<dyn TicketStore>,
}

impl PurchaseService {
    pub fn new(users: Arc<dyn UserStore>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { users, tickets }
    }

    #[instrument(name = "purchase::buy", skip(self))]
    pub async fn buy(&self, user_id: &str, ticket_id: &str) -> Result<PurchaseReceipt> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let ticket = self
            .tickets
            .find_ticket(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound)?;
        check_purchase(&user, &ticket)?;

        let updated = match self.users.purchase(&user.id, &ticket.id, ticket.price).await? {
            Some(updated) => updated,
            None => return Err(self.explain_rejected_write(user_id, &ticket).await),
        };

        tracing::info!(
            user_id = %updated.id,
            ticket_id = %ticket.id,
            price = %ticket.price,
            balance = %updated.money_balance,
            "Ticket purchased"
        );
        Ok(PurchaseReceipt {
            user: UserView::from(updated),
            ticket: TicketView::from(&ticket),
        })
    }

    /// The conditional write matched nothing: something changed between the
    /// read and the write. Re-read and report what no longer holds.
    async fn explain_rejected_write(&self, user_id: &str, ticket: &Ticket) -> AppError {
        let current = match self.users.find_user_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return AppError::UserNotFound,
            Err(e) => return e.into(),
        };
        match check_purchase(&current, ticket) {
            Err(e) => {
                tracing::info!(user_id, ticket_id = %ticket.id, reason = %e, "Purchase lost a concurrent race");
                e
            }
            Ok(()) => AppError::Internal(format!(
                "conditional purchase of {} for {user_id} matched no document",
                ticket.id
            )),
        }
    }
}

fn check_purchase(user: &User, ticket: &Ticket) -> Result<()> {
    if user.owns(&ticket.id) {
        return Err(AppError::AlreadyPurchased);
    }
    if !user.can_afford(ticket.price) {
        return Err(AppError::InsufficientBalance);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::Role;
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: PurchaseService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let service = PurchaseService::new(store.clone(), store.clone());
            Self { store, service }
        }

        async fn user(&self, balance: i64) -> User {
            let user = User::new(
                "buyer",
                &format!("buyer{balance}@example.com"),
                "$argon2id$hash".into(),
                Decimal::from(balance),
                Role::User,
            );
            self.store.insert_user(user).await.unwrap()
        }

        async fn ticket(&self, title: &str, price: i64) -> Ticket {
            let ticket = Ticket {
                id: format!("ticket-{title}"),
                title: title.into(),
                price: Decimal::from(price),
                from_location: "Vilnius".into(),
                to_location: "Warsaw".into(),
                to_location_photo_url: "https://img.example.com/warsaw.jpg".into(),
                created_by: None,
            };
            self.store.insert_ticket(ticket).await.unwrap()
        }

        async fn reload(&self, id: &str) -> User {
            self.store.find_user_by_id(id).await.unwrap().unwrap()
        }
    }

    #[tokio::test]
    async fn purchase_debits_balance_and_grants_ticket() {
        let fx = Fixture::new();
        let user = fx.user(100).await;
        let ticket = fx.ticket("train", 40).await;

        let receipt = fx.service.buy(&user.id, &ticket.id).await.unwrap();

        assert_eq!(receipt.user.money_balance, Decimal::from(60));
        assert_eq!(receipt.user.bought_tickets, vec![ticket.id.clone()]);
        assert_eq!(receipt.ticket.ticket_price, Decimal::from(40));
        let json = serde_json::to_string(&receipt).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn insufficient_balance_changes_nothing() {
        let fx = Fixture::new();
        let user = fx.user(30).await;
        let ticket = fx.ticket("train", 40).await;

        let err = fx.service.buy(&user.id, &ticket.id).await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientBalance));
        let stored = fx.reload(&user.id).await;
        assert_eq!(stored.money_balance, Decimal::from(30));
        assert!(stored.bought_tickets.is_empty());
    }

    #[tokio::test]
    async fn second_purchase_of_same_ticket_is_refused() {
        let fx = Fixture::new();
        let user = fx.user(100).await;
        let ticket = fx.ticket("train", 40).await;
        fx.service.buy(&user.id, &ticket.id).await.unwrap();

        let err = fx.service.buy(&user.id, &ticket.id).await.unwrap_err();

        assert!(matches!(err, AppError::AlreadyPurchased));
        let stored = fx.reload(&user.id).await;
        assert_eq!(stored.money_balance, Decimal::from(60));
        assert_eq!(stored.bought_tickets.len(), 1);
    }

    #[tokio::test]
    async fn ownership_is_checked_before_balance() {
        let fx = Fixture::new();
        let user = fx.user(40).await;
        let ticket = fx.ticket("train", 40).await;
        fx.service.buy(&user.id, &ticket.id).await.unwrap();

        // Balance is now zero, but the ticket is already owned.
        let err = fx.service.buy(&user.id, &ticket.id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyPurchased));
    }

    #[tokio::test]
    async fn unknown_user_is_reported_before_unknown_ticket() {
        let fx = Fixture::new();
        let err = fx.service.buy("ghost", "also-missing").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));

        let user = fx.user(100).await;
        let err = fx.service.buy(&user.id, "also-missing").await.unwrap_err();
        assert!(matches!(err, AppError::TicketNotFound));
    }

    #[tokio::test]
    async fn exact_balance_is_enough() {
        let fx = Fixture::new();
        let user = fx.user(40).await;
        let ticket = fx.ticket("train", 40).await;
        let receipt = fx.service.buy(&user.id, &ticket.id).await.unwrap();
        assert_eq!(receipt.user.money_balance, Decimal::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_cannot_overdraw() {
        let fx = Arc::new(Fixture::new());
        let user = fx.user(100).await;
        let first = fx.ticket("train", 60).await;
        let second = fx.ticket("ferry", 70).await;

        let a = {
            let fx = fx.clone();
            let (uid, tid) = (user.id.clone(), first.id.clone());
            tokio::spawn(async move { fx.service.buy(&uid, &tid).await })
        };
        let b = {
            let fx = fx.clone();
            let (uid, tid) = (user.id.clone(), second.id.clone());
            tokio::spawn(async move { fx.service.buy(&uid, &tid).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::InsufficientBalance))));
        let stored = fx.reload(&user.id).await;
        assert_eq!(stored.bought_tickets.len(), 1);
        assert!(stored.money_balance >= Decimal::ZERO);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_of_same_ticket_grant_it_once() {
        let fx = Arc::new(Fixture::new());
        let user = fx.user(500).await;
        let ticket = fx.ticket("train", 40).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let fx = fx.clone();
                let (uid, tid) = (user.id.clone(), ticket.id.clone());
                tokio::spawn(async move { fx.service.buy(&uid, &tid).await })
            })
            .collect();
        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, AppError::AlreadyPurchased)),
            }
        }

        assert_eq!(successes, 1);
        let stored = fx.reload(&user.id).await;
        assert_eq!(stored.bought_tickets, vec![ticket.id.clone()]);
        assert_eq!(stored.money_balance, Decimal::from(460));
    }
}
