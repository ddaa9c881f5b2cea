use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::passwords::PasswordService;
use super::tokens::{TokenPair, TokenService};
use crate::error::{AppError, Result};
use crate::models::{Role, User};
use crate::store::{StoreError, UserStore};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if !is_plausible_email(self.email.trim()) {
            return Err(AppError::Validation("email must look like name@domain".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN
            || !self.password.chars().any(|c| c.is_ascii_digit())
        {
            return Err(AppError::Validation(
                "password must have at least 6 symbols and 1 number".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AppError::Validation(
                "email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct Accounts {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    passwords: PasswordService,
    starting_balance: Decimal,
    admin_emails: Vec<String>,
}

impl Accounts {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        passwords: PasswordService,
        starting_balance: Decimal,
        admin_emails: Vec<String>,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
            starting_balance,
            admin_emails,
        }
    }

    fn role_for(&self, email: &str) -> Role {
        if self
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
        {
            Role::Admin
        } else {
            Role::User
        }
    }

    #[instrument(name = "accounts::register", skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<(User, TokenPair)> {
        registration.validate()?;
        let email = registration.email.trim();

        if self.users.find_user_by_email(email).await?.is_some() {
            return Err(AppError::EmailTaken);
        }

        let password_hash = self.passwords.hash(&registration.password).await?;
        let user = User::new(
            &registration.name,
            email,
            password_hash,
            self.starting_balance,
            self.role_for(email),
        );

        // A concurrent registration can still win the unique index.
        let user = self.users.insert_user(user).await.map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::EmailTaken,
            other => other.into(),
        })?;

        let tokens = self.tokens.issue_pair(&user.id)?;
        tracing::info!(user_id = %user.id, role = ?user.role, "User registered");
        Ok((user, tokens))
    }

    /// Unknown email and wrong password both end in `InvalidCredentials`.
    #[instrument(name = "accounts::login", skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: Credentials) -> Result<TokenPair> {
        credentials.validate()?;

        let Some(user) = self
            .users
            .find_user_by_email(credentials.email.trim())
            .await?
        else {
            tracing::debug!("Login for unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !self
            .passwords
            .verify(&credentials.password, &user.password_hash)
            .await?
        {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.tokens.issue_pair(&user.id)
    }

    /// New access token for a still-existing user; the refresh token is echoed back.
    #[instrument(name = "accounts::refresh", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        if refresh_token.trim().is_empty() {
            return Err(AppError::MustReauthenticate);
        }
        let (claims, access) = self.tokens.refresh(refresh_token)?;

        if self.users.find_user_by_id(&claims.sub).await?.is_none() {
            tracing::debug!(user_id = %claims.sub, "Refresh for a user that no longer exists");
            return Err(AppError::MustReauthenticate);
        }

        Ok(TokenPair {
            jwt_token: access,
            jwt_refresh_token: refresh_token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::config::TokenConfig;
    use crate::services::passwords::tests::fast_hashing;
    use crate::services::tokens::TokenKind;
    use crate::services::tokens::tests::token_config;
    use crate::store::MemoryStore;

    fn accounts_with(store: Arc<MemoryStore>, tokens: TokenConfig) -> Accounts {
        Accounts::new(
            store,
            Arc::new(TokenService::new(&tokens)),
            PasswordService::new(fast_hashing()).unwrap(),
            Decimal::from(100),
            vec!["boss@example.com".to_string()],
        )
    }

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            name: "rUTA".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn registration_sets_starting_balance_and_hashes_password() {
        let store = Arc::new(MemoryStore::new());
        let accounts = accounts_with(store.clone(), token_config());

        let (user, tokens) = accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(user.name, "Ruta");
        assert_eq!(user.money_balance, Decimal::from(100));
        assert_eq!(user.role, Role::User);
        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");

        let service = TokenService::new(&token_config());
        let claims = service.verify(&tokens.jwt_token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(service
            .verify(&tokens.jwt_refresh_token, TokenKind::Refresh)
            .is_ok());
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());

        for (email, password) in [
            ("no-at-sign", "secret1"),
            (" @ ", "secret1"),
            ("@example.com", "secret1"),
            ("ruta@", "secret1"),
            ("ru ta@example.com", "secret1"),
            ("a@example.com", "short"),
            ("a@example.com", "nodigits"),
        ] {
            let err = accounts
                .register(registration(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{email} {password}");
        }
    }

    #[tokio::test]
    async fn registration_stores_trimmed_email() {
        let store = Arc::new(MemoryStore::new());
        let accounts = accounts_with(store.clone(), token_config());
        let (user, _) = accounts
            .register(registration("  ruta@example.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.email, "ruta@example.com");
        assert!(store.find_user_by_email("ruta@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();
        let err = accounts
            .register(registration("ruta@example.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }

    #[tokio::test]
    async fn listed_admin_email_gets_admin_role() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        let (user, _) = accounts
            .register(registration("Boss@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = accounts
            .login(Credentials {
                email: "ruta@example.com".into(),
                password: "secret2".into(),
            })
            .await
            .unwrap_err();
        let unknown_email = accounts
            .login(Credentials {
                email: "nobody@example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.status(), unknown_email.status());
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_issues_tokens() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();
        let pair = accounts
            .login(Credentials {
                email: "ruta@example.com".into(),
                password: "secret1".into(),
            })
            .await
            .unwrap();
        assert!(!pair.jwt_token.is_empty());
        assert!(!pair.jwt_refresh_token.is_empty());
    }

    #[tokio::test]
    async fn refresh_returns_new_access_token_and_same_refresh_token() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        let (_, pair) = accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();
        let refreshed = accounts.refresh(&pair.jwt_refresh_token).await.unwrap();
        assert_eq!(refreshed.jwt_refresh_token, pair.jwt_refresh_token);
        assert!(!refreshed.jwt_token.is_empty());
    }

    #[tokio::test]
    async fn expired_refresh_token_must_reauthenticate() {
        let config = TokenConfig {
            refresh_ttl: Duration::seconds(-5),
            ..token_config()
        };
        let accounts = accounts_with(Arc::new(MemoryStore::new()), config);
        let (_, pair) = accounts
            .register(registration("ruta@example.com", "secret1"))
            .await
            .unwrap();
        let err = accounts.refresh(&pair.jwt_refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::MustReauthenticate));
    }

    #[tokio::test]
    async fn refresh_for_unknown_user_must_reauthenticate() {
        let accounts = accounts_with(Arc::new(MemoryStore::new()), token_config());
        let orphan = TokenService::new(&token_config())
            .issue_refresh_token("ghost")
            .unwrap();
        let err = accounts.refresh(&orphan).await.unwrap_err();
        assert!(matches!(err, AppError::MustReauthenticate));
    }
}
