pub mod accounts;
pub mod catalog;
pub mod passwords;
pub mod purchase;
pub mod reports;
pub mod tokens;

pub use accounts::{Accounts, Credentials, Registration};
pub use catalog::Catalog;
pub use passwords::PasswordService;
pub use purchase::{PurchaseReceipt, PurchaseService};
pub use reports::Reports;
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};
