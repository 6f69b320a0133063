//! Request and response shapes exchanged with the Sweet Shop API.

pub mod auth;
pub mod sweet;

pub use auth::{Credentials, Registration, RegisteredUser, Role, TokenResponse};
pub use sweet::{NewSweet, PurchaseReceipt, RestockReceipt, SearchQuery, Sweet, SweetId};
