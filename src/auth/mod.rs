//! Bearer credential handling: local persistence and claim decoding.

pub mod claims;
pub mod token_store;

pub use claims::{TokenClaims, current_role, decode_claims, role_of};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
