//! Paths of the Sweet Shop API, relative to the configured base URL.

use crate::error::ShopError;
use crate::types::SweetId;
use url::Url;

pub const LOGIN: &str = "auth/login";
pub const REGISTER: &str = "auth/register";
pub const SWEETS: &str = "sweets/";
pub const SEARCH: &str = "sweets/search";

pub fn sweet(id: SweetId) -> String {
    format!("sweets/{id}")
}

pub fn purchase(id: SweetId) -> String {
    format!("sweets/{id}/purchase")
}

pub fn restock(id: SweetId) -> String {
    format!("sweets/{id}/restock")
}

/// Treat the base as a directory so that `https://host/api` + `sweets/`
/// resolves to `https://host/api/sweets/` rather than replacing `api`.
pub fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base.set_fragment(None);
    base
}

pub fn resolve(base: &Url, path: &str) -> Result<Url, ShopError> {
    Ok(base.join(path)?)
}
