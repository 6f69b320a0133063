use crate::api::ShopClient;
use crate::auth::{TokenStore, role_of};
use crate::error::ShopError;
use crate::types::{NewSweet, PurchaseReceipt, RestockReceipt, Role, SearchQuery, Sweet, SweetId};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LOAD_FAILED: &str = "Failed to load sweets. Please try again.";
pub const OUT_OF_STOCK: &str = "Out of stock!";
pub const PURCHASE_FAILED: &str = "Purchase failed. Please try again.";

/// Local mirror of the catalog as last reported by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub sweets: Vec<Sweet>,
    pub loading: bool,
    pub error: Option<String>,
    /// Item whose purchase is in flight.
    pub purchasing: Option<SweetId>,
    pub role: Option<Role>,
}

impl DashboardState {
    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }

    pub fn find(&self, id: SweetId) -> Option<&Sweet> {
        self.sweets.iter().find(|s| s.id == id)
    }

    fn find_mut(&mut self, id: SweetId) -> Option<&mut Sweet> {
        self.sweets.iter_mut().find(|s| s.id == id)
    }
}

/// Controller behind the catalog screen.
pub struct Dashboard {
    client: ShopClient,
    store: Arc<dyn TokenStore>,
    state: DashboardState,
}

impl Dashboard {
    /// Build a dashboard for the session held in `store`.
    pub fn new(client: ShopClient, store: Arc<dyn TokenStore>) -> Result<Self, ShopError> {
        let token = crate::service::session::stored_token(store.as_ref())?;
        let role = token.as_deref().and_then(role_of);
        let client = client.with_token(token);
        Ok(Self {
            client,
            store,
            state: DashboardState {
                role,
                ..DashboardState::default()
            },
        })
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn client(&self) -> &ShopClient {
        &self.client
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.token().is_some()
    }

    /// Reload the full catalog. Also the "try again" action after a failure.
    pub async fn refresh(&mut self) -> Result<(), ShopError> {
        self.state.loading = true;
        let result = self.client.list_sweets().await;
        self.apply_listing(result)
    }

    pub async fn search(&mut self, query: &SearchQuery) -> Result<(), ShopError> {
        if query.is_empty() {
            return self.refresh().await;
        }
        self.state.loading = true;
        let result = self.client.search_sweets(query).await;
        self.apply_listing(result)
    }

    fn apply_listing(&mut self, result: Result<Vec<Sweet>, ShopError>) -> Result<(), ShopError> {
        self.state.loading = false;
        match result {
            Ok(sweets) => {
                debug!(count = sweets.len(), "catalog updated");
                self.state.sweets = sweets;
                self.state.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "error fetching sweets");
                self.state.error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Buy an item and reconcile its stock with the server's answer.
    pub async fn purchase(
        &mut self,
        id: SweetId,
        quantity: Option<u32>,
    ) -> Result<PurchaseReceipt, ShopError> {
        if self.state.purchasing.is_some() {
            return Err(ShopError::Busy);
        }
        if self.state.find(id).is_some_and(|s| !s.in_stock()) {
            return Err(ShopError::OutOfStock);
        }

        self.state.purchasing = Some(id);
        let result = self.client.purchase(id, quantity).await;
        self.state.purchasing = None;

        match result {
            Ok(receipt) => {
                if let Some(sweet) = self.state.find_mut(id) {
                    sweet.quantity = receipt.remaining_stock;
                }
                Ok(receipt)
            }
            Err(e) => {
                warn!(id, error = %e, "error purchasing sweet");
                Err(e)
            }
        }
    }

    fn require_admin(&self) -> Result<(), ShopError> {
        if !self.is_logged_in() {
            return Err(ShopError::NotAuthenticated);
        }
        if !self.state.is_admin() {
            return Err(ShopError::Forbidden);
        }
        Ok(())
    }

    pub async fn create(&mut self, item: &NewSweet) -> Result<Sweet, ShopError> {
        self.require_admin()?;
        item.validate().map_err(ShopError::InvalidInput)?;
        let created = self.client.create_sweet(item).await?;
        self.state.sweets.push(created.clone());
        Ok(created)
    }

    pub async fn update(&mut self, id: SweetId, item: &NewSweet) -> Result<Sweet, ShopError> {
        self.require_admin()?;
        item.validate().map_err(ShopError::InvalidInput)?;
        let updated = self.client.update_sweet(id, item).await?;
        match self.state.find_mut(id) {
            Some(slot) => *slot = updated.clone(),
            None => self.state.sweets.push(updated.clone()),
        }
        Ok(updated)
    }

    pub async fn restock(&mut self, id: SweetId, quantity: u32) -> Result<RestockReceipt, ShopError> {
        self.require_admin()?;
        if quantity == 0 {
            return Err(ShopError::InvalidInput(
                "restock quantity must be positive".to_string(),
            ));
        }
        let receipt = self.client.restock(id, quantity).await?;
        if let Some(sweet) = self.state.find_mut(id) {
            sweet.quantity = receipt.new_stock;
        }
        Ok(receipt)
    }

    pub async fn delete(&mut self, id: SweetId) -> Result<(), ShopError> {
        self.require_admin()?;
        self.client.delete_sweet(id).await?;
        self.state.sweets.retain(|s| s.id != id);
        Ok(())
    }

    /// Forget the session: drop the stored token and all view state.
    pub fn logout(&mut self) -> Result<(), ShopError> {
        self.store.clear()?;
        self.client.set_token(None);
        self.state = DashboardState::default();
        info!("logged out");
        Ok(())
    }
}

/// Alert text for a failed purchase.
pub fn purchase_alert(err: &ShopError) -> String {
    match err {
        ShopError::OutOfStock => OUT_OF_STOCK.to_string(),
        ShopError::Busy => err.to_string(),
        ShopError::Api { status, detail } if *status == StatusCode::BAD_REQUEST => {
            detail.as_deref().unwrap_or(OUT_OF_STOCK).to_string()
        }
        _ => PURCHASE_FAILED.to_string(),
    }
}
