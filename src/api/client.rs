use crate::api::endpoints;
use crate::config::Config;
use crate::error::ShopError;
use crate::types::{
    Credentials, NewSweet, PurchaseReceipt, RegisteredUser, Registration, RestockReceipt,
    SearchQuery, Sweet, SweetId, TokenResponse,
};
use backon::{ExponentialBuilder, Retryable};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Typed client for the Sweet Shop HTTP API.
///
/// Holds the bearer credential for the current session, if any, and attaches
/// it to every request. Cheap to clone; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct ShopClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
    retry_max_times: usize,
}

impl ShopClient {
    /// Build a client with timeouts and proxy settings from `cfg`.
    pub fn new(cfg: &Config) -> Result<Self, ShopError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("sweetshop/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout());
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let http = builder.build()?;
        Ok(Self::with_http(http, cfg.api_url.clone()).with_retries(cfg.retry_max_times))
    }

    pub fn with_http(http: reqwest::Client, base: Url) -> Self {
        Self {
            http,
            base: endpoints::normalize_base(base),
            token: None,
            retry_max_times: 0,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_retries(mut self, max_times: usize) -> Self {
        self.retry_max_times = max_times;
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ShopError> {
        endpoints::resolve(&self.base, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.retry_max_times)
            .with_jitter()
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, ShopError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ShopError::from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    /// GET with backoff on transport failures and 5xx. Only for idempotent reads.
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&'static str, String)],
    ) -> Result<T, ShopError> {
        (|| async {
            let req = self.authorize(self.http.get(url.clone()).query(query));
            Self::send_json::<T>(req).await
        })
        .retry(self.retry_policy())
        .when(|e: &ShopError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!(url = %url, error = %err, "read failed, retrying after {:?}", dur);
        })
        .await
    }

    /// Exchange username/password for a bearer token. The form is URL-encoded.
    pub async fn login(&self, creds: &Credentials) -> Result<TokenResponse, ShopError> {
        let url = self.url(endpoints::LOGIN)?;
        let token: TokenResponse = Self::send_json(self.http.post(url).form(creds)).await?;
        info!(username = %creds.username, "logged in");
        Ok(token)
    }

    pub async fn register(&self, registration: &Registration) -> Result<RegisteredUser, ShopError> {
        let url = self.url(endpoints::REGISTER)?;
        let user: RegisteredUser =
            Self::send_json(self.http.post(url).json(registration)).await?;
        info!(username = %user.username, role = %registration.role, "registered");
        Ok(user)
    }

    pub async fn list_sweets(&self) -> Result<Vec<Sweet>, ShopError> {
        let sweets: Vec<Sweet> = self.get_with_retry(self.url(endpoints::SWEETS)?, &[]).await?;
        debug!(count = sweets.len(), "fetched sweets");
        Ok(sweets)
    }

    pub async fn search_sweets(&self, query: &SearchQuery) -> Result<Vec<Sweet>, ShopError> {
        let pairs = query.to_pairs();
        let sweets: Vec<Sweet> = self
            .get_with_retry(self.url(endpoints::SEARCH)?, &pairs)
            .await?;
        debug!(count = sweets.len(), filters = pairs.len(), "search returned");
        Ok(sweets)
    }

    pub async fn get_sweet(&self, id: SweetId) -> Result<Sweet, ShopError> {
        self.get_with_retry(self.url(&endpoints::sweet(id))?, &[])
            .await
    }

    pub async fn create_sweet(&self, item: &NewSweet) -> Result<Sweet, ShopError> {
        let url = self.url(endpoints::SWEETS)?;
        let created: Sweet =
            Self::send_json(self.authorize(self.http.post(url).json(item))).await?;
        info!(id = created.id, name = %created.name, "sweet created");
        Ok(created)
    }

    pub async fn update_sweet(&self, id: SweetId, item: &NewSweet) -> Result<Sweet, ShopError> {
        let url = self.url(&endpoints::sweet(id))?;
        let updated: Sweet = Self::send_json(self.authorize(self.http.put(url).json(item))).await?;
        info!(id, name = %updated.name, "sweet updated");
        Ok(updated)
    }

    /// Buy `quantity` units (the backend defaults to one when omitted).
    pub async fn purchase(
        &self,
        id: SweetId,
        quantity: Option<u32>,
    ) -> Result<PurchaseReceipt, ShopError> {
        let url = self.url(&endpoints::purchase(id))?;
        let mut req = self.http.post(url);
        if let Some(q) = quantity {
            req = req.query(&[("quantity", q)]);
        }
        let receipt: PurchaseReceipt = Self::send_json(self.authorize(req)).await?;
        info!(id, remaining = receipt.remaining_stock, "purchase completed");
        Ok(receipt)
    }

    pub async fn restock(&self, id: SweetId, quantity: u32) -> Result<RestockReceipt, ShopError> {
        let url = self.url(&endpoints::restock(id))?;
        let req = self.http.post(url).query(&[("quantity", quantity)]);
        let receipt: RestockReceipt = Self::send_json(self.authorize(req)).await?;
        info!(id, new_stock = receipt.new_stock, "restock completed");
        Ok(receipt)
    }

    pub async fn delete_sweet(&self, id: SweetId) -> Result<(), ShopError> {
        let url = self.url(&endpoints::sweet(id))?;
        let resp = self.authorize(self.http.delete(url)).send().await?;
        if !resp.status().is_success() {
            return Err(ShopError::from_response(resp).await);
        }
        info!(id, "sweet deleted");
        Ok(())
    }
}
