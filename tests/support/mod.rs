//! In-process stand-in for the Sweet Shop backend, served by axum on an ephemeral port.

#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};
use sweetshop::types::Sweet;
use tokio::net::TcpListener;
use url::Url;

#[derive(Default)]
struct Inner {
    sweets: Vec<Sweet>,
    users: HashMap<String, (String, String)>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MockShop {
    inner: Arc<Mutex<Inner>>,
    /// Number of upcoming list requests to answer with 503.
    failing_lists: Arc<AtomicUsize>,
    pub list_calls: Arc<AtomicUsize>,
    pub purchase_calls: Arc<AtomicUsize>,
}

pub fn make_token(sub: &str, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(
        json!({ "sub": sub, "role": role, "exp": 4_102_444_800i64 }).to_string(),
    );
    format!("{header}.{body}.mock-signature")
}

pub fn temp_token_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "sweetshop-it-{tag}-{}-{}.token",
        std::process::id(),
        nanos
    ));
    path
}

impl MockShop {
    pub fn add_user(&self, username: &str, password: &str, role: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .insert(username.into(), (password.into(), role.into()));
    }

    pub fn add_sweet(&self, name: &str, category: &str, price: f64, quantity: i64) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.sweets.push(Sweet {
            id,
            name: name.into(),
            category: category.into(),
            price,
            quantity,
            image_url: None,
        });
        id
    }

    pub fn quantity_of(&self, id: i64) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner.sweets.iter().find(|s| s.id == id).map(|s| s.quantity)
    }

    pub fn fail_next_lists(&self, times: usize) {
        self.failing_lists.store(times, Ordering::SeqCst);
    }

    /// Serve on 127.0.0.1 and return the base URL.
    pub async fn spawn(&self) -> Url {
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/sweets/", get(list).post(create))
            .route("/sweets/search", get(search))
            .route("/sweets/{id}", get(show).put(update).delete(remove))
            .route("/sweets/{id}/purchase", post(purchase))
            .route("/sweets/{id}/restock", post(restock))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr = listener.local_addr().expect("mock local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });
        Url::parse(&format!("http://{addr}")).expect("mock url")
    }
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "detail": msg }))).into_response()
}

fn role_from_headers(headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    let claims = sweetshop::auth::decode_claims(token).ok()?;
    claims.role.map(|r| r.to_string())
}

fn require_admin(headers: &HeaderMap) -> Result<(), Response> {
    match role_from_headers(headers).as_deref() {
        Some("admin") => Ok(()),
        Some(_) => Err(detail(
            StatusCode::FORBIDDEN,
            "The user doesn't have enough privileges",
        )),
        None => Err(detail(StatusCode::UNAUTHORIZED, "Not authenticated")),
    }
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(shop): State<MockShop>, Form(form): Form<LoginForm>) -> Response {
    let inner = shop.inner.lock().unwrap();
    match inner.users.get(&form.username) {
        Some((password, role)) if *password == form.password => Json(json!({
            "access_token": make_token(&form.username, role),
            "token_type": "bearer"
        }))
        .into_response(),
        _ => detail(StatusCode::UNAUTHORIZED, "Incorrect username or password"),
    }
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    password: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default = "customer")]
    role: String,
}

fn customer() -> String {
    "customer".into()
}

async fn register(State(shop): State<MockShop>, Json(body): Json<RegisterBody>) -> Response {
    let mut inner = shop.inner.lock().unwrap();
    if inner.users.contains_key(&body.username) {
        return detail(StatusCode::BAD_REQUEST, "Username already registered");
    }
    inner
        .users
        .insert(body.username.clone(), (body.password, body.role.clone()));
    let id = inner.users.len();
    Json(json!({
        "id": id,
        "username": body.username,
        "email": body.email,
        "password_hash": "pbkdf2-sha256$hashed",
        "role": body.role
    }))
    .into_response()
}

async fn list(State(shop): State<MockShop>) -> Response {
    shop.list_calls.fetch_add(1, Ordering::SeqCst);
    let failing = shop
        .failing_lists
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    if failing.is_ok() {
        return detail(StatusCode::SERVICE_UNAVAILABLE, "warming up");
    }
    let inner = shop.inner.lock().unwrap();
    Json(inner.sweets.clone()).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    name: Option<String>,
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

async fn search(State(shop): State<MockShop>, Query(q): Query<SearchParams>) -> Response {
    let contains = |hay: &str, needle: &Option<String>| {
        needle
            .as_deref()
            .is_none_or(|n| hay.to_lowercase().contains(&n.to_lowercase()))
    };
    let inner = shop.inner.lock().unwrap();
    let hits: Vec<Sweet> = inner
        .sweets
        .iter()
        .filter(|s| contains(&s.name, &q.name))
        .filter(|s| contains(&s.category, &q.category))
        .filter(|s| q.min_price.is_none_or(|min| s.price >= min))
        .filter(|s| q.max_price.is_none_or(|max| s.price <= max))
        .cloned()
        .collect();
    Json(hits).into_response()
}

async fn show(State(shop): State<MockShop>, Path(id): Path<i64>) -> Response {
    let inner = shop.inner.lock().unwrap();
    match inner.sweets.iter().find(|s| s.id == id) {
        Some(s) => Json(s.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Sweet not found"),
    }
}

async fn create(State(shop): State<MockShop>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let mut inner = shop.inner.lock().unwrap();
    inner.next_id += 1;
    let mut item = body;
    item["id"] = json!(inner.next_id);
    let sweet: Sweet = match serde_json::from_value(item) {
        Ok(s) => s,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
    };
    inner.sweets.push(sweet.clone());
    (StatusCode::CREATED, Json(sweet)).into_response()
}

async fn update(
    State(shop): State<MockShop>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let mut inner = shop.inner.lock().unwrap();
    let mut item = body;
    item["id"] = json!(id);
    let Ok(sweet) = serde_json::from_value::<Sweet>(item) else {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "invalid sweet");
    };
    match inner.sweets.iter_mut().find(|s| s.id == id) {
        Some(slot) => {
            *slot = sweet.clone();
            Json(sweet).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Sweet not found"),
    }
}

async fn remove(State(shop): State<MockShop>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let mut inner = shop.inner.lock().unwrap();
    let before = inner.sweets.len();
    inner.sweets.retain(|s| s.id != id);
    if inner.sweets.len() == before {
        return detail(StatusCode::NOT_FOUND, "Sweet not found");
    }
    Json(json!({ "message": "Sweet deleted successfully" })).into_response()
}

#[derive(Deserialize)]
struct QuantityParam {
    quantity: Option<i64>,
}

async fn purchase(
    State(shop): State<MockShop>,
    Path(id): Path<i64>,
    Query(q): Query<QuantityParam>,
) -> Response {
    shop.purchase_calls.fetch_add(1, Ordering::SeqCst);
    let wanted = q.quantity.unwrap_or(1);
    let mut inner = shop.inner.lock().unwrap();
    let Some(sweet) = inner.sweets.iter_mut().find(|s| s.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Sweet not found");
    };
    if sweet.quantity < wanted {
        return detail(StatusCode::BAD_REQUEST, "Out of stock");
    }
    sweet.quantity -= wanted;
    Json(json!({
        "message": "Purchase successful",
        "remaining_stock": sweet.quantity
    }))
    .into_response()
}

async fn restock(
    State(shop): State<MockShop>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(q): Query<QuantityParam>,
) -> Response {
    if let Err(resp) = require_admin(&headers) {
        return resp;
    }
    let Some(amount) = q.quantity else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["query", "quantity"], "msg": "field required" }] })),
        )
            .into_response();
    };
    let mut inner = shop.inner.lock().unwrap();
    let Some(sweet) = inner.sweets.iter_mut().find(|s| s.id == id) else {
        return detail(StatusCode::NOT_FOUND, "Sweet not found");
    };
    sweet.quantity += amount;
    Json(json!({ "message": "Restocked", "new_stock": sweet.quantity })).into_response()
}
