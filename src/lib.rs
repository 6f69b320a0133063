pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod service;
pub mod types;
pub mod view;

pub use api::ShopClient;
pub use error::ShopError;
