//! Presentational helpers shared by the terminal front end.

pub mod render;

pub use render::{buy_label, category_emoji, format_price, render_dashboard, render_sweet, stock_label};
