use crate::service::dashboard::DashboardState;
use crate::types::Sweet;
use std::fmt::Write as _;

const DEFAULT_EMOJI: &str = "🍭";

/// Emoji for a category; unknown categories get a lollipop.
pub fn category_emoji(category: &str) -> &'static str {
    let normalized = category.trim().to_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "chocolate" => "🍫",
        "candy" => "🍬",
        "cake" => "🎂",
        "cookie" => "🍪",
        "ice_cream" | "icecream" => "🍦",
        _ => DEFAULT_EMOJI,
    }
}

pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

pub fn stock_label(quantity: i64) -> String {
    if quantity > 0 {
        format!("{quantity} in stock")
    } else {
        "Out of stock".to_string()
    }
}

/// Label of the buy action for an item, given the in-flight purchase.
pub fn buy_label(sweet: &Sweet, purchasing: Option<i64>) -> &'static str {
    if purchasing == Some(sweet.id) {
        "Purchasing..."
    } else if !sweet.in_stock() {
        "Out of Stock"
    } else {
        "Buy Now"
    }
}

pub fn render_sweet(sweet: &Sweet, purchasing: Option<i64>) -> String {
    format!(
        "{emoji} #{id:<4} {name:<24} {category:<12} {price:>8}  {stock:<14} [{action}]",
        emoji = category_emoji(&sweet.category),
        id = sweet.id,
        name = sweet.name,
        category = sweet.category,
        price = format_price(sweet.price),
        stock = stock_label(sweet.quantity),
        action = buy_label(sweet, purchasing),
    )
}

/// Whole dashboard as text: loading, error with a retry hint, empty state, or the item list.
pub fn render_dashboard(state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🍬 Sweet Shop");
    if let Some(role) = state.role.as_ref() {
        let _ = writeln!(out, "Signed in as {role}");
    }
    let _ = writeln!(out, "Our Sweets Collection");

    if state.loading {
        let _ = writeln!(out, "Loading sweets...");
        return out;
    }
    if let Some(err) = state.error.as_deref() {
        let _ = writeln!(out, "{err}");
        let _ = writeln!(out, "Run the command again to try again.");
        return out;
    }
    if state.sweets.is_empty() {
        let _ = writeln!(out, "{DEFAULT_EMOJI} No sweets available at the moment.");
        return out;
    }
    for sweet in &state.sweets {
        let _ = writeln!(out, "{}", render_sweet(sweet, state.purchasing));
    }
    out
}
