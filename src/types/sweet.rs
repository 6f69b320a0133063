use serde::{Deserialize, Serialize};

pub type SweetId = i64;

/// A catalog item as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sweet {
    pub id: SweetId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Sweet {
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Body for creating or replacing a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSweet {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewSweet {
    /// Reject payloads the backend would store but the catalog cannot display sensibly.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("price must be a non-negative number, got {}", self.price));
        }
        if self.quantity < 0 {
            return Err(format!("quantity must not be negative, got {}", self.quantity));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub remaining_stock: i64,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RestockReceipt {
    pub new_stock: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Filters for `/sweets/search`. Unset or blank fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        self.to_pairs().is_empty()
    }

    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let mut pairs = Vec::new();
        if let Some(name) = text(&self.name) {
            pairs.push(("name", name));
        }
        if let Some(category) = text(&self.category) {
            pairs.push(("category", category));
        }
        if let Some(min) = self.min_price {
            pairs.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            pairs.push(("max_price", max.to_string()));
        }
        pairs
    }
}
