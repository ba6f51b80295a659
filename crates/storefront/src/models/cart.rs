//! Cart and shipping address types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use oakhouse_core::ProductId;

/// Delivery details captured at checkout and copied onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

impl ShippingAddress {
    /// Trim every field and require all but the postal code.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing field.
    pub fn normalized(self) -> Result<Self, String> {
        let address = Self {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
        };

        for (field, value) in [
            ("full_name", &address.full_name),
            ("phone", &address.phone),
            ("address", &address.address),
            ("city", &address.city),
        ] {
            if value.is_empty() {
                return Err(format!("{field} is required"));
            }
        }

        let digits = address.phone.chars().filter(char::is_ascii_digit).count();
        let phone_ok = address
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !phone_ok || !(9..=15).contains(&digits) {
            return Err("phone must be a valid phone number".to_string());
        }

        Ok(address)
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    /// Current catalog price, not a snapshot.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Units still in stock.
    pub stock: i32,
    pub quantity: i32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub shipping_address: Option<ShippingAddress>,
}

impl CartView {
    #[must_use]
    pub fn new(items: Vec<CartLine>, shipping_address: Option<ShippingAddress>) -> Self {
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();
        let subtotal = items.iter().map(CartLine::line_total).sum();
        Self {
            items,
            item_count,
            subtotal,
            shipping_address,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
