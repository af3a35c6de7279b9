use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::ProductSnapshot;
use crate::error::{LedgerError, LedgerResult};

/// Fulfilment state of an order. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Shipped)
                | (Pending, Delivered)
                | (Processing, Shipped)
                | (Processing, Delivered)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One line of a placed order, with the price captured at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub product_name: String,
}

impl OrderItem {
    pub fn from_snapshot(snapshot: ProductSnapshot, quantity: u32) -> Self {
        Self {
            product_id: snapshot.product_id,
            quantity,
            unit_price: snapshot.unit_price,
            product_name: snapshot.name,
        }
    }

    /// Unit price times quantity, `None` when it overflows.
    pub fn extension(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Represents a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub buyer_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order. The total is computed here and never again.
    pub fn new(id: impl Into<String>, buyer_id: impl Into<String>, items: Vec<OrderItem>) -> LedgerResult<Self> {
        let total_amount = items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.extension()?))
            .ok_or_else(|| LedgerError::Validation("order total out of range".to_string()))?;
        Ok(Self {
            id: id.into(),
            buyer_id: buyer_id.into(),
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Short reference used in wallet descriptions.
    pub fn reference(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// A product and quantity the buyer intends to purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: String,
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lines: Vec::new(),
        }
    }

    pub fn add(&mut self, product_id: &str, quantity: u32) -> LedgerResult<()> {
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| LedgerError::Validation(format!("quantity out of range for {}", product_id)))?;
            }
            None => self.lines.push(CartLine::new(product_id, quantity)),
        }
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
