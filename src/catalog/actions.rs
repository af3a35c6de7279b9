use crate::domain::ProductSnapshot;

/// Custom actions for Product entities.
#[derive(Debug, Clone)]
pub enum ProductAction {
    /// Captures the current price and name without modifying the product.
    Snapshot,
}

/// Results from ProductActions - variants match 1:1 with ProductAction
#[derive(Debug, Clone)]
pub enum ProductActionResult {
    Snapshot(ProductSnapshot),
}
