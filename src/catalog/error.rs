use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(Decimal),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
