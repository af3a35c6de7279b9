//! In-process product catalog, run on the generic resource actor.
//!
//! Checkout only needs [`ProductCatalog::lookup_product`]; the rest of the
//! client exists so the demo and tests can stock the shelves.

mod actions;
pub mod client;
pub mod entity;
pub mod error;

pub use actions::*;
pub use client::*;
pub use error::*;
