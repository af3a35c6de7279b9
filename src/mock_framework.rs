//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] or [`create_mock_ledger`] to get a client and the
//! receiving end of its channel, then answer requests with the `expect_*` helpers.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Entity, FrameworkError, ResourceClient, ResourceRequest};
use crate::catalog::DynProductCatalog;
use crate::domain::OrderItem;
use crate::ledger::{LedgerClient, LedgerRequest, OrderReceipt, ServiceResponse};

/// Creates a mock client and a receiver for asserting requests.
///
/// The client sends to a channel the test owns, so the test plays the actor:
/// it inspects each request and decides the reply.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// A ledger client whose requests land on the returned receiver.
pub fn create_mock_ledger(
    buffer_size: usize,
    catalog: impl crate::catalog::ProductCatalog + 'static,
) -> (LedgerClient, mpsc::Receiver<LedgerRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let catalog: DynProductCatalog = Arc::new(catalog);
    (LedgerClient::new(sender, catalog), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, oneshot::Sender<Result<T::Id, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Action, oneshot::Sender<Result<T::ActionResult, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { id, action, respond_to }) => Some((id, action, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next ledger message is a PlaceOrder request
pub async fn expect_place_order(
    receiver: &mut mpsc::Receiver<LedgerRequest>,
) -> Option<(String, Vec<OrderItem>, ServiceResponse<OrderReceipt>)> {
    match receiver.recv().await {
        Some(LedgerRequest::PlaceOrder {
            actor_id,
            items,
            respond_to,
        }) => Some((actor_id, items, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Product, ProductCreate};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Product>(10);

        let create_task = tokio::spawn(async move {
            let product = ProductCreate {
                name: "Herbal Tea".to_string(),
                category: "Wellness".to_string(),
                price: Decimal::from(12),
            };
            client.create(product).await
        });

        let (payload, responder) = expect_create(&mut receiver).await.expect("Expected Create request");
        assert_eq!(payload.name, "Herbal Tea");
        responder.send(Ok("product_1".to_string())).unwrap();

        let result = create_task.await.unwrap();
        assert_eq!(result, Ok("product_1".to_string()));
    }
}
