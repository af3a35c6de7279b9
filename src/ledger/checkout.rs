//! Checkout Processor, plus the cart it drains and the order lifecycle after it.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::{checked_sum, commission, new_id, users, wallet};
use crate::domain::{Cart, CommissionLog, Order, OrderItem, OrderStatus, ReferralLevelConfig, WalletTransaction};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

/// Everything one successful checkout wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order: Order,
    /// Absent when the order total is zero.
    pub debit: Option<WalletTransaction>,
    pub commissions: Vec<CommissionLog>,
}

/// Debits the buyer, records the order, empties their cart and pays commission.
///
/// `items` already carry the prices captured from the catalog. The balance is
/// checked before anything is staged.
#[instrument(skip(uow, items, config), fields(lines = items.len()))]
pub async fn place_order(
    uow: &mut UnitOfWork<'_>,
    buyer_id: &str,
    items: Vec<OrderItem>,
    config: &ReferralLevelConfig,
) -> LedgerResult<OrderReceipt> {
    if items.is_empty() {
        return Err(LedgerError::Validation("order has no items".to_string()));
    }
    if let Some(item) = items.iter().find(|i| i.quantity == 0) {
        return Err(LedgerError::Validation(format!("zero quantity for {}", item.product_id)));
    }

    let buyer = users::load_user(uow, buyer_id).await?;
    let order = Order::new(new_id(), buyer_id, items)?;
    let available = buyer.wallet_balance();
    if order.total_amount > available {
        return Err(LedgerError::InsufficientFunds {
            user_id: buyer.id,
            requested: order.total_amount,
            available,
        });
    }

    let debit = if order.total_amount > Decimal::ZERO {
        Some(wallet::debit(uow, buyer_id, order.total_amount, format!("Order #{}", order.reference())).await?)
    } else {
        None
    };
    uow.put(&order)?;
    if uow.load::<Cart>(buyer_id).await?.is_some() {
        uow.delete::<Cart>(buyer_id)?;
    }
    let commissions = commission::distribute(uow, &order, &buyer, config).await?;

    info!(order_id = %order.id, total = %order.total_amount, commissions = commissions.len(), "Order placed");
    Ok(OrderReceipt {
        order,
        debit,
        commissions,
    })
}

pub async fn cart(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Cart> {
    Ok(uow.load::<Cart>(user_id).await?.unwrap_or_else(|| Cart::empty(user_id)))
}

pub async fn add_to_cart(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    product_id: &str,
    quantity: u32,
) -> LedgerResult<Cart> {
    if quantity == 0 {
        return Err(LedgerError::Validation(format!("zero quantity for {}", product_id)));
    }
    users::load_user(uow, user_id).await?;
    let mut cart = cart(uow, user_id).await?;
    cart.add(product_id, quantity)?;
    uow.put(&cart)?;
    Ok(cart)
}

pub async fn remove_from_cart(uow: &mut UnitOfWork<'_>, user_id: &str, product_id: &str) -> LedgerResult<Cart> {
    let mut cart = cart(uow, user_id).await?;
    if !cart.remove(product_id) {
        return Err(LedgerError::not_found("cart line", product_id));
    }
    uow.put(&cart)?;
    Ok(cart)
}

pub async fn clear_cart(uow: &mut UnitOfWork<'_>, user_id: &str) -> LedgerResult<()> {
    if uow.load::<Cart>(user_id).await?.is_some() {
        uow.delete::<Cart>(user_id)?;
    }
    Ok(())
}

pub async fn order(uow: &UnitOfWork<'_>, order_id: &str) -> LedgerResult<Order> {
    uow.load::<Order>(order_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("order", order_id))
}

/// Orders placed by `user_id`, newest first.
pub async fn orders_for_user(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Vec<Order>> {
    let mut orders: Vec<Order> = uow
        .scan::<Order>()
        .await?
        .into_iter()
        .filter(|o| o.buyer_id == user_id)
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// Moves an order forward. Cancelling does not refund.
pub async fn update_order_status(
    uow: &mut UnitOfWork<'_>,
    order_id: &str,
    next: OrderStatus,
) -> LedgerResult<Order> {
    let mut order = order(uow, order_id).await?;
    if !order.status.can_transition_to(next) {
        return Err(LedgerError::InvalidTransition {
            from: order.status,
            to: next,
        });
    }
    order.status = next;
    uow.put(&order)?;
    Ok(order)
}

pub async fn total_revenue(uow: &UnitOfWork<'_>) -> LedgerResult<Decimal> {
    checked_sum(uow.scan::<Order>().await?.iter().map(|o| o.total_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReferralLevel, TransactionKind};
    use crate::ledger::test_support::{fund, seed_user};
    use crate::store::MemoryStore;

    fn item(product: &str, price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product.to_string(),
            quantity,
            unit_price: Decimal::from(price),
            product_name: format!("Product {}", product),
        }
    }

    #[tokio::test]
    async fn order_debits_clears_cart_and_pays_upline() {
        let store = MemoryStore::new();
        seed_user(&store, "grand", None).await;
        seed_user(&store, "parent", Some("grand")).await;
        seed_user(&store, "buyer", Some("parent")).await;
        fund(&store, "buyer", 500).await;

        let config = ReferralLevelConfig::new(vec![
            ReferralLevel::new(1, Decimal::from(10)),
            ReferralLevel::new(2, Decimal::from(5)),
        ])
        .unwrap();

        let mut uow = UnitOfWork::new(&store);
        add_to_cart(&mut uow, "buyer", "p1", 2).await.unwrap();
        let receipt = place_order(&mut uow, "buyer", vec![item("p1", 200, 2), item("p2", 100, 1)], &config)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(receipt.order.total_amount, Decimal::from(500));
        let debit = receipt.debit.as_ref().unwrap();
        assert_eq!(debit.amount, Decimal::from(-500));
        assert_eq!(debit.kind, TransactionKind::PurchaseDebit);
        assert_eq!(debit.description, format!("Order #{}", &receipt.order.id[..8]));
        assert_eq!(receipt.commissions.len(), 2);

        let uow = UnitOfWork::new(&store);
        assert_eq!(wallet::balance(&uow, "buyer").await.unwrap(), Decimal::ZERO);
        assert_eq!(wallet::balance(&uow, "parent").await.unwrap(), Decimal::from(50));
        assert_eq!(wallet::balance(&uow, "grand").await.unwrap(), Decimal::from(25));
        assert!(cart(&uow, "buyer").await.unwrap().is_empty());
        assert_eq!(orders_for_user(&uow, "buyer").await.unwrap().len(), 1);
        assert_eq!(commission::logs_for_order(&uow, &receipt.order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn insufficient_funds_stages_nothing() {
        let store = MemoryStore::new();
        seed_user(&store, "parent", None).await;
        seed_user(&store, "buyer", Some("parent")).await;
        fund(&store, "buyer", 99).await;

        let mut uow = UnitOfWork::new(&store);
        let err = place_order(&mut uow, "buyer", vec![item("p1", 100, 1)], &ReferralLevelConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(uow.scan::<Order>().await.unwrap().len(), 0);
        assert_eq!(uow.scan::<CommissionLog>().await.unwrap().len(), 0);
        assert_eq!(uow.scan::<WalletTransaction>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn free_order_succeeds_without_a_debit() {
        let store = MemoryStore::new();
        seed_user(&store, "parent", None).await;
        seed_user(&store, "buyer", Some("parent")).await;

        let mut uow = UnitOfWork::new(&store);
        let receipt = place_order(&mut uow, "buyer", vec![item("sample", 0, 3)], &ReferralLevelConfig::default())
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(receipt.order.total_amount, Decimal::ZERO);
        assert_eq!(receipt.debit, None);
        assert!(receipt.commissions.is_empty());

        let uow = UnitOfWork::new(&store);
        assert_eq!(orders_for_user(&uow, "buyer").await.unwrap().len(), 1);
        assert!(uow.scan::<WalletTransaction>().await.unwrap().is_empty());
        assert_eq!(wallet::balance(&uow, "parent").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn empty_and_zero_quantity_orders_are_invalid() {
        let store = MemoryStore::new();
        seed_user(&store, "buyer", None).await;
        let mut uow = UnitOfWork::new(&store);
        let config = ReferralLevelConfig::default();

        assert!(matches!(
            place_order(&mut uow, "buyer", Vec::new(), &config).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            place_order(&mut uow, "buyer", vec![item("p1", 10, 0)], &config).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(add_to_cart(&mut uow, "buyer", "p1", 0).await, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn status_moves_forward_only() {
        let store = MemoryStore::new();
        seed_user(&store, "buyer", None).await;
        fund(&store, "buyer", 10).await;

        let mut uow = UnitOfWork::new(&store);
        let receipt = place_order(&mut uow, "buyer", vec![item("p1", 10, 1)], &ReferralLevelConfig::default())
            .await
            .unwrap();
        let id = receipt.order.id;

        let shipped = update_order_status(&mut uow, &id, OrderStatus::Shipped).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(
            update_order_status(&mut uow, &id, OrderStatus::Pending).await,
            Err(LedgerError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Pending,
            })
        );
        assert_eq!(total_revenue(&uow).await.unwrap(), Decimal::from(10));
    }

    #[tokio::test]
    async fn cart_lines_can_be_removed() {
        let store = MemoryStore::new();
        seed_user(&store, "buyer", None).await;
        let mut uow = UnitOfWork::new(&store);

        add_to_cart(&mut uow, "buyer", "p1", 1).await.unwrap();
        add_to_cart(&mut uow, "buyer", "p2", 3).await.unwrap();
        let remaining = remove_from_cart(&mut uow, "buyer", "p1").await.unwrap();
        assert_eq!(remaining.lines.len(), 1);
        assert!(matches!(
            remove_from_cart(&mut uow, "buyer", "p1").await,
            Err(LedgerError::NotFound { .. })
        ));
        clear_cart(&mut uow, "buyer").await.unwrap();
        assert!(cart(&uow, "buyer").await.unwrap().is_empty());
    }
}
