//! Commission Engine: pays a share of each order up the buyer's referrer chain.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use super::{checked_sum, new_id, wallet};
use crate::domain::{CommissionLog, Order, ReferralLevelConfig, TransactionKind, User, MAX_LEVELS};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

/// Credits up to [`MAX_LEVELS`] ancestors of `buyer` for `order`.
///
/// The level counter is the only guard against a cyclic chain: an ancestor
/// reached twice is paid twice, but the walk still stops after the last level.
/// A referrer id that no longer resolves ends the walk early.
#[instrument(skip_all, fields(order_id = %order.id, buyer_id = %buyer.id, total = %order.total_amount))]
pub async fn distribute(
    uow: &mut UnitOfWork<'_>,
    order: &Order,
    buyer: &User,
    config: &ReferralLevelConfig,
) -> LedgerResult<Vec<CommissionLog>> {
    let mut logs = Vec::new();
    let mut next = buyer.referrer_id.clone();
    let mut level = 1;

    while let Some(ancestor_id) = next {
        if level > MAX_LEVELS {
            break;
        }
        let Some(ancestor) = uow.load::<User>(&ancestor_id).await? else {
            warn!(level, ancestor_id = %ancestor_id, "Referrer chain broken, stopping");
            break;
        };

        let rate = config.percentage_for(level) / Decimal::ONE_HUNDRED;
        let amount = order
            .total_amount
            .checked_mul(rate)
            .ok_or(LedgerError::InvalidAmount(order.total_amount))?;
        if amount > Decimal::ZERO {
            wallet::credit(
                uow,
                &ancestor.id,
                amount,
                TransactionKind::CommissionCredit,
                format!("Level {} Comm. from {}", level, buyer.name),
            )
            .await?;
            let log = CommissionLog {
                id: new_id(),
                order_id: order.id.clone(),
                beneficiary_id: ancestor.id.clone(),
                source_user_id: buyer.id.clone(),
                level,
                amount,
                timestamp: Utc::now(),
            };
            uow.append(&log).await?;
            debug!(level, beneficiary_id = %ancestor.id, amount = %amount, "Commission credited");
            logs.push(log);
        }

        next = ancestor.referrer_id;
        level += 1;
    }
    Ok(logs)
}

pub async fn logs_for_order(uow: &UnitOfWork<'_>, order_id: &str) -> LedgerResult<Vec<CommissionLog>> {
    let mut logs: Vec<CommissionLog> = uow
        .scan::<CommissionLog>()
        .await?
        .into_iter()
        .filter(|l| l.order_id == order_id)
        .collect();
    logs.sort_by_key(|l| l.level);
    Ok(logs)
}

/// Commission received by `user_id`, newest first.
pub async fn logs_for_beneficiary(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Vec<CommissionLog>> {
    let mut logs: Vec<CommissionLog> = uow
        .scan::<CommissionLog>()
        .await?
        .into_iter()
        .filter(|l| l.beneficiary_id == user_id)
        .collect();
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.level.cmp(&b.level)));
    Ok(logs)
}

pub async fn total_earnings(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Decimal> {
    checked_sum(logs_for_beneficiary(uow, user_id).await?.iter().map(|l| l.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, ReferralLevel};
    use crate::ledger::test_support::seed_user;
    use crate::store::MemoryStore;

    fn order_for(buyer: &str, total: i64) -> Order {
        let item = OrderItem {
            product_id: "p1".to_string(),
            quantity: 1,
            unit_price: Decimal::from(total),
            product_name: "Bundle".to_string(),
        };
        Order::new(new_id(), buyer, vec![item]).unwrap()
    }

    #[tokio::test]
    async fn six_deep_chain_pays_five_levels() {
        let store = MemoryStore::new();
        seed_user(&store, "l6", None).await;
        seed_user(&store, "l5", Some("l6")).await;
        seed_user(&store, "l4", Some("l5")).await;
        seed_user(&store, "l3", Some("l4")).await;
        seed_user(&store, "l2", Some("l3")).await;
        seed_user(&store, "l1", Some("l2")).await;
        let buyer = seed_user(&store, "buyer", Some("l1")).await;

        let mut uow = UnitOfWork::new(&store);
        let order = order_for("buyer", 1000);
        let logs = distribute(&mut uow, &order, &buyer, &ReferralLevelConfig::default())
            .await
            .unwrap();

        let paid: Vec<(String, u8, Decimal)> = logs
            .iter()
            .map(|l| (l.beneficiary_id.clone(), l.level, l.amount))
            .collect();
        assert_eq!(
            paid,
            vec![
                ("l1".to_string(), 1, Decimal::from(100)),
                ("l2".to_string(), 2, Decimal::from(50)),
                ("l3".to_string(), 3, Decimal::from(30)),
                ("l4".to_string(), 4, Decimal::from(20)),
                ("l5".to_string(), 5, Decimal::from(10)),
            ]
        );
        assert_eq!(wallet::balance(&uow, "l6").await.unwrap(), Decimal::ZERO);
        assert_eq!(wallet::balance(&uow, "l1").await.unwrap(), Decimal::from(100));
        assert_eq!(
            wallet::history(&uow, "l2").await.unwrap()[0].description,
            "Level 2 Comm. from User buyer"
        );
    }

    #[tokio::test]
    async fn cyclic_chain_stops_after_max_levels() {
        let store = MemoryStore::new();
        seed_user(&store, "a", Some("b")).await;
        seed_user(&store, "b", Some("a")).await;
        let buyer = seed_user(&store, "buyer", Some("a")).await;

        let mut uow = UnitOfWork::new(&store);
        let logs = distribute(&mut uow, &order_for("buyer", 1000), &buyer, &ReferralLevelConfig::default())
            .await
            .unwrap();

        assert_eq!(logs.len(), usize::from(MAX_LEVELS));
        // a: levels 1, 3, 5; b: levels 2, 4
        assert_eq!(wallet::balance(&uow, "a").await.unwrap(), Decimal::from(100 + 30 + 10));
        assert_eq!(wallet::balance(&uow, "b").await.unwrap(), Decimal::from(50 + 20));
        assert_eq!(wallet::reconcile_all(&uow).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn broken_chain_and_zero_rates_pay_nothing_further() {
        let store = MemoryStore::new();
        seed_user(&store, "a", Some("deleted")).await;
        seed_user(&store, "b", Some("a")).await;
        let buyer = seed_user(&store, "buyer", Some("b")).await;

        let config = ReferralLevelConfig::new(vec![ReferralLevel::new(2, Decimal::from(4))]).unwrap();
        let mut uow = UnitOfWork::new(&store);
        let order = order_for("buyer", 250);
        let logs = distribute(&mut uow, &order, &buyer, &config).await.unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].beneficiary_id, "a");
        assert_eq!(logs[0].amount, Decimal::from(10));
        assert!(wallet::history(&uow, "b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn amounts_are_exact_fractions_of_the_total() {
        let store = MemoryStore::new();
        seed_user(&store, "a", None).await;
        let buyer = seed_user(&store, "buyer", Some("a")).await;

        let config = ReferralLevelConfig::from_rates(&[Decimal::new(333, 2)]).unwrap();
        let mut uow = UnitOfWork::new(&store);
        let logs = distribute(&mut uow, &order_for("buyer", 99), &buyer, &config).await.unwrap();
        // 99 * 3.33% = 3.2967
        assert_eq!(logs[0].amount, Decimal::new(32967, 4));
        assert_eq!(total_earnings(&uow, "a").await.unwrap(), Decimal::new(32967, 4));
    }

    #[tokio::test]
    async fn sub_cent_commission_is_still_paid() {
        let store = MemoryStore::new();
        seed_user(&store, "sponsor", None).await;
        let buyer = seed_user(&store, "buyer", Some("sponsor")).await;

        let item = OrderItem {
            product_id: "p1".to_string(),
            quantity: 1,
            unit_price: Decimal::new(5, 2),
            product_name: "Sticker".to_string(),
        };
        let order = Order::new(new_id(), "buyer", vec![item]).unwrap();
        let mut uow = UnitOfWork::new(&store);
        let logs = distribute(&mut uow, &order, &buyer, &ReferralLevelConfig::default())
            .await
            .unwrap();

        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].amount, Decimal::new(5, 3));
        assert_eq!(wallet::balance(&uow, "sponsor").await.unwrap(), Decimal::new(5, 3));
    }
}
