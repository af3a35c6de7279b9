//! E-Pin Registry: single-use prepaid codes redeemable for wallet credit.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use super::wallet;
use crate::domain::{EPin, TransactionKind, WalletTransaction};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

const CODE_PREFIX: &str = "EP";
const CODE_LEN: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_ATTEMPTS: usize = 16;

fn random_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

/// Codes are matched case-insensitively and without surrounding whitespace.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

async fn unused_code(uow: &UnitOfWork<'_>) -> LedgerResult<String> {
    for _ in 0..CODE_ATTEMPTS {
        let code = random_code();
        if uow.load::<EPin>(&code).await?.is_none() {
            return Ok(code);
        }
    }
    Err(LedgerError::InvariantViolation("could not mint a unique e-pin code".to_string()))
}

/// Mints `count` pins of face value `amount`.
///
/// `validity_days` of `None` or zero means the pins never expire.
#[instrument(skip(uow))]
pub async fn generate(
    uow: &mut UnitOfWork<'_>,
    amount: Decimal,
    count: u32,
    validity_days: Option<u32>,
    issued_by: &str,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<EPin>> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if count == 0 {
        return Err(LedgerError::Validation("pin count must be at least 1".to_string()));
    }
    let expires_at = validity_days
        .filter(|days| *days > 0)
        .map(|days| now + Duration::days(i64::from(days)));

    let mut pins = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let pin = EPin {
            code: unused_code(uow).await?,
            amount,
            is_used: false,
            issued_by: issued_by.to_string(),
            created_at: now,
            expires_at,
            used_by: None,
        };
        uow.put(&pin)?;
        pins.push(pin);
    }
    info!(count, "E-Pins generated");
    Ok(pins)
}

/// Marks the pin used and credits its face value in the same unit.
#[instrument(skip(uow))]
pub async fn redeem(
    uow: &mut UnitOfWork<'_>,
    code: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> LedgerResult<WalletTransaction> {
    let code = normalize_code(code);
    let mut pin = uow
        .load::<EPin>(&code)
        .await?
        .ok_or_else(|| LedgerError::not_found("e-pin", code.as_str()))?;
    if pin.is_used {
        return Err(LedgerError::AlreadyUsed(code));
    }
    if pin.is_expired_at(now) {
        return Err(LedgerError::Expired(code));
    }

    pin.is_used = true;
    pin.used_by = Some(user_id.to_string());
    uow.put(&pin)?;
    let entry = wallet::credit(
        uow,
        user_id,
        pin.amount,
        TransactionKind::EPinCredit,
        format!("E-Pin {} Redeemed", pin.code),
    )
    .await?;
    info!(amount = %pin.amount, "E-Pin redeemed");
    Ok(entry)
}

/// Every pin, newest first.
pub async fn list(uow: &UnitOfWork<'_>) -> LedgerResult<Vec<EPin>> {
    let mut pins = uow.scan::<EPin>().await?;
    pins.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.code.cmp(&b.code)));
    Ok(pins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::seed_user;
    use crate::store::MemoryStore;

    #[test]
    fn codes_have_expected_shape() {
        let code = random_code();
        assert_eq!(code.len(), CODE_PREFIX.len() + CODE_LEN);
        assert!(code.starts_with("EP"));
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn generate_sets_expiry_only_when_validity_given() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut uow = UnitOfWork::new(&store);

        let forever = generate(&mut uow, Decimal::from(100), 3, None, "admin", now).await.unwrap();
        assert_eq!(forever.len(), 3);
        assert!(forever.iter().all(|p| p.expires_at.is_none() && !p.is_used));

        let zero = generate(&mut uow, Decimal::from(100), 1, Some(0), "admin", now).await.unwrap();
        assert_eq!(zero[0].expires_at, None);

        let month = generate(&mut uow, Decimal::from(100), 1, Some(30), "admin", now).await.unwrap();
        assert_eq!(month[0].expires_at, Some(now + Duration::days(30)));

        assert_eq!(list(&uow).await.unwrap().len(), 5);
        assert_eq!(
            generate(&mut uow, Decimal::ZERO, 1, None, "admin", now).await,
            Err(LedgerError::InvalidAmount(Decimal::ZERO))
        );
    }

    #[tokio::test]
    async fn second_redemption_is_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "alice", None).await;
        let now = Utc::now();

        let mut uow = UnitOfWork::new(&store);
        let pin = generate(&mut uow, Decimal::from(250), 1, None, "admin", now).await.unwrap().remove(0);
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::new(&store);
        let entry = redeem(&mut uow, &pin.code.to_lowercase(), "alice", now).await.unwrap();
        assert_eq!(entry.amount, Decimal::from(250));
        assert_eq!(entry.description, format!("E-Pin {} Redeemed", pin.code));
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::new(&store);
        assert_eq!(
            redeem(&mut uow, &pin.code, "alice", now).await,
            Err(LedgerError::AlreadyUsed(pin.code.clone()))
        );
        assert_eq!(wallet::history(&uow, "alice").await.unwrap().len(), 1);
        let stored = uow.load::<EPin>(&pin.code).await.unwrap().unwrap();
        assert_eq!(stored.used_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn expired_and_unknown_pins_are_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "bob", None).await;
        let now = Utc::now();

        let mut uow = UnitOfWork::new(&store);
        let pin = generate(&mut uow, Decimal::from(10), 1, Some(1), "admin", now - Duration::days(2))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(redeem(&mut uow, &pin.code, "bob", now).await, Err(LedgerError::Expired(pin.code.clone())));
        assert_eq!(
            redeem(&mut uow, "EPNOTREAL", "bob", now).await,
            Err(LedgerError::not_found("e-pin", "EPNOTREAL"))
        );
        assert!(!uow.load::<EPin>(&pin.code).await.unwrap().unwrap().is_used);
    }

    #[tokio::test]
    async fn redemption_by_unknown_user_leaves_pin_unused() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut uow = UnitOfWork::new(&store);
        let pin = generate(&mut uow, Decimal::from(10), 1, None, "admin", now).await.unwrap().remove(0);
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::new(&store);
        assert!(redeem(&mut uow, &pin.code, "ghost", now).await.is_err());
        drop(uow);

        let uow = UnitOfWork::new(&store);
        assert!(!uow.load::<EPin>(&pin.code).await.unwrap().unwrap().is_used);
    }
}
