//! Program settings and platform-wide figures.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::{checked_sum, checkout};
use crate::domain::{CommissionLog, LedgerSettings, Order, ReferralLevel, ReferralLevelConfig, User};
use crate::error::{LedgerError, LedgerResult};
use crate::store::record::SETTINGS_ID;
use crate::store::UnitOfWork;

/// Stored settings, or `defaults` until an administrator saves any.
pub async fn load(uow: &UnitOfWork<'_>, defaults: &LedgerSettings) -> LedgerResult<LedgerSettings> {
    Ok(uow
        .load::<LedgerSettings>(SETTINGS_ID)
        .await?
        .unwrap_or_else(|| defaults.clone()))
}

/// Replaces the payout schedule. Orders already placed keep what they paid.
pub async fn update_referral_levels(
    uow: &mut UnitOfWork<'_>,
    defaults: &LedgerSettings,
    levels: Vec<ReferralLevel>,
) -> LedgerResult<LedgerSettings> {
    let mut settings = load(uow, defaults).await?;
    settings.referral_levels = ReferralLevelConfig::new(levels).map_err(LedgerError::Validation)?;
    uow.put(&settings)?;
    info!(levels = settings.referral_levels.levels().len(), "Referral levels updated");
    Ok(settings)
}

pub async fn set_registration_open(
    uow: &mut UnitOfWork<'_>,
    defaults: &LedgerSettings,
    open: bool,
) -> LedgerResult<LedgerSettings> {
    let mut settings = load(uow, defaults).await?;
    settings.registration_open = open;
    uow.put(&settings)?;
    info!(open, "Registration toggled");
    Ok(settings)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub user_count: usize,
    pub order_count: usize,
    pub total_revenue: Decimal,
    pub total_commission: Decimal,
}

pub async fn stats(uow: &UnitOfWork<'_>) -> LedgerResult<PlatformStats> {
    let total_commission = checked_sum(uow.scan::<CommissionLog>().await?.iter().map(|l| l.amount))?;
    Ok(PlatformStats {
        user_count: uow.scan::<User>().await?.len(),
        order_count: uow.scan::<Order>().await?.len(),
        total_revenue: checkout::total_revenue(uow).await?,
        total_commission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn defaults_apply_until_saved() {
        let store = MemoryStore::new();
        let defaults = LedgerSettings::default();

        let mut uow = UnitOfWork::new(&store);
        assert_eq!(load(&uow, &defaults).await.unwrap(), defaults);

        let closed = set_registration_open(&mut uow, &defaults, false).await.unwrap();
        assert!(!closed.registration_open);
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::new(&store);
        let updated = update_referral_levels(&mut uow, &defaults, vec![ReferralLevel::new(1, Decimal::from(7))])
            .await
            .unwrap();
        assert!(!updated.registration_open);
        assert_eq!(updated.referral_levels.percentage_for(1), Decimal::from(7));
        assert_eq!(updated.referral_levels.percentage_for(2), Decimal::ZERO);
    }

    #[tokio::test]
    async fn invalid_schedule_is_rejected() {
        let store = MemoryStore::new();
        let defaults = LedgerSettings::default();
        let mut uow = UnitOfWork::new(&store);
        assert!(matches!(
            update_referral_levels(&mut uow, &defaults, vec![ReferralLevel::new(9, Decimal::ONE)]).await,
            Err(LedgerError::Validation(_))
        ));
    }
}
