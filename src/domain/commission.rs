use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Deepest ancestor level that can earn commission on a purchase.
pub const MAX_LEVELS: u8 = 5;

/// Audit row for one commission payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLog {
    pub id: String,
    pub order_id: String,
    pub beneficiary_id: String,
    pub source_user_id: String,
    pub level: u8,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferralLevel {
    pub level: u8,
    pub percentage: Decimal,
}

impl ReferralLevel {
    pub fn new(level: u8, percentage: Decimal) -> Self {
        Self { level, percentage }
    }
}

/// Payout schedule keyed by level. Rate changes apply to future orders only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralLevelConfig {
    levels: Vec<ReferralLevel>,
}

impl ReferralLevelConfig {
    /// Checks levels are within `1..=MAX_LEVELS`, unique, and rates within `0..=100`.
    pub fn new(mut levels: Vec<ReferralLevel>) -> Result<Self, String> {
        levels.sort_by_key(|l| l.level);
        for pair in levels.windows(2) {
            if pair[0].level == pair[1].level {
                return Err(format!("level {} configured twice", pair[0].level));
            }
        }
        for l in &levels {
            if l.level == 0 || l.level > MAX_LEVELS {
                return Err(format!("level {} outside 1..={}", l.level, MAX_LEVELS));
            }
            if l.percentage < Decimal::ZERO || l.percentage > Decimal::from(100) {
                return Err(format!("level {} percentage {} outside 0..=100", l.level, l.percentage));
            }
        }
        Ok(Self { levels })
    }

    /// Builds a schedule from rates listed in level order, starting at level 1.
    pub fn from_rates(rates: &[Decimal]) -> Result<Self, String> {
        let levels = rates
            .iter()
            .enumerate()
            .map(|(i, pct)| ReferralLevel::new(i as u8 + 1, *pct))
            .collect();
        Self::new(levels)
    }

    /// Configured rate for `level`, zero when unconfigured.
    pub fn percentage_for(&self, level: u8) -> Decimal {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .map(|l| l.percentage)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn levels(&self) -> &[ReferralLevel] {
        &self.levels
    }
}

impl Default for ReferralLevelConfig {
    fn default() -> Self {
        let levels = [10, 5, 3, 2, 1]
            .into_iter()
            .zip(1..)
            .map(|(pct, level)| ReferralLevel::new(level, Decimal::from(pct)))
            .collect();
        Self { levels }
    }
}

/// Administrator-managed program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSettings {
    pub registration_open: bool,
    pub referral_levels: ReferralLevelConfig,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            registration_open: true,
            referral_levels: ReferralLevelConfig::default(),
        }
    }
}
