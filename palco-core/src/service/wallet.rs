//! Diamond/BRL conversion and withdrawal execution.
//!
//! The calculator is pure and used both for the live preview and inside
//! the withdrawal path. All money math is `Decimal`; the fee is truncated
//! to the cent, never rounded, so the platform is never credited more than
//! its exact 20% cut.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::ServerEvent;
use crate::models::{
    LedgerAccount, LedgerRecord, LedgerRecordKind, UserId, UserView,
};
use crate::repository::{LedgerRepository, UserRepository};
use crate::service::hub::EventHub;
use crate::{Error, Result};

/// One rung of the diamond exchange table: holding at least
/// `diamond_threshold` diamonds converts at `price_brl / diamond_threshold`
/// per diamond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTier {
    pub diamond_threshold: i64,
    pub price_brl: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalQuote {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone)]
pub struct WithdrawalCalculator {
    tiers: Vec<ExchangeTier>,
    fee_rate: Decimal,
}

impl Default for WithdrawalCalculator {
    fn default() -> Self {
        Self::new(Self::default_tiers(), dec!(0.20))
            .expect("default tier table is valid")
    }
}

impl WithdrawalCalculator {
    pub fn new(tiers: Vec<ExchangeTier>, fee_rate: Decimal) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::InvalidInput("Exchange table is empty".to_string()));
        }
        if !tiers
            .windows(2)
            .all(|w| w[0].diamond_threshold < w[1].diamond_threshold)
        {
            return Err(Error::InvalidInput(
                "Exchange table thresholds must be strictly ascending".to_string(),
            ));
        }
        if tiers.iter().any(|t| t.diamond_threshold < 1 || t.price_brl <= Decimal::ZERO) {
            return Err(Error::InvalidInput(
                "Exchange tiers need a positive threshold and price".to_string(),
            ));
        }
        if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
            return Err(Error::InvalidInput("Fee rate must be in [0, 1)".to_string()));
        }
        Ok(Self { tiers, fee_rate })
    }

    #[must_use]
    pub fn default_tiers() -> Vec<ExchangeTier> {
        vec![
            ExchangeTier { diamond_threshold: 1_000, price_brl: dec!(9.50) },
            ExchangeTier { diamond_threshold: 5_000, price_brl: dec!(48.50) },
            ExchangeTier { diamond_threshold: 10_000, price_brl: dec!(100.00) },
            ExchangeTier { diamond_threshold: 50_000, price_brl: dec!(510.00) },
        ]
    }

    /// Convert a diamond amount into gross/fee/net BRL. Pure; no state.
    ///
    /// The highest tier whose threshold fits the amount sets the unit
    /// rate; amounts below the smallest threshold fall back to the
    /// smallest tier's rate.
    pub fn calculate(&self, diamonds: i64) -> Result<WithdrawalQuote> {
        if diamonds < 1 {
            return Err(Error::InvalidInput(
                "Withdrawal amount must be at least 1 diamond".to_string(),
            ));
        }

        let tier = self
            .tiers
            .iter()
            .rev()
            .find(|t| t.diamond_threshold <= diamonds)
            .unwrap_or(&self.tiers[0]);

        let mut gross = (tier.price_brl * Decimal::from(diamonds)
            / Decimal::from(tier.diamond_threshold))
        .trunc_with_scale(2);
        gross.rescale(2);
        let mut fee = (gross * self.fee_rate).trunc_with_scale(2);
        fee.rescale(2);
        let net = gross - fee;

        Ok(WithdrawalQuote { gross, fee, net })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalOutcome {
    pub user: UserView,
    pub quote: WithdrawalQuote,
}

/// Withdrawal execution and diamond purchases against the ledger.
#[derive(Clone)]
pub struct WalletService {
    users: UserRepository,
    ledger: LedgerRepository,
    calculator: WithdrawalCalculator,
    hub: EventHub,
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService").finish()
    }
}

impl WalletService {
    #[must_use]
    pub const fn new(
        users: UserRepository,
        ledger: LedgerRepository,
        calculator: WithdrawalCalculator,
        hub: EventHub,
    ) -> Self {
        Self {
            users,
            ledger,
            calculator,
            hub,
        }
    }

    /// Live conversion preview; touches nothing.
    pub fn preview(&self, diamonds: i64) -> Result<WithdrawalQuote> {
        self.calculator.calculate(diamonds)
    }

    /// Execute a withdrawal: one atomic balance mutation, then the paired
    /// ledger records (net to the user, fee to the platform accumulator),
    /// then the broadcast. Persisted before either of the latter.
    pub async fn withdraw(&self, user_id: &UserId, diamonds: i64) -> Result<WithdrawalOutcome> {
        let quote = self.calculator.calculate(diamonds)?;

        let user_view = self
            .users
            .update(user_id, |user| {
                if !user.has_withdrawal_method() {
                    return Err(Error::NotConfigured(
                        "No withdrawal method saved".to_string(),
                    ));
                }
                if user.earnings < diamonds {
                    return Err(Error::InsufficientBalance(format!(
                        "Earnings balance {} below requested {diamonds}",
                        user.earnings
                    )));
                }
                user.earnings -= diamonds;
                user.earnings_withdrawn += diamonds;
                Ok(UserView::from(&*user))
            })
            .await?;

        self.ledger
            .append_withdrawal_pair(
                LedgerRecord::completed(
                    LedgerAccount::User(user_id.clone()),
                    LedgerRecordKind::Withdrawal,
                    quote.net,
                    diamonds,
                ),
                LedgerRecord::completed(
                    LedgerAccount::Platform,
                    LedgerRecordKind::PlatformFeeIncome,
                    quote.fee,
                    0,
                ),
            )
            .await?;

        info!(
            user_id = %user_id,
            diamonds,
            gross = %quote.gross,
            fee = %quote.fee,
            net = %quote.net,
            "Withdrawal executed"
        );

        self.hub.publish_user(
            user_id,
            &ServerEvent::UserUpdated {
                user: user_view.clone(),
            },
        );

        Ok(WithdrawalOutcome {
            user: user_view,
            quote,
        })
    }

    /// Credit purchased diamonds. Purchase revenue is recorded in the
    /// ledger but never credited to the platform-earnings accumulator;
    /// only withdrawal fees are.
    pub async fn record_purchase(
        &self,
        user_id: &UserId,
        diamonds: i64,
        amount_brl: Decimal,
    ) -> Result<UserView> {
        if diamonds < 1 {
            return Err(Error::InvalidInput(
                "Purchase must add at least 1 diamond".to_string(),
            ));
        }

        let user_view = self
            .users
            .update(user_id, |user| {
                user.diamonds += diamonds;
                Ok(UserView::from(&*user))
            })
            .await?;

        self.ledger
            .append(LedgerRecord::completed(
                LedgerAccount::User(user_id.clone()),
                LedgerRecordKind::Purchase,
                amount_brl,
                diamonds,
            ))
            .await?;

        self.hub.publish_user(
            user_id,
            &ServerEvent::UserUpdated {
                user: user_view.clone(),
            },
        );

        Ok(user_view)
    }

    /// What the platform-operator balance screen shows: accumulated
    /// withdrawal fees, nothing else.
    #[must_use]
    pub fn platform_earnings(&self) -> Decimal {
        self.ledger.platform_earnings()
    }
}
