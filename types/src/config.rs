//! Per-group configuration, immutable after creation.

use crate::amount::{Amount, Bps};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The savings model a group runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupModel {
    /// The pot rotates to one member per cycle until everyone has received it.
    Rotational,
    /// Contributions lock until maturity, then each member withdraws their
    /// share plus a proportional slice of the yield reserve.
    FixedSavings,
    /// Contributions build a pool drawn against through insurance claims;
    /// there is no scheduled payout.
    EmergencyLiquidity,
}

/// Everything a group is parameterised by. Validated once at creation and
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub model: GroupModel,
    /// Fixed contribution each member pays per cycle.
    pub contribution_amount: Amount,
    /// Length of one contribution cycle, in seconds.
    pub cycle_interval_secs: u64,
    /// Number of members the group activates at.
    pub group_size: u32,
    /// Lock period from activation to maturity (fixed savings only).
    pub lock_duration_secs: u64,
    /// Extra window after the cycle interval during which a contribution
    /// still counts as on time.
    pub grace_period_secs: u64,
    /// Collateral each member posts on join.
    pub stake_required: Amount,
    /// Whether a slice of each contribution funds the insurance pool.
    pub insurance_enabled: bool,
    /// Premium slice of each contribution.
    pub insurance_bps: Bps,
    /// Platform fee taken from each rotational payout.
    pub platform_fee_bps: Bps,
    /// Penalty on a fixed-savings withdrawal before maturity.
    pub early_withdrawal_penalty_bps: Bps,
}

/// Rejected group configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("contribution amount must be non-zero")]
    ZeroContribution,

    #[error("cycle interval must be non-zero")]
    ZeroCycleInterval,

    #[error("group size {0} is below the minimum of {min}", min = GroupConfig::MIN_GROUP_SIZE)]
    GroupTooSmall(u32),

    #[error("fixed savings requires a non-zero lock duration")]
    ZeroLockDuration,

    #[error("insurance is enabled but the premium fraction is zero")]
    ZeroPremium,
}

impl GroupConfig {
    /// A group needs at least three members to be a group.
    pub const MIN_GROUP_SIZE: u32 = 3;

    /// Validate the configuration. The `Bps` fields are range-checked by
    /// construction; this checks the cross-field rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contribution_amount.is_zero() {
            return Err(ConfigError::ZeroContribution);
        }
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::ZeroCycleInterval);
        }
        if self.group_size < Self::MIN_GROUP_SIZE {
            return Err(ConfigError::GroupTooSmall(self.group_size));
        }
        if self.model == GroupModel::FixedSavings && self.lock_duration_secs == 0 {
            return Err(ConfigError::ZeroLockDuration);
        }
        if self.insurance_enabled && self.insurance_bps == Bps::ZERO {
            return Err(ConfigError::ZeroPremium);
        }
        Ok(())
    }

    /// The closed contribution window measured from a cycle start.
    pub fn contribution_window_secs(&self) -> u64 {
        self.cycle_interval_secs
            .saturating_add(self.grace_period_secs)
    }
}
