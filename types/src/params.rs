//! Platform-wide protocol parameters.
//!
//! Everything tunable lives here as a named field with a documented default,
//! so no engine carries magic numbers. Parameters are passed in at
//! construction time; there is no runtime parameter lookup.

use crate::amount::{Amount, Bps};
use serde::{Deserialize, Serialize};

/// All platform-wide tunables, shared by the four ledgers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolParams {
    // ── Trust & staking ──────────────────────────────────────────────────
    /// Trust score assigned to a member on first contact.
    pub trust_initial: u16,

    /// Trust gained per on-time cycle contribution.
    pub trust_reward_step: u16,

    /// Trust lost per slash.
    pub trust_slash_step: u16,

    /// Upper trust bound. The lower bound is always zero.
    pub trust_max: u16,

    /// Fraction of a member's stake a single slash may take.
    pub stake_penalty_bps: Bps,

    /// Defaults before a member is blacklisted platform-wide.
    pub blacklist_threshold: u32,

    // ── Escrow & yield ───────────────────────────────────────────────────
    /// Fraction of escrowed cash kept on hand; everything above it is idle
    /// and gets deployed to the yield adapter.
    pub liquidity_buffer_bps: Bps,

    /// Share of harvested yield credited to the group's yield reserve;
    /// the complement goes to the insurance pool.
    pub yield_group_share_bps: Bps,

    // ── Insurance ────────────────────────────────────────────────────────
    /// Premium slice earmarked into the non-claimable reserve fund.
    pub insurance_reserve_bps: Bps,

    /// Per-member cap on a single claim.
    pub claim_cap: Amount,

    /// Tighter cap applied while a group runs in emergency mode.
    pub emergency_claim_cap: Amount,

    /// Seconds a claimant must wait between claims in the same group.
    pub claim_cooldown_secs: u64,

    /// Distinct approvals required before a claim is approved.
    pub claim_approval_threshold: u32,
}

impl ProtocolParams {
    /// The intended live configuration.
    pub fn susu_defaults() -> Self {
        Self {
            trust_initial: 100,
            trust_reward_step: 10,
            trust_slash_step: 50,
            trust_max: 1000,
            stake_penalty_bps: Bps::from_const(2000), // 20%
            blacklist_threshold: 3,

            liquidity_buffer_bps: Bps::from_const(1000), // keep 10% on hand
            yield_group_share_bps: Bps::from_const(8000), // 80/20 split

            insurance_reserve_bps: Bps::from_const(1000), // 10% to reserve
            claim_cap: Amount::new(10_000),
            emergency_claim_cap: Amount::new(2_000),
            claim_cooldown_secs: 30 * 24 * 3600, // 30 days
            claim_approval_threshold: 2,
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::susu_defaults()
    }
}
