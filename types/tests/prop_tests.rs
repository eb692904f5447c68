use proptest::prelude::*;

use susu_types::{Amount, Bps, Timestamp, BPS_DENOMINATOR};

proptest! {
    /// A bps fraction of an amount never exceeds the amount.
    #[test]
    fn bps_fraction_bounded(raw in 0u128..u128::MAX / 10_000, bps in 0u32..=10_000) {
        let amount = Amount::new(raw);
        let part = amount.bps(Bps::new(bps).unwrap());
        prop_assert!(part <= amount);
    }

    /// A fraction plus its complement loses at most one rounding unit per side.
    #[test]
    fn bps_split_conserves_value(raw in 0u128..1_000_000_000, bps in 0u32..=10_000) {
        let amount = Amount::new(raw);
        let frac = Bps::new(bps).unwrap();
        let part = amount.bps(frac);
        let rest = amount.bps(frac.complement());
        let total = part.checked_add(rest).unwrap();
        prop_assert!(total <= amount);
        prop_assert!(amount.raw() - total.raw() <= 1, "lost more than rounding: {}", amount.raw() - total.raw());
    }

    /// Full bps is the identity, zero bps is zero.
    #[test]
    fn bps_endpoints(raw in 0u128..u128::MAX / 10_000) {
        let amount = Amount::new(raw);
        prop_assert_eq!(amount.bps(Bps::FULL), amount);
        prop_assert_eq!(amount.bps(Bps::ZERO), Amount::ZERO);
    }

    /// Bps construction accepts exactly [0, 10000].
    #[test]
    fn bps_range(bps in 0u32..100_000) {
        prop_assert_eq!(Bps::new(bps).is_some(), bps <= BPS_DENOMINATOR);
    }

    /// mul_div agrees with exact rational arithmetic for small values.
    #[test]
    fn mul_div_matches_rational(
        base in 0u128..1_000_000,
        num in 0u128..1_000_000,
        den in 1u128..1_000_000,
    ) {
        let result = Amount::new(base).mul_div(Amount::new(num), Amount::new(den));
        prop_assert_eq!(result, Some(Amount::new(base * num / den)));
    }

    /// checked_sub returns None exactly when the subtrahend is larger.
    #[test]
    fn amount_checked_sub_underflow(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = Amount::new(a).checked_sub(Amount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(Amount::new(a - b)));
        }
    }

    /// saturating_sub never panics and floors at zero.
    #[test]
    fn amount_saturating_sub(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = Amount::new(a).saturating_sub(Amount::new(b));
        prop_assert_eq!(result, Amount::new(a.saturating_sub(b)));
    }

    /// Contribution windows are closed intervals.
    #[test]
    fn window_membership(start in 0u64..500_000, len in 0u64..500_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.within_window(len, now), offset <= len);
    }

    /// has_expired agrees with manual arithmetic.
    #[test]
    fn expiry_matches_arithmetic(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }
}
