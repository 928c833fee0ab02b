//! # Pricing Engine
//!
//! Pure billing math over a session snapshot and a settings snapshot.
//! Nothing here mutates or reads ambient state - the same inputs always
//! produce the same quote, which is recomputed on every relevant read.
//!
//! ## Quote Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         Checkout Quote                               │
//! │                                                                      │
//! │  games_subtotal = games_played × session's frozen per-game rate      │
//! │  market_total   = Σ (quantity × frozen line price)                   │
//! │                                                                      │
//! │  discount:                                                           │
//! │    method == Credit                                                  │
//! │    AND games_played ≥ 4  AND games_subtotal ≥ 3000                   │
//! │    ──► discount of the LARGEST tier threshold ≤ games_played         │
//! │    otherwise ──► 0   (Cash and Debt never discount)                  │
//! │                                                                      │
//! │  expected_total = max(0, subtotal + market − discount)               │
//! │                                                                      │
//! │  The operator-entered paid amount may differ from expected_total -   │
//! │  both are surfaced, the mismatch is a warning, never a block.        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::session::Session;
use crate::types::{HallSettings, PaymentMethod};
use crate::{CREDIT_MIN_GAMES, CREDIT_MIN_SUBTOTAL};

// =============================================================================
// Subtotals
// =============================================================================

/// Games subtotal: games played × the session's frozen per-game rate.
#[inline]
pub fn games_subtotal(session: &Session) -> Money {
    session.price_per_game().multiply_quantity(session.games_played)
}

/// Market subtotal: Σ quantity × frozen line price.
#[inline]
pub fn market_total(session: &Session) -> Money {
    session.market_items.values().map(|line| line.line_total()).sum()
}

// =============================================================================
// Tiered Discount
// =============================================================================

/// Whether the Credit method (and with it the tiered discount) is
/// selectable for the given play volume. Both floors must hold.
#[inline]
pub fn credit_allowed(games_played: i64, subtotal: Money) -> bool {
    games_played >= CREDIT_MIN_GAMES && subtotal.units() >= CREDIT_MIN_SUBTOTAL
}

/// Resolves the tiered discount for a play volume.
///
/// Zero below the eligibility floor. Above it, the discount of the largest
/// tier threshold that is ≤ `games_played` - the highest qualifying tier
/// wins, tiers are not cumulative. A tier sheet with no qualifying
/// threshold also yields zero.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use baize_core::money::Money;
/// use baize_core::pricing::tiered_discount;
///
/// let tiers = BTreeMap::from([(4, 500), (8, 1200)]);
/// assert_eq!(
///     tiered_discount(&tiers, 5, Money::from_units(5000)),
///     Money::from_units(500)
/// );
/// assert_eq!(
///     tiered_discount(&tiers, 9, Money::from_units(9000)),
///     Money::from_units(1200)
/// );
/// // Below either floor: no discount at all.
/// assert_eq!(
///     tiered_discount(&tiers, 3, Money::from_units(9000)),
///     Money::zero()
/// );
/// ```
pub fn tiered_discount(
    tiers: &BTreeMap<i64, i64>,
    games_played: i64,
    subtotal: Money,
) -> Money {
    if !credit_allowed(games_played, subtotal) {
        return Money::zero();
    }

    tiers
        .range(..=games_played)
        .next_back()
        .map(|(_, discount)| Money::from_units(*discount))
        .unwrap_or_else(Money::zero)
}

// =============================================================================
// Checkout Quote
// =============================================================================

/// The amounts a checkout is based on, computed at quote time and copied
/// into the transaction at finalize time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutQuote {
    pub method: PaymentMethod,
    pub games_played: i64,
    pub subtotal_units: i64,
    pub market_total_units: i64,
    pub discount_units: i64,
    /// `max(0, subtotal + market − discount)`.
    pub expected_total_units: i64,
}

impl CheckoutQuote {
    #[inline]
    pub fn expected_total(&self) -> Money {
        Money::from_units(self.expected_total_units)
    }
}

/// Computes the bill for a session under a payment method.
///
/// The discount applies only to Credit; Cash and Debt pay full price.
/// Selecting Credit below the eligibility floor is an error, not a silent
/// downgrade - the dashboard greys the option out and the engine enforces
/// it again here.
pub fn quote(
    session: &Session,
    settings: &HallSettings,
    method: PaymentMethod,
) -> CoreResult<CheckoutQuote> {
    let subtotal = games_subtotal(session);
    let market = market_total(session);

    let discount = match method {
        PaymentMethod::Credit => {
            if !credit_allowed(session.games_played, subtotal) {
                return Err(CoreError::CreditNotEligible {
                    games: session.games_played,
                    subtotal,
                    min_games: CREDIT_MIN_GAMES,
                    min_subtotal: Money::from_units(CREDIT_MIN_SUBTOTAL),
                });
            }
            tiered_discount(&settings.discount_tiers, session.games_played, subtotal)
        }
        PaymentMethod::Cash | PaymentMethod::Debt => Money::zero(),
    };

    let expected = (subtotal + market).saturating_sub(discount);

    Ok(CheckoutQuote {
        method,
        games_played: session.games_played,
        subtotal_units: subtotal.units(),
        market_total_units: market.units(),
        discount_units: discount.units(),
        expected_total_units: expected.units(),
    })
}

// =============================================================================
// Payment Mismatch
// =============================================================================

/// Comparison of the operator-entered amount against the quote.
///
/// A mismatch is surfaced as a warning and the entered amount proceeds as
/// authoritative; the system never blocks on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMismatch {
    Exact,
    Underpaid { by_units: i64 },
    Overpaid { by_units: i64 },
}

/// Classifies paid vs expected for the checkout warning.
pub fn payment_mismatch(expected: Money, paid: Money) -> PaymentMismatch {
    match paid.units() - expected.units() {
        0 => PaymentMismatch::Exact,
        d if d < 0 => PaymentMismatch::Underpaid { by_units: -d },
        d => PaymentMismatch::Overpaid { by_units: d },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session_with(games: i64, price: i64) -> Session {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let mut session = Session::new("Bat", Money::from_units(price), now);
        for i in 0..games {
            session.record_game(1, now + chrono::Duration::minutes(i * 12));
        }
        session
    }

    fn settings_with_tiers(tiers: &[(i64, i64)]) -> HallSettings {
        HallSettings {
            discount_tiers: tiers.iter().copied().collect(),
            ..HallSettings::default()
        }
    }

    #[test]
    fn test_subtotals() {
        let mut session = session_with(5, 1000);
        session.adjust_purchase("cola", 2, Money::from_units(500));

        assert_eq!(games_subtotal(&session), Money::from_units(5000));
        assert_eq!(market_total(&session), Money::from_units(1000));
    }

    #[test]
    fn test_discount_needs_both_floors() {
        let tiers: BTreeMap<i64, i64> = [(4, 500)].into_iter().collect();

        // Enough games, subtotal too small (4 × 700 = 2800).
        assert_eq!(
            tiered_discount(&tiers, 4, Money::from_units(2800)),
            Money::zero()
        );
        // Enough subtotal, not enough games.
        assert_eq!(
            tiered_discount(&tiers, 3, Money::from_units(6000)),
            Money::zero()
        );
        // Both floors met.
        assert_eq!(
            tiered_discount(&tiers, 4, Money::from_units(4000)),
            Money::from_units(500)
        );
    }

    #[test]
    fn test_discount_highest_qualifying_tier() {
        let tiers: BTreeMap<i64, i64> = [(4, 500), (6, 900), (10, 2000)].into_iter().collect();

        assert_eq!(
            tiered_discount(&tiers, 5, Money::from_units(5000)),
            Money::from_units(500)
        );
        assert_eq!(
            tiered_discount(&tiers, 6, Money::from_units(6000)),
            Money::from_units(900)
        );
        assert_eq!(
            tiered_discount(&tiers, 25, Money::from_units(25000)),
            Money::from_units(2000)
        );

        // Eligible volume but every threshold above it: zero.
        let high_tiers: BTreeMap<i64, i64> = [(20, 5000)].into_iter().collect();
        assert_eq!(
            tiered_discount(&high_tiers, 10, Money::from_units(10000)),
            Money::zero()
        );
    }

    #[test]
    fn test_discount_monotone_in_games_played() {
        let tiers: BTreeMap<i64, i64> = [(4, 500), (6, 900), (10, 2000)].into_iter().collect();
        let price = 1000;

        let mut last = Money::zero();
        for games in 4..30 {
            let subtotal = Money::from_units(games * price);
            let discount = tiered_discount(&tiers, games, subtotal);
            assert!(
                discount >= last,
                "discount regressed at {} games: {} < {}",
                games,
                discount,
                last
            );
            last = discount;
        }
    }

    #[test]
    fn test_credit_quote_applies_discount() {
        let settings = settings_with_tiers(&[(4, 500)]);
        let mut session = session_with(5, 1000);
        session.adjust_purchase("cola", 2, Money::from_units(500));

        let q = quote(&session, &settings, PaymentMethod::Credit).unwrap();
        assert_eq!(q.subtotal_units, 5000);
        assert_eq!(q.market_total_units, 1000);
        assert_eq!(q.discount_units, 500);
        assert_eq!(q.expected_total_units, 5500);
    }

    #[test]
    fn test_cash_and_debt_never_discount() {
        let settings = settings_with_tiers(&[(4, 500)]);
        let session = session_with(5, 1000);

        for method in [PaymentMethod::Cash, PaymentMethod::Debt] {
            let q = quote(&session, &settings, method).unwrap();
            assert_eq!(q.discount_units, 0);
            assert_eq!(q.expected_total_units, 5000);
        }
    }

    #[test]
    fn test_credit_below_floor_rejected() {
        let settings = settings_with_tiers(&[(4, 500)]);

        // 3 games × 1000 = 3000: subtotal floor met, games floor not.
        let session = session_with(3, 1000);
        assert!(matches!(
            quote(&session, &settings, PaymentMethod::Credit),
            Err(CoreError::CreditNotEligible { .. })
        ));

        // 4 games × 700 = 2800: games floor met, subtotal floor not.
        let session = session_with(4, 700);
        assert!(matches!(
            quote(&session, &settings, PaymentMethod::Credit),
            Err(CoreError::CreditNotEligible { .. })
        ));
    }

    #[test]
    fn test_expected_total_clamped_at_zero() {
        // Discount larger than the whole bill (misconfigured tier sheet).
        let settings = settings_with_tiers(&[(4, 99999)]);
        let session = session_with(4, 1000);

        let q = quote(&session, &settings, PaymentMethod::Credit).unwrap();
        assert_eq!(q.expected_total_units, 0);
    }

    #[test]
    fn test_payment_mismatch_classification() {
        let expected = Money::from_units(5500);
        assert_eq!(
            payment_mismatch(expected, Money::from_units(5500)),
            PaymentMismatch::Exact
        );
        assert_eq!(
            payment_mismatch(expected, Money::from_units(5000)),
            PaymentMismatch::Underpaid { by_units: 500 }
        );
        assert_eq!(
            payment_mismatch(expected, Money::from_units(6000)),
            PaymentMismatch::Overpaid { by_units: 500 }
        );
    }
}
