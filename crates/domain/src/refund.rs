//! Refund-eligibility decision for cancellations.

use chrono::NaiveDate;

use crate::booking::Money;

/// Clear days of notice required before the test date for a cancellation
/// to qualify for a refund.
pub const REFUND_NOTICE_DAYS: i64 = 3;

/// What the payment service should be asked to do for a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundDecision {
    /// Nothing was charged, so there is nothing to refund or keep.
    NoPaymentAction,
    /// The charge is returned to the candidate.
    Refund,
    /// The charge is kept; the provider recognises the income.
    RecogniseIncome,
}

/// Decides refund handling for a cancellation.
///
/// A pure function of the amount paid, the test date, and the day the
/// cancellation is made. The decision is made once per cancellation run
/// and must not be re-derived between the decision and the payment call.
pub fn decide(price: Money, test_date: NaiveDate, cancelled_on: NaiveDate) -> RefundDecision {
    if price.is_zero() {
        return RefundDecision::NoPaymentAction;
    }

    let notice = test_date.signed_duration_since(cancelled_on).num_days();
    if notice >= REFUND_NOTICE_DAYS {
        RefundDecision::Refund
    } else {
        RefundDecision::RecogniseIncome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_zero_cost_booking_never_touches_payment() {
        let decision = decide(Money::zero(), date(2026, 10, 12), date(2026, 10, 1));
        assert_eq!(decision, RefundDecision::NoPaymentAction);

        // Even inside the notice window.
        let decision = decide(Money::zero(), date(2026, 10, 12), date(2026, 10, 12));
        assert_eq!(decision, RefundDecision::NoPaymentAction);
    }

    #[test]
    fn test_enough_notice_refunds() {
        let decision = decide(
            Money::from_pence(2300),
            date(2026, 10, 12),
            date(2026, 10, 1),
        );
        assert_eq!(decision, RefundDecision::Refund);
    }

    #[test]
    fn test_boundary_day_still_refunds() {
        // Exactly the required notice.
        let decision = decide(
            Money::from_pence(2300),
            date(2026, 10, 12),
            date(2026, 10, 9),
        );
        assert_eq!(decision, RefundDecision::Refund);
    }

    #[test]
    fn test_short_notice_recognises_income() {
        let decision = decide(
            Money::from_pence(2300),
            date(2026, 10, 12),
            date(2026, 10, 10),
        );
        assert_eq!(decision, RefundDecision::RecogniseIncome);

        // Cancelling on the day itself.
        let decision = decide(
            Money::from_pence(2300),
            date(2026, 10, 12),
            date(2026, 10, 12),
        );
        assert_eq!(decision, RefundDecision::RecogniseIncome);
    }

    #[test]
    fn test_decision_is_pure() {
        let a = decide(Money::from_pence(2600), date(2026, 3, 1), date(2026, 2, 1));
        let b = decide(Money::from_pence(2600), date(2026, 3, 1), date(2026, 2, 1));
        assert_eq!(a, b);
    }
}
