//! Entitlement gate decision logic
//!
//! Pure decisions only. Loading and mutating entitlement rows lives in
//! `db::entitlements`; callers fetch the row, ask the gate, and act on the
//! answer. Counter increments happen only after a successful generation and
//! only through the store's atomic update.

use crate::db::entitlements::UserEntitlement;

/// Free generations permitted before a subscription is required
pub const FREE_QUOTA: i64 = 3;

/// Gate decision for a generation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Generation may proceed on the metered path
    Allowed,
    /// No authenticated user; caller must route to sign-in
    RequiresAuth,
    /// Free quota spent and no subscription; caller must surface the paywall
    QuotaExhausted,
}

/// Evaluate the gate for an optionally-authenticated caller
///
/// `None` means no authenticated user. Subscribed users bypass the counter
/// entirely; its stored value is display-only for them.
pub fn evaluate(entitlement: Option<&UserEntitlement>) -> GateDecision {
    match entitlement {
        None => GateDecision::RequiresAuth,
        Some(e) if e.is_subscribed => GateDecision::Allowed,
        Some(e) if e.free_poems_generated < FREE_QUOTA => GateDecision::Allowed,
        Some(_) => GateDecision::QuotaExhausted,
    }
}

/// Free generations left before the paywall, clamped at zero
pub fn remaining_free(entitlement: &UserEntitlement) -> i64 {
    (FREE_QUOTA - entitlement.free_poems_generated).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entitlement(free_poems_generated: i64, is_subscribed: bool) -> UserEntitlement {
        UserEntitlement {
            user_id: "user-1".to_string(),
            free_poems_generated,
            is_subscribed,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_absent_user_requires_auth() {
        assert_eq!(evaluate(None), GateDecision::RequiresAuth);
    }

    #[test]
    fn test_under_quota_allowed() {
        assert_eq!(evaluate(Some(&entitlement(0, false))), GateDecision::Allowed);
        assert_eq!(evaluate(Some(&entitlement(2, false))), GateDecision::Allowed);
    }

    #[test]
    fn test_at_quota_denied() {
        assert_eq!(
            evaluate(Some(&entitlement(3, false))),
            GateDecision::QuotaExhausted
        );
        assert_eq!(
            evaluate(Some(&entitlement(7, false))),
            GateDecision::QuotaExhausted
        );
    }

    #[test]
    fn test_subscription_bypasses_counter() {
        assert_eq!(evaluate(Some(&entitlement(3, true))), GateDecision::Allowed);
        assert_eq!(evaluate(Some(&entitlement(99, true))), GateDecision::Allowed);
    }

    #[test]
    fn test_remaining_free_clamps_at_zero() {
        assert_eq!(remaining_free(&entitlement(0, false)), 3);
        assert_eq!(remaining_free(&entitlement(2, false)), 1);
        assert_eq!(remaining_free(&entitlement(3, false)), 0);
        assert_eq!(remaining_free(&entitlement(9, false)), 0);
    }
}
