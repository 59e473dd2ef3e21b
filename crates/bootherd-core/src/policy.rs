//! Recovery policy.
//!
//! A pure function from the per-tick liveness snapshot to a recovery plan.
//! It holds no memory of prior ticks: no backoff, no failure counting, no
//! retry ceiling. Bounding restart storms would be an enhancement on top
//! of this behavior, not something callers may assume exists.

use crate::types::{LivenessSnapshot, RecoveryPlan, ServiceName};

/// Decides what to restart, given a liveness snapshot.
///
/// A single dead service gets a direct relaunch while the other daemon is
/// left alone: its continued presence is taken as evidence the environment
/// is sound. Both down at once is treated as a systemic problem (typically
/// port contention from a half-dead prior instance), so that case escalates
/// to the emergency reset instead of two independent relaunches.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    restart_tftp: bool,
}

impl RecoveryPolicy {
    /// Creates a policy. `restart_tftp` controls the tftp-only-down case;
    /// pass `true` for the default "restart it" behavior.
    #[must_use]
    pub const fn new(restart_tftp: bool) -> Self {
        Self { restart_tftp }
    }

    /// The transition table.
    #[must_use]
    pub fn plan(&self, snapshot: LivenessSnapshot) -> RecoveryPlan {
        match (snapshot.dhcp, snapshot.tftp) {
            (true, true) => RecoveryPlan::None,
            (false, true) => RecoveryPlan::Relaunch(ServiceName::Dhcp),
            (true, false) if self.restart_tftp => RecoveryPlan::Relaunch(ServiceName::Tftp),
            (true, false) => RecoveryPlan::None,
            (false, false) => RecoveryPlan::EmergencyReset,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const fn snap(dhcp: bool, tftp: bool) -> LivenessSnapshot {
        LivenessSnapshot { dhcp, tftp }
    }

    // -------------------------------------------------------------------------
    // Transition table
    // -------------------------------------------------------------------------

    #[test]
    fn test_both_alive_no_action() {
        let policy = RecoveryPolicy::default();
        assert_eq!(policy.plan(snap(true, true)), RecoveryPlan::None);
    }

    #[test]
    fn test_dhcp_down_restarts_dhcp_only() {
        let policy = RecoveryPolicy::default();
        let plan = policy.plan(snap(false, true));
        assert_eq!(plan, RecoveryPlan::Relaunch(ServiceName::Dhcp));
        assert!(!plan.restarts(ServiceName::Tftp));
    }

    #[test]
    fn test_tftp_down_restarts_tftp_only() {
        let policy = RecoveryPolicy::default();
        let plan = policy.plan(snap(true, false));
        assert_eq!(plan, RecoveryPlan::Relaunch(ServiceName::Tftp));
        assert!(!plan.restarts(ServiceName::Dhcp));
    }

    #[test]
    fn test_tftp_down_skipped_when_configured() {
        let policy = RecoveryPolicy::new(false);
        assert_eq!(policy.plan(snap(true, false)), RecoveryPlan::None);
        // The toggle only affects the tftp-only case.
        assert_eq!(
            policy.plan(snap(false, true)),
            RecoveryPlan::Relaunch(ServiceName::Dhcp)
        );
        assert_eq!(policy.plan(snap(false, false)), RecoveryPlan::EmergencyReset);
    }

    #[test]
    fn test_both_down_is_emergency() {
        let policy = RecoveryPolicy::default();
        let plan = policy.plan(snap(false, false));
        assert_eq!(plan, RecoveryPlan::EmergencyReset);
        assert!(plan.restarts(ServiceName::Dhcp));
        assert!(plan.restarts(ServiceName::Tftp));
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    proptest! {
        /// An alive service is never singled out for restart; the only way
        /// it can be touched is the emergency path, which requires both to
        /// be down.
        #[test]
        fn prop_never_restarts_alive_service(dhcp: bool, tftp: bool, restart_tftp: bool) {
            let plan = RecoveryPolicy::new(restart_tftp).plan(snap(dhcp, tftp));
            if dhcp {
                prop_assert!(!plan.restarts(ServiceName::Dhcp));
            }
            if tftp {
                prop_assert!(!plan.restarts(ServiceName::Tftp));
            }
        }

        /// The emergency path fires exactly when both are down.
        #[test]
        fn prop_emergency_iff_both_down(dhcp: bool, tftp: bool, restart_tftp: bool) {
            let plan = RecoveryPolicy::new(restart_tftp).plan(snap(dhcp, tftp));
            prop_assert_eq!(plan == RecoveryPlan::EmergencyReset, !dhcp && !tftp);
        }

        /// Stateless: the same snapshot always yields the same plan.
        #[test]
        fn prop_pure(dhcp: bool, tftp: bool, restart_tftp: bool) {
            let policy = RecoveryPolicy::new(restart_tftp);
            prop_assert_eq!(policy.plan(snap(dhcp, tftp)), policy.plan(snap(dhcp, tftp)));
        }
    }
}
