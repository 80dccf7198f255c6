//! Fee escalation for wallets whose pending chain has hit the node's
//! mempool package-depth limit (last-child-pays-for-all CPFP).

use crate::utxo::Utxo;

/// Default mempool package-chain ceiling. Node policy can vary, so the
/// policy keeps this configurable.
pub const DEFAULT_PACKAGE_LIMIT: u32 = 25;

/// When and how hard to fee-bump a saturated ancestor chain.
#[derive(Debug, Clone, Copy)]
pub struct EscalationPolicy {
    /// The node's package-chain ceiling.
    pub package_limit: u32,
    /// Whether escalation is enabled at all.
    pub auto_speedup: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            package_limit: DEFAULT_PACKAGE_LIMIT,
            auto_speedup: false,
        }
    }
}

/// Outcome of planning an escalation for one saturated chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationPlan {
    /// The package's blended rate already meets the target; leave the
    /// chain alone.
    AlreadySufficient { per_fee: i64 },
    /// Broadcast a replacement child at `fee_rate` to pull the whole
    /// package up to the target.
    Bump { fee_rate: i64, per_fee: i64 },
}

impl EscalationPolicy {
    /// Escalation only fires once the chain has no room left: below the
    /// package limit a new child still relays on its own.
    pub fn needs_escalation(&self, utxo: &Utxo) -> bool {
        self.auto_speedup && utxo.ancestor_count == self.package_limit
    }

    /// Computes the fee rate for one replacement child such that the
    /// blended rate of the full package reaches `target_rate`.
    ///
    /// `per_fee` is the package's current blended rate. The shortfall
    /// `ancestor_vsize * target - ancestor_fees` is spread over a single
    /// child slot (`ancestor_vsize / package_limit` vbytes) and added on
    /// top of `per_fee`. All arithmetic is truncating `i64` division.
    pub fn plan(&self, utxo: &Utxo, target_rate: i64) -> EscalationPlan {
        let vsize = utxo.ancestor_vsize;
        let slot = vsize / self.package_limit as i64;
        if vsize <= 0 || slot == 0 {
            // No usable package metrics; pay the target rate outright.
            return EscalationPlan::Bump {
                fee_rate: target_rate,
                per_fee: 0,
            };
        }

        let per_fee = utxo.ancestor_fees / vsize;
        if per_fee >= target_rate {
            return EscalationPlan::AlreadySufficient { per_fee };
        }

        let fee_rate = (vsize * target_rate - utxo.ancestor_fees) / slot + per_fee;
        EscalationPlan::Bump { fee_rate, per_fee }
    }
}
