//! Access tiers derived from a measured balance.
//!
//! The policy table is static configuration: loaded once, validated, never
//! mutated. Resolution is a pure lookup with no I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Discrete access level. Tier 0 has no write privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Zero, Tier::One, Tier::Two, Tier::Three];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

impl From<Tier> for u8 {
    fn from(t: Tier) -> u8 {
        t.as_u8()
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        Tier::from_u8(v).ok_or_else(|| format!("tier must be 0-3, got {v}"))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Zero => "0",
            Tier::One => "I",
            Tier::Two => "II",
            Tier::Three => "III",
        };
        f.write_str(s)
    }
}

/// Per-tier write policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub tier: Tier,
    pub min_balance: f64,
    pub max_chars: usize,
    /// `None` means unlimited.
    #[serde(default)]
    pub max_entries_per_cycle: Option<u32>,
    #[serde(default)]
    pub core_memory_eligible: bool,
}

impl TierPolicy {
    fn no_write() -> Self {
        Self {
            tier: Tier::Zero,
            min_balance: 0.0,
            max_chars: 0,
            max_entries_per_cycle: Some(0),
            core_memory_eligible: false,
        }
    }

    pub fn can_write(&self) -> bool {
        self.tier > Tier::Zero
    }
}

/// The full policy table, indexed by tier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PolicyTable {
    policies: Vec<TierPolicy>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            policies: vec![
                TierPolicy::no_write(),
                TierPolicy {
                    tier: Tier::One,
                    min_balance: 10_000.0,
                    max_chars: 280,
                    max_entries_per_cycle: Some(1),
                    core_memory_eligible: false,
                },
                TierPolicy {
                    tier: Tier::Two,
                    min_balance: 50_000.0,
                    max_chars: 1000,
                    max_entries_per_cycle: None,
                    core_memory_eligible: false,
                },
                TierPolicy {
                    tier: Tier::Three,
                    min_balance: 200_000.0,
                    max_chars: 1000,
                    max_entries_per_cycle: None,
                    core_memory_eligible: true,
                },
            ],
        }
    }
}

impl PolicyTable {
    /// Build a table from configured policies. Tier 0 may be omitted; it is
    /// always the no-write policy. Fails unless tiers I-III are each present
    /// once, thresholds and character limits never decrease with tier, and
    /// only tier III may hold core memories.
    pub fn from_policies(mut policies: Vec<TierPolicy>) -> Result<Self> {
        if !policies.iter().any(|p| p.tier == Tier::Zero) {
            policies.push(TierPolicy::no_write());
        }
        policies.sort_by_key(|p| p.tier);

        let tiers: Vec<Tier> = policies.iter().map(|p| p.tier).collect();
        if tiers != Tier::ALL {
            return Err(Error::InvalidInput(format!(
                "policy table must define each of tiers 0-3 exactly once, got {tiers:?}"
            )));
        }

        let zero = &policies[0];
        if zero.min_balance != 0.0 || zero.max_chars != 0 || zero.core_memory_eligible {
            return Err(Error::InvalidInput(
                "tier 0 must have min_balance 0, max_chars 0 and no core memories".to_string(),
            ));
        }

        if let Some(p) = policies
            .iter()
            .find(|p| p.tier < Tier::Three && p.core_memory_eligible)
        {
            return Err(Error::InvalidInput(format!(
                "only tier III may be core memory eligible, tier {} is marked eligible",
                p.tier
            )));
        }

        for pair in policies.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if !hi.min_balance.is_finite() || hi.min_balance < lo.min_balance {
                return Err(Error::InvalidInput(format!(
                    "min_balance must not decrease: tier {} has {}, tier {} has {}",
                    lo.tier, lo.min_balance, hi.tier, hi.min_balance
                )));
            }
            if hi.max_chars < lo.max_chars {
                return Err(Error::InvalidInput(format!(
                    "max_chars must not decrease: tier {} has {}, tier {} has {}",
                    lo.tier, lo.max_chars, hi.tier, hi.max_chars
                )));
            }
        }

        Ok(Self { policies })
    }

    /// Highest tier whose threshold the balance meets. NaN and negative
    /// balances resolve to tier 0; positive infinity meets every threshold.
    pub fn resolve(&self, balance: f64) -> Tier {
        if balance.is_nan() || balance < 0.0 {
            return Tier::Zero;
        }
        self.policies
            .iter()
            .rev()
            .filter(|p| p.can_write())
            .find(|p| p.min_balance <= balance)
            .map(|p| p.tier)
            .unwrap_or(Tier::Zero)
    }

    pub fn policy(&self, tier: Tier) -> &TierPolicy {
        &self.policies[tier as usize]
    }

    /// Balance needed for the lowest writable tier.
    pub fn write_threshold(&self) -> f64 {
        self.policy(Tier::One).min_balance
    }

    pub fn iter(&self) -> impl Iterator<Item = &TierPolicy> {
        self.policies.iter()
    }
}
