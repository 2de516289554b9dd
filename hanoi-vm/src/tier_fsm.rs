//! Tier-mode state machine
//!
//! Transitions are driven by exactly two observables: the call depth and
//! the maximum magnitude written by the most recent handler. Promotions
//! fire on edges (a depth increment crossing the threshold, a written value
//! reaching the tier base, a T729 opcode arriving at T243); demotions are
//! evaluated when the call depth decreases. Every transition is observable
//! as a `MODE_CHANGE` trace event.

use hanoi_asm::Tier;

use core::fmt;

/// Why a tier transition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TierShiftCause {
    /// Call depth crossed the promote threshold.
    CallDepth = 0,
    /// A handler wrote a value at or above the tier base.
    Magnitude = 1,
    /// A T729-required opcode arrived at T243.
    OpcodeRequirement = 2,
    /// Call depth relaxed below the demote threshold.
    Relaxation = 3,
}

/// One observed tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierShift {
    /// Tier before the transition.
    pub from: Tier,
    /// Tier after the transition.
    pub to: Tier,
    /// What drove it.
    pub cause: TierShiftCause,
}

impl TierShift {
    /// One-byte trace summary: `from` and `to` in the high nibble, the
    /// cause in the low bits.
    pub const fn summary(&self) -> u8 {
        (self.from.code() << 4) | (self.to.code() << 2) | self.cause as u8
    }
}

impl fmt::Display for TierShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{} ({:?})", self.from, self.to, self.cause)
    }
}

/// The promotion/demotion rules; thresholds are the only tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierFsm {
    promote_threshold: usize,
    demote_threshold: usize,
}

impl TierFsm {
    /// Build with explicit thresholds.
    pub const fn new(promote_threshold: usize, demote_threshold: usize) -> Self {
        Self {
            promote_threshold,
            demote_threshold,
        }
    }

    /// Call-depth edge: the depth has just increased to `call_depth`.
    pub fn on_call(&self, tier: Tier, call_depth: usize) -> Option<TierShift> {
        if call_depth > self.promote_threshold {
            tier.promoted().map(|to| TierShift {
                from: tier,
                to,
                cause: TierShiftCause::CallDepth,
            })
        } else {
            None
        }
    }

    /// Magnitude edge: a handler wrote a value of the given magnitude.
    pub fn on_magnitude(&self, tier: Tier, magnitude: u64) -> Option<TierShift> {
        if magnitude >= u64::from(tier.base()) {
            tier.promoted().map(|to| TierShift {
                from: tier,
                to,
                cause: TierShiftCause::Magnitude,
            })
        } else {
            None
        }
    }

    /// A T729-required opcode is about to execute.
    ///
    /// At T243 this promotes; at T81 the dispatcher faults with a mode
    /// violation instead, so no shift is produced.
    pub fn on_requirement(&self, tier: Tier, required: Tier) -> Option<TierShift> {
        if tier == Tier::T243 && required == Tier::T729 {
            Some(TierShift {
                from: tier,
                to: Tier::T729,
                cause: TierShiftCause::OpcodeRequirement,
            })
        } else {
            None
        }
    }

    /// Return edge: the depth has just decreased to `call_depth`.
    ///
    /// `stack_floor` is the highest tier any stack operand pins; demotion
    /// only fires when the floor sits below the current tier.
    pub fn on_return(
        &self,
        tier: Tier,
        call_depth: usize,
        stack_floor: Tier,
    ) -> Option<TierShift> {
        if call_depth >= self.demote_threshold || stack_floor >= tier {
            return None
        }
        tier.demoted().map(|to| TierShift {
            from: tier,
            to,
            cause: TierShiftCause::Relaxation,
        })
    }
}
