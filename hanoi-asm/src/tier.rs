use core::fmt;

/// Operating tier of the VM, named after the dominant digit width.
///
/// Tiers are totally ordered: `T81 < T243 < T729`. Opcodes declare the
/// minimum tier they execute at; the tier state machine moves the context
/// along this lattice one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Tier {
    /// Base tier, 4-trit digits.
    #[default]
    T81 = 0,
    /// Symbolic tier, 5-trit digits.
    T243 = 1,
    /// Tensor tier, 6-trit digits.
    T729 = 2,
}

impl Tier {
    /// Digit radix of the tier.
    pub const fn base(self) -> u32 {
        match self {
            Self::T81 => 81,
            Self::T243 => 243,
            Self::T729 => 729,
        }
    }

    /// Next tier up, if any.
    pub const fn promoted(self) -> Option<Self> {
        match self {
            Self::T81 => Some(Self::T243),
            Self::T243 => Some(Self::T729),
            Self::T729 => None,
        }
    }

    /// Next tier down, if any.
    pub const fn demoted(self) -> Option<Self> {
        match self {
            Self::T81 => None,
            Self::T243 => Some(Self::T81),
            Self::T729 => Some(Self::T243),
        }
    }

    /// Stable single-byte encoding, used in trace summaries.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T81 => write!(f, "T81"),
            Self::T243 => write!(f, "T243"),
            Self::T729 => write!(f, "T729"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_ordered() {
        assert!(Tier::T81 < Tier::T243);
        assert!(Tier::T243 < Tier::T729);
        assert_eq!(Tier::T81.promoted(), Some(Tier::T243));
        assert_eq!(Tier::T729.promoted(), None);
        assert_eq!(Tier::T729.demoted(), Some(Tier::T243));
        assert_eq!(Tier::T81.demoted(), None);
    }

    #[test]
    fn bases_match_digit_radices() {
        assert_eq!(Tier::T81.base(), 81);
        assert_eq!(Tier::T243.base(), 243);
        assert_eq!(Tier::T729.base(), 729);
    }
}
