//! Comparison flags.
//!
//! CMP records the three-way ordering of two registers here and the
//! conditional jumps read it back. The hardware encodes this as a bitmask
//! (EQUAL = 1, GREATER = 2, LESS = 4) with at most one bit set; an enum
//! with an explicit unset state keeps a read-before-compare visible
//! instead of silently defaulting to zero.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of the most recent comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flags {
    /// No comparison has run yet.
    Unset,
    /// The operands were equal.
    Equal,
    /// The first operand was greater.
    Greater,
    /// The first operand was less.
    Less,
}

impl Flags {
    /// Compare two register values, producing exactly one flag.
    pub fn compare(a: u8, b: u8) -> Self {
        match a.cmp(&b) {
            Ordering::Equal => Flags::Equal,
            Ordering::Greater => Flags::Greater,
            Ordering::Less => Flags::Less,
        }
    }

    /// The hardware bitmask encoding: EQUAL = 1, GREATER = 2, LESS = 4.
    pub fn bits(self) -> u8 {
        match self {
            Flags::Unset => 0,
            Flags::Equal => 1,
            Flags::Greater => 2,
            Flags::Less => 4,
        }
    }

    /// True when the last comparison found its operands equal (JEQ fires).
    pub fn is_equal(self) -> bool {
        self == Flags::Equal
    }

    /// True when the last comparison found its operands unequal (JNE
    /// fires). An unset flags register satisfies neither condition, so no
    /// conditional jump is taken before the first CMP.
    pub fn is_unequal(self) -> bool {
        matches!(self, Flags::Greater | Flags::Less)
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::Unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_sets_exactly_one_state() {
        assert_eq!(Flags::compare(5, 5), Flags::Equal);
        assert_eq!(Flags::compare(5, 3), Flags::Greater);
        assert_eq!(Flags::compare(3, 5), Flags::Less);
    }

    #[test]
    fn bitmask_encoding_matches_the_hardware() {
        assert_eq!(Flags::Unset.bits(), 0);
        assert_eq!(Flags::Equal.bits(), 1);
        assert_eq!(Flags::Greater.bits(), 2);
        assert_eq!(Flags::Less.bits(), 4);
    }

    #[test]
    fn unset_satisfies_neither_branch_condition() {
        assert!(!Flags::Unset.is_equal());
        assert!(!Flags::Unset.is_unequal());
    }

    #[test]
    fn branch_conditions_partition_the_set_states() {
        assert!(Flags::Equal.is_equal());
        assert!(!Flags::Equal.is_unequal());
        assert!(Flags::Greater.is_unequal());
        assert!(Flags::Less.is_unequal());
    }
}
