//! Turtle subsystems and their breakout parameters.

use std::fmt;

/// The two parallel Turtle rule sets. S1 trades the short breakout and
/// carries the skip-after-win rule; S2 trades the long breakout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subsystem {
    S1,
    S2,
}

impl Subsystem {
    /// Processing order within a day: S1 before S2.
    pub const ALL: [Subsystem; 2] = [Subsystem::S1, Subsystem::S2];

    pub fn index(self) -> usize {
        match self {
            Subsystem::S1 => 0,
            Subsystem::S2 => 1,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::S1 => write!(f, "S1"),
            Subsystem::S2 => write!(f, "S2"),
        }
    }
}

/// Breakout lookbacks for one subsystem, in bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakoutWindows {
    pub entry: usize,
    pub exit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_display() {
        assert_eq!(Subsystem::S1.to_string(), "S1");
        assert_eq!(Subsystem::S2.to_string(), "S2");
    }

    #[test]
    fn processing_order_is_s1_then_s2() {
        assert_eq!(Subsystem::ALL, [Subsystem::S1, Subsystem::S2]);
        assert_eq!(Subsystem::S1.index(), 0);
        assert_eq!(Subsystem::S2.index(), 1);
    }
}
