use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Outcome of a single compile or run.
///
/// Declaration order only gives a stable key order for reports; it carries no
/// meaning beyond that.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Unknown,
    Ok,
    /// Successful, but scientifically interesting.
    Flagged,
    CompileFail,
    CompileTimeout,
    RunFail,
    RunTimeout,
}

impl Status {
    /// Every status, in report order.
    pub const ALL: [Status; 7] = [
        Status::Unknown,
        Status::Ok,
        Status::Flagged,
        Status::CompileFail,
        Status::CompileTimeout,
        Status::RunFail,
        Status::RunTimeout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Ok => "ok",
            Status::Flagged => "flagged",
            Status::CompileFail => "compile_fail",
            Status::CompileTimeout => "compile_timeout",
            Status::RunFail => "run_fail",
            Status::RunTimeout => "run_timeout",
        }
    }

    pub fn flag(self) -> Flag {
        match self {
            Status::Unknown => Flag::UNKNOWN,
            Status::Ok => Flag::OK,
            Status::Flagged => Flag::FLAGGED,
            Status::CompileFail => Flag::COMPILE_FAIL,
            Status::CompileTimeout => Flag::COMPILE_TIMEOUT,
            Status::RunFail => Flag::RUN_FAIL,
            Status::RunTimeout => Flag::RUN_TIMEOUT,
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::CompileFail | Status::RunFail)
    }

    pub fn is_timeout(self) -> bool {
        matches!(self, Status::CompileTimeout | Status::RunTimeout)
    }

    /// Whether timing samples from a result with this status are meaningful.
    pub fn has_usable_timing(self) -> bool {
        !(self.is_failure() || self.is_timeout())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitset form of [`Status`], for "any of" queries.
///
/// The zero value is exactly `Ok`. Matching against `Ok` uses equality, while
/// matching against anything else uses bit containment, so a subject that
/// has any non-Ok bit set never counts as Ok.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(u8);

impl Flag {
    pub const OK: Flag = Flag(0);
    pub const UNKNOWN: Flag = Flag(1 << 0);
    pub const FLAGGED: Flag = Flag(1 << 1);
    pub const COMPILE_FAIL: Flag = Flag(1 << 2);
    pub const COMPILE_TIMEOUT: Flag = Flag(1 << 3);
    pub const RUN_FAIL: Flag = Flag(1 << 4);
    pub const RUN_TIMEOUT: Flag = Flag(1 << 5);

    const KNOWN_BITS: u8 = (1 << 6) - 1;

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a flag from raw bits, discarding bits that name no status.
    pub const fn from_bits_truncate(bits: u8) -> Flag {
        Flag(bits & Self::KNOWN_BITS)
    }

    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Does this flag set satisfy a query for `want`?
    pub fn matches(self, want: Flag) -> bool {
        if want.is_ok() {
            self.is_ok()
        } else {
            self.0 & want.0 == want.0
        }
    }

    /// Statuses this flag set matches, in report order.
    pub fn statuses(self) -> impl Iterator<Item = Status> {
        Status::ALL.into_iter().filter(move |s| self.matches(s.flag()))
    }
}

impl From<Status> for Flag {
    fn from(status: Status) -> Self {
        status.flag()
    }
}

impl BitOr for Flag {
    type Output = Flag;

    fn bitor(self, rhs: Flag) -> Flag {
        Flag(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flag {
    fn bitor_assign(&mut self, rhs: Flag) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.statuses().map(Status::as_str).collect();
        f.write_str(&names.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ok_only_matches_ok() {
        assert!(Flag::OK.matches(Flag::OK));
        assert!(!Flag::COMPILE_FAIL.matches(Flag::OK));
        // Everything contains the empty set bitwise, but Ok must not use that rule.
        assert!(!Flag::OK.matches(Flag::RUN_TIMEOUT));
    }

    #[test]
    fn combined_flag_matches_each_component() {
        let both = Flag::COMPILE_FAIL | Flag::RUN_TIMEOUT;
        assert!(both.matches(Flag::COMPILE_FAIL));
        assert!(both.matches(Flag::RUN_TIMEOUT));
        assert!(!both.matches(Flag::RUN_FAIL));
        assert!(!both.matches(Flag::OK));
        assert_eq!(
            both.statuses().collect::<Vec<_>>(),
            vec![Status::CompileFail, Status::RunTimeout]
        );
    }

    #[test]
    fn status_flags_are_distinct() {
        for (i, a) in Status::ALL.iter().enumerate() {
            for b in &Status::ALL[i + 1..] {
                assert_ne!(a.flag(), b.flag(), "{a} and {b} share a flag");
            }
        }
    }

    #[test]
    fn display_joins_names() {
        assert_eq!(Flag::OK.to_string(), "ok");
        assert_eq!((Flag::FLAGGED | Flag::RUN_FAIL).to_string(), "flagged|run_fail");
    }

    proptest! {
        #[test]
        fn prop_non_ok_flags_never_match_ok(bits in 1_u8..64) {
            let flag = Flag::from_bits_truncate(bits);
            prop_assert!(!flag.matches(Flag::OK));
        }

        #[test]
        fn prop_union_matches_both_operands(a in 0_u8..7, b in 0_u8..7) {
            let sa = Status::ALL[a as usize];
            let sb = Status::ALL[b as usize];
            let union = sa.flag() | sb.flag();
            for s in [sa, sb] {
                if s != Status::Ok || union.is_ok() {
                    prop_assert!(union.matches(s.flag()), "{} should match {}", union, s);
                }
            }
        }
    }
}
