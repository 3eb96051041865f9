//! Period codes and the one-time period renumbering.
//!
//! Up to (but excluding) the boundary semester the listing uses periods
//! `1..=9` plus `A` for the slot after period 9. From the boundary on it
//! uses `1..=10` and no `A`. Codes are kept per epoch; comparing two
//! semesters across the boundary goes through [`PeriodMapper::teaching_slot`].

use crate::Semester;
use std::fmt;

/// First semester using the renumbered periods.
pub const DEFAULT_PERIOD_BOUNDARY: Semester = Semester::new_unchecked(104, 1);

const LEGACY_LAST_NUMBERED: u8 = 9;
const CURRENT_LAST_NUMBERED: u8 = 10;
/// First legacy period that moved one slot later.
const LEGACY_FIRST_SHIFTED: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    Legacy,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Numbered(u8),
    /// The legacy `A` period.
    Extra,
    Blank,
    /// Anything the epoch does not define, kept verbatim.
    Unknown(String),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Numbered(n) => write!(f, "{}", n),
            Period::Extra => f.write_str("A"),
            Period::Blank => Ok(()),
            Period::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Position of a teaching slot within a day, comparable across epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeachingSlot(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodMapper {
    boundary: Semester,
}

impl Default for PeriodMapper {
    fn default() -> Self {
        PeriodMapper::new(DEFAULT_PERIOD_BOUNDARY)
    }
}

impl PeriodMapper {
    pub fn new(boundary: Semester) -> Self {
        PeriodMapper { boundary }
    }

    pub fn boundary(&self) -> Semester {
        self.boundary
    }

    pub fn epoch(&self, semester: Semester) -> Epoch {
        if semester < self.boundary {
            Epoch::Legacy
        } else {
            Epoch::Current
        }
    }

    /// Parses one raw code within the epoch of `semester`.
    pub fn parse(&self, semester: Semester, raw: &str) -> Period {
        let code = raw.trim();
        if code.is_empty() {
            return Period::Blank;
        }
        let epoch = self.epoch(semester);
        if epoch == Epoch::Legacy && code.eq_ignore_ascii_case("a") {
            return Period::Extra;
        }
        let last = match epoch {
            Epoch::Legacy => LEGACY_LAST_NUMBERED,
            Epoch::Current => CURRENT_LAST_NUMBERED,
        };
        match code.parse::<u8>() {
            Ok(n) if (1..=last).contains(&n) => Period::Numbered(n),
            _ => Period::Unknown(code.to_string()),
        }
    }

    /// Canonical codes for the epoch of `semester`. No cross-epoch
    /// translation happens here.
    pub fn canonicalize<S: AsRef<str>>(&self, semester: Semester, raw: &[S]) -> Vec<Period> {
        raw.iter()
            .map(|code| self.parse(semester, code.as_ref()))
            .collect()
    }

    /// Maps a period of `semester` to its cross-epoch teaching slot.
    ///
    /// Legacy periods from 7 on moved one slot later, and legacy `A` sits
    /// after the last current numbered period. Blank and unknown codes
    /// have no slot.
    pub fn teaching_slot(&self, semester: Semester, period: &Period) -> Option<TeachingSlot> {
        match (self.epoch(semester), period) {
            (Epoch::Current, Period::Numbered(n)) => Some(TeachingSlot(*n)),
            (Epoch::Legacy, Period::Numbered(n)) if *n >= LEGACY_FIRST_SHIFTED => {
                Some(TeachingSlot(n + 1))
            }
            (Epoch::Legacy, Period::Numbered(n)) => Some(TeachingSlot(*n)),
            (Epoch::Legacy, Period::Extra) => Some(TeachingSlot(CURRENT_LAST_NUMBERED + 1)),
            _ => None,
        }
    }

    /// Teaching slots for raw codes of `semester`, for comparing across
    /// the boundary.
    pub fn teaching_slots<S: AsRef<str>>(
        &self,
        semester: Semester,
        raw: &[S],
    ) -> Vec<Option<TeachingSlot>> {
        self.canonicalize(semester, raw)
            .iter()
            .map(|period| self.teaching_slot(semester, period))
            .collect()
    }
}
