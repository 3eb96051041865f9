use crate::CrawlerError;
use lazy_regex::regex_captures;
use std::{fmt, str::FromStr};

/// An academic term such as `103-2` (academic year 103, second term).
///
/// Ordering is by year, then term. The site addresses semesters with the
/// same `YYY-S` text it shows in its semester selector, so [`site_key`]
/// and [`from_site_key`] are plain formatting and parsing.
///
/// [`site_key`]: Semester::site_key
/// [`from_site_key`]: Semester::from_site_key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Semester {
    year: u16,
    term: u8,
}

impl Semester {
    pub fn new(year: u16, term: u8) -> Result<Semester, CrawlerError> {
        if !(1..=2).contains(&term) || year == 0 || year > 999 {
            return Err(CrawlerError::InvalidSemester(format!("{}-{}", year, term)));
        }
        Ok(Semester { year, term })
    }

    pub(crate) const fn new_unchecked(year: u16, term: u8) -> Self {
        Semester { year, term }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn term(&self) -> u8 {
        self.term
    }

    pub fn site_key(&self) -> String {
        self.to_string()
    }

    pub fn from_site_key(key: &str) -> Result<Semester, CrawlerError> {
        key.parse()
    }
}

impl FromStr for Semester {
    type Err = CrawlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CrawlerError::InvalidSemester(s.to_string());
        let (_, year, term) = regex_captures!(r"^\s*(\d{1,3})-([12])\s*$", s).ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let term = term.parse().map_err(|_| invalid())?;
        Semester::new(year, term).map_err(|_| invalid())
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.term)
    }
}
