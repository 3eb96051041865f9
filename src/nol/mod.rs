mod ceiba;
mod crawler;
mod extract;
mod site;

pub use crawler::NolCrawler;
pub use extract::{extract_page, parse_schedule};
pub use site::Site;

use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{collections::BTreeSet, fmt};

/// One (weekday, period, classroom) entry of the time/classroom column.
/// Periods are kept exactly as the listing prints them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScheduleEntry {
    pub weekday: String,
    pub period: String,
    pub classroom: String,
}

impl ScheduleEntry {
    pub fn new(weekday: &str, period: &str, classroom: &str) -> Self {
        ScheduleEntry {
            weekday: weekday.to_string(),
            period: period.to_string(),
            classroom: classroom.to_string(),
        }
    }
}

/// A course row, named after the columns of the legacy spreadsheet export.
///
/// `None` means the cell was missing, `Some("")` that it was blank.
/// Fields serialized with a `PRIVATE____` prefix do not exist in the
/// legacy export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Course {
    pub ser_no: Option<String>,
    pub dpt_code: Option<String>,
    pub cou_code: Option<String>,
    pub credit: Option<String>,
    pub co_select: Option<String>,
    pub cou_cname: Option<String>,
    pub tea_cname: Option<String>,
    pub clsrom: Option<String>,
    pub sel_code: Option<String>,
    pub co_gmark: Option<String>,
    pub co_chg: Option<String>,
    pub year: Option<String>,
    pub comment: Option<String>,
    pub tlec: BTreeSet<ScheduleEntry>,
    pub klass: Option<String>,
    #[serde(rename = "PRIVATE____dptname")]
    pub dptname: Option<String>,
    /// `None` unless enrichment ran; `Some(None)` when the course has no
    /// CEIBA page.
    #[serde(rename = "PRIVATE____ceiba", skip_serializing_if = "Option::is_none")]
    pub ceiba: Option<Option<String>>,
    /// Course web page link the CEIBA lookup starts from.
    #[serde(skip)]
    pub ceiba_link: Option<String>,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("Serial No.", &self.ser_no),
            ("Department", &self.dptname),
            ("Dept. Code", &self.dpt_code),
            ("Course Code", &self.cou_code),
            ("Class", &self.klass),
            ("Name", &self.cou_cname),
            ("Credit", &self.credit),
            ("Full/Half Year", &self.year),
            ("Required", &self.sel_code),
            ("Teacher", &self.tea_cname),
            ("Add Method", &self.co_select),
            ("Classroom", &self.clsrom),
            ("Restrictions", &self.co_gmark),
            ("Change", &self.co_chg),
            ("Comment", &self.comment),
        ];
        for (label, value) in fields {
            writeln!(
                f,
                "{:<16}: {}",
                label,
                value.as_deref().unwrap_or("None")
            )?;
        }
        writeln!(f, "{:<16}: ", "Schedule")?;
        for entry in &self.tlec {
            writeln!(
                f,
                "> {} {} {}",
                entry.weekday, entry.period, entry.classroom
            )?;
        }
        if let Some(ceiba) = self.ceiba.as_ref() {
            writeln!(
                f,
                "{:<16}: {}",
                "CEIBA",
                ceiba.as_deref().unwrap_or("None")
            )?;
        }
        Ok(())
    }
}

/// One of the fixed number of slots on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseSlot {
    Found(Box<Course>),
    /// The page had no course at this position.
    NotFound,
}

impl CourseSlot {
    pub fn course(&self) -> Option<&Course> {
        match self {
            CourseSlot::Found(course) => Some(course),
            CourseSlot::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CourseSlot::NotFound)
    }
}

impl Serialize for CourseSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CourseSlot::Found(course) => course.serialize(serializer),
            CourseSlot::NotFound => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("not_found", &true)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for CourseSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseSlot::Found(course) => fmt::Display::fmt(course, f),
            CourseSlot::NotFound => writeln!(f, "Not found"),
        }
    }
}

/// A fetched listing page and the slots extracted from it.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub html: String,
    pub slots: Vec<CourseSlot>,
}

impl Page {
    /// Number of real courses on the page.
    pub fn found(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_not_found()).count()
    }

    pub fn is_short(&self) -> bool {
        self.found() < self.slots.len()
    }
}
