use crate::{
    nol::{Course, CourseSlot, ScheduleEntry},
    utils::{clean_text, query_param, trim_nbsp},
    PAGE_SIZE,
};
use itertools::Itertools;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

const E: &str = "Invalid selector";
lazy_static! {
    static ref LISTING: Selector = Selector::parse("body > table:nth-of-type(4)").expect(E);
    static ref A: Selector = Selector::parse("a").expect(E);
    static ref CANCELLED: Selector = Selector::parse(r#"img[src$="cancel.gif"]"#).expect(E);
    static ref CHANGED: Selector = Selector::parse(r#"img[src$="chg.gif"]"#).expect(E);
}

const WEEKDAYS: &str = "一二三四五六日";

// Listing columns.
const SER_NO: usize = 0;
const DPTNAME: usize = 1;
const KLASS: usize = 3;
const COU_CNAME: usize = 4;
const CREDIT: usize = 5;
const COU_CODE: usize = 6;
const YEAR: usize = 7;
const SEL_CODE: usize = 8;
const TEA_CNAME: usize = 9;
const CO_SELECT: usize = 10;
const TLEC: usize = 11;
const CO_GMARK: usize = 13;
const COMMENT: usize = 14;
const CEIBA: usize = 15;

/// Extracts exactly [`PAGE_SIZE`] slots from a listing page.
///
/// Returns `None` when the listing table itself is missing, which the
/// site only does on error pages.
pub fn extract_page(doc: &Html) -> Option<Vec<CourseSlot>> {
    let table = doc.select(&LISTING).next()?;
    let mut slots: Vec<CourseSlot> = table_rows(table)
        .skip(1)
        .take(PAGE_SIZE)
        .map(extract_row)
        .collect();
    slots.resize(PAGE_SIZE, CourseSlot::NotFound);
    Some(slots)
}

/// Rows belonging to `table` itself, leaving out rows of tables nested in
/// its cells.
fn table_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .flat_map(|el| match el.value().name() {
            "tr" => vec![el],
            "thead" | "tbody" | "tfoot" => el
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|row| row.value().name() == "tr")
                .collect(),
            _ => vec![],
        })
}

fn extract_row(row: ElementRef) -> CourseSlot {
    let cells: Vec<ElementRef> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect();
    if cells.is_empty() || cells.iter().all(|c| clean_text(*c).is_empty()) {
        return CourseSlot::NotFound;
    }

    let text = |i: usize| cells.get(i).map(|c| clean_text(*c));
    let link = |i: usize| cells.get(i).and_then(|c| first_link(*c));

    let tlec = cells
        .get(TLEC)
        .map(|c| parse_schedule(&c.text().collect::<String>()))
        .unwrap_or_default();
    let clsrom = cells.get(TLEC).map(|_| {
        tlec.iter()
            .map(|e| e.classroom.as_str())
            .filter(|c| !c.is_empty())
            .unique()
            .join(",")
    });

    let co_chg = if row.select(&CANCELLED).next().is_some() {
        "停開"
    } else if row.select(&CHANGED).next().is_some() {
        "異動"
    } else {
        ""
    };

    let course = Course {
        ser_no: text(SER_NO),
        dpt_code: link(COU_CNAME).and_then(|href| query_param(&href, "dpt_code")),
        cou_code: text(COU_CODE),
        credit: text(CREDIT),
        co_select: text(CO_SELECT),
        cou_cname: link_text(&cells, COU_CNAME),
        tea_cname: link_text(&cells, TEA_CNAME),
        clsrom,
        sel_code: text(SEL_CODE),
        co_gmark: text(CO_GMARK),
        co_chg: Some(co_chg.to_string()),
        year: text(YEAR),
        comment: text(COMMENT),
        tlec,
        klass: text(KLASS),
        dptname: text(DPTNAME),
        ceiba: None,
        ceiba_link: link(CEIBA),
    };
    CourseSlot::Found(Box::new(course))
}

fn first_link(cell: ElementRef) -> Option<String> {
    let a = cell.select(&A).next()?;
    a.value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(ToString::to_string)
}

/// Link text when the cell holds a link, the cell text otherwise.
fn link_text(cells: &[ElementRef], i: usize) -> Option<String> {
    let cell = *cells.get(i)?;
    match cell.select(&A).next() {
        Some(a) => Some(clean_text(a)),
        None => Some(clean_text(cell)),
    }
}

/// Splits the time/classroom column into entries.
///
/// The column reads like `二7,8,9(資102) 四A(新303)`: each entry starts at
/// a weekday character, lists periods, then a parenthesized classroom.
/// Any part may be missing, in which case it is left blank.
pub fn parse_schedule(text: &str) -> BTreeSet<ScheduleEntry> {
    let mut segments: Vec<String> = vec![];
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '(' | '（' => depth += 1,
            ')' | '）' => depth = depth.saturating_sub(1),
            _ => {}
        }
        let starts_entry = depth == 0 && WEEKDAYS.contains(ch);
        match segments.last_mut() {
            Some(segment) if !starts_entry => segment.push(ch),
            _ => segments.push(ch.to_string()),
        }
    }

    let mut entries = BTreeSet::new();
    for segment in &segments {
        let segment = trim_nbsp(segment);
        if segment.is_empty() {
            continue;
        }
        let (weekday, rest) = match segment.chars().next() {
            Some(ch) if WEEKDAYS.contains(ch) => (ch.to_string(), &segment[ch.len_utf8()..]),
            _ => (String::new(), segment),
        };

        let (periods, classroom) = match rest.find(|c: char| c == '(' || c == '（') {
            Some(open) => {
                let inner = &rest[open..];
                let inner = inner[inner.chars().next().map_or(0, char::len_utf8)..]
                    .trim_end_matches(|c: char| c == ')' || c == '）' || c.is_whitespace());
                (&rest[..open], trim_nbsp(inner))
            }
            None if weekday.is_empty() => ("", rest),
            None => (rest, ""),
        };

        let periods: Vec<&str> = periods
            .split(|c: char| c == ',' || c == '、' || c == '，')
            .map(trim_nbsp)
            .filter(|p| !p.is_empty())
            .collect();
        if periods.is_empty() {
            entries.insert(ScheduleEntry::new(&weekday, "", classroom));
        }
        for period in periods {
            entries.insert(ScheduleEntry::new(&weekday, period, classroom));
        }
    }
    entries
}
