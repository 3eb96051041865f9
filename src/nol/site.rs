use crate::{CrawlerConfig, CrawlerError, Retrier, Semester, Transport, PAGE_SIZE};
use lazy_regex::regex_find;
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

const E: &str = "Invalid selector";
lazy_static! {
    static ref SEMESTER_SELECT: Selector = Selector::parse("select#select_sem").expect(E);
    static ref OPTION: Selector = Selector::parse("option").expect(E);
    static ref SELECTED_OPTION: Selector = Selector::parse("option[selected]").expect(E);
}

/// Query arguments the search page expects on every request.
const BASE_ARGS: [(&str, &str); 4] = [
    ("allproced", "yes"),
    ("alltime", "yes"),
    ("csname", ""),
    ("cstype", "1"),
];

/// The course search site: URL scheme, transport and retry policy.
pub struct Site<T: Transport> {
    base_url: Url,
    transport: T,
    retrier: Retrier,
}

impl<T: Transport> Site<T> {
    pub fn new(config: &CrawlerConfig, transport: T) -> Result<Self, CrawlerError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| CrawlerError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Site {
            base_url,
            transport,
            retrier: Retrier::new(config.retry.clone()),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retrier(&self) -> &Retrier {
        &self.retrier
    }

    pub fn index_url(&self, semester: Option<Semester>) -> Url {
        let mut args: Vec<(&str, String)> = BASE_ARGS
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        if let Some(semester) = semester {
            args.push(("current_sem", semester.site_key()));
        }
        let mut url = self.base_url.clone();
        url.query_pairs_mut().clear().extend_pairs(args);
        url
    }

    pub fn page_url(&self, semester: Semester, page: usize) -> Url {
        let mut url = self.index_url(Some(semester));
        url.query_pairs_mut()
            .append_pair("startrec", &(page * PAGE_SIZE).to_string());
        url
    }

    /// Fetches `url` and runs `parse` on the document, retrying both the
    /// request and any transient parse failure.
    pub(crate) fn get_parsed<R, F>(&self, what: &str, url: &Url, parse: F) -> Result<R, CrawlerError>
    where
        F: Fn(&str, &Html) -> Result<R, CrawlerError>,
    {
        self.retrier.run(what, || {
            let body = self.transport.fetch(url)?.into_body(url)?;
            let doc = Html::parse_document(&body);
            parse(&body, &doc)
        })
    }

    /// Every semester in the site's selector, in the site's order.
    pub fn list_semesters(&self) -> Result<Vec<Semester>, CrawlerError> {
        let url = self.index_url(None);
        self.get_parsed("semester list", &url, |_, doc| {
            let select = semester_select(doc, &url)?;
            Ok(semester_options(select))
        })
    }

    /// The semester the site currently preselects.
    pub fn default_semester(&self) -> Result<Semester, CrawlerError> {
        let url = self.index_url(None);
        let semester = self.get_parsed("default semester", &url, |_, doc| {
            let select = semester_select(doc, &url)?;
            let option = select.select(&SELECTED_OPTION).next().ok_or(CrawlerError::Layout {
                url: url.to_string(),
                reason: "no preselected semester",
            })?;
            Semester::from_site_key(option.value().attr("value").unwrap_or_default())
        })?;
        info!("Default semester {}", semester);
        Ok(semester)
    }

    /// Number of courses the site lists for `semester`.
    pub fn course_count(&self, semester: Semester) -> Result<usize, CrawlerError> {
        let url = self.index_url(Some(semester));
        let count = self.get_parsed("course count", &url, |_, doc| {
            let select = semester_select(doc, &url)?;
            if !semester_options(select).contains(&semester) {
                return Err(CrawlerError::SemesterNotFound(semester));
            }
            match listed_count(select) {
                Some(0) => Err(CrawlerError::SemesterNotFound(semester)),
                Some(count) => Ok(count),
                None => Err(CrawlerError::Layout {
                    url: url.to_string(),
                    reason: "no course count",
                }),
            }
        })?;
        info!("{} courses in {}", count, semester);
        Ok(count)
    }
}

fn semester_select<'a>(doc: &'a Html, url: &Url) -> Result<ElementRef<'a>, CrawlerError> {
    doc.select(&SEMESTER_SELECT)
        .next()
        .ok_or(CrawlerError::Layout {
            url: url.to_string(),
            reason: "no semester selector",
        })
}

fn semester_options(select: ElementRef) -> Vec<Semester> {
    select
        .select(&OPTION)
        .filter_map(|option| {
            let value = option.value().attr("value")?;
            match Semester::from_site_key(value) {
                Ok(semester) => Some(semester),
                Err(e) => {
                    warn!("Skip semester option: {}", e);
                    None
                }
            }
        })
        .collect()
}

/// The count printed right after the semester selector.
fn listed_count(select: ElementRef) -> Option<usize> {
    let counter = select.next_siblings().find_map(ElementRef::wrap)?;
    let text: String = match counter.children().find_map(ElementRef::wrap) {
        Some(inner) => inner.text().collect(),
        None => counter.text().collect(),
    };
    regex_find!(r"\d+", &text)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpResponse;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, fs};

    struct StaticSite {
        body: String,
        requests: RefCell<Vec<String>>,
    }

    impl StaticSite {
        fn new(file: &str) -> Self {
            StaticSite {
                body: fs::read_to_string(format!("tests/htmls/{}", file)).expect("Invalid file path"),
                requests: RefCell::new(vec![]),
            }
        }
    }

    impl Transport for StaticSite {
        fn fetch(&self, url: &Url) -> Result<HttpResponse, CrawlerError> {
            self.requests.borrow_mut().push(url.to_string());
            Ok(HttpResponse {
                status: 200,
                location: None,
                body: self.body.clone(),
            })
        }

        fn probe(&self, url: &Url) -> Result<HttpResponse, CrawlerError> {
            self.fetch(url)
        }
    }

    fn site(file: &str) -> Site<StaticSite> {
        Site::new(&CrawlerConfig::default(), StaticSite::new(file)).unwrap()
    }

    fn sem(s: &str) -> Semester {
        s.parse().unwrap()
    }

    #[test]
    fn test_urls() {
        let site = site("index.html");
        assert_eq!(
            site.index_url(None).as_str(),
            "https://nol.ntu.edu.tw/nol/coursesearch/search_result.php?allproced=yes&alltime=yes&csname=&cstype=1"
        );
        assert_eq!(
            site.page_url(sem("103-2"), 2).as_str(),
            "https://nol.ntu.edu.tw/nol/coursesearch/search_result.php?allproced=yes&alltime=yes&csname=&cstype=1&current_sem=103-2&startrec=30"
        );
    }

    #[test]
    fn test_list_semesters() {
        let site = site("index.html");
        let keys: Vec<String> = site
            .list_semesters()
            .unwrap()
            .iter()
            .map(Semester::to_string)
            .collect();
        assert_eq!(keys, vec!["104-1", "103-2", "103-1", "102-2"]);
    }

    #[test]
    fn test_default_semester() {
        assert_eq!(site("index.html").default_semester().unwrap(), sem("103-2"));
    }

    #[test]
    fn test_course_count() {
        let site = site("index.html");
        assert_eq!(site.course_count(sem("103-2")).unwrap(), 23);
        assert!(site.transport().requests.borrow()[0].ends_with("&current_sem=103-2"));
    }

    #[test]
    fn test_unknown_semester_is_permanent() {
        let site = site("index.html");
        let err = site.course_count(sem("90-1")).unwrap_err();
        assert!(matches!(err, CrawlerError::SemesterNotFound(_)));
        assert_eq!(site.transport().requests.borrow().len(), 1);
        assert_eq!(site.retrier().retries(), 0);
    }

    #[test]
    fn test_zero_count_is_permanent() {
        let site = site("index_empty.html");
        let err = site.course_count(sem("103-2")).unwrap_err();
        assert!(matches!(err, CrawlerError::SemesterNotFound(_)));
        assert_eq!(site.retrier().retries(), 0);
    }

    #[test]
    fn test_invalid_base_url() {
        let config = CrawlerConfig {
            base_url: "not a url".to_string(),
            ..CrawlerConfig::default()
        };
        assert!(matches!(
            Site::new(&config, StaticSite::new("index.html")),
            Err(CrawlerError::InvalidUrl { .. })
        ));
    }
}
