use crate::{
    nol::{ceiba, extract_page, CourseSlot, Page, Site},
    page_of, CrawlerConfig, CrawlerError, HttpTransport, Period, PeriodMapper, Semester, Transport,
    PAGE_SIZE,
};
use std::collections::HashMap;
use tracing::{debug, info};

type PageKey = (Semester, usize);

/// Crawls the course listing of one semester.
///
/// Pages are fetched on first access and kept until flushed. The cache is
/// plain owned state; share a crawler between threads only behind your
/// own lock.
pub struct NolCrawler<T: Transport = HttpTransport> {
    semester: Semester,
    site: Site<T>,
    enrich: bool,
    periods: PeriodMapper,
    cache: HashMap<PageKey, Page>,
    course_count: Option<usize>,
}

impl NolCrawler<HttpTransport> {
    pub fn new(semester: Semester, config: &CrawlerConfig) -> Result<Self, CrawlerError> {
        let transport = HttpTransport::new(&config.transport)?;
        NolCrawler::with_transport(semester, config, transport)
    }
}

impl<T: Transport> NolCrawler<T> {
    pub fn with_transport(
        semester: Semester,
        config: &CrawlerConfig,
        transport: T,
    ) -> Result<Self, CrawlerError> {
        Ok(NolCrawler {
            semester,
            site: Site::new(config, transport)?,
            enrich: config.enrich,
            periods: PeriodMapper::new(config.period_boundary),
            cache: HashMap::new(),
            course_count: None,
        })
    }

    pub fn semester(&self) -> Semester {
        self.semester
    }

    pub fn site(&self) -> &Site<T> {
        &self.site
    }

    /// Retries performed by this crawler so far.
    pub fn retries(&self) -> u64 {
        self.site.retrier().retries()
    }

    /// Course count of the crawler's semester, fetched once.
    pub fn course_count(&mut self) -> Result<usize, CrawlerError> {
        match self.course_count {
            Some(count) => Ok(count),
            None => {
                let count = self.site.course_count(self.semester)?;
                self.course_count = Some(count);
                Ok(count)
            }
        }
    }

    pub fn get_course(&mut self, index: usize) -> Result<&CourseSlot, CrawlerError> {
        let count = self.course_count()?;
        if index >= count {
            return Err(CrawlerError::IndexOutOfRange {
                semester: self.semester,
                index,
                count,
            });
        }

        let key = (self.semester, page_of(index));
        if !self.cache.contains_key(&key) {
            let page = self.load_page(key.1)?;
            self.cache.insert(key, page);
        }
        Ok(&self.cache[&key].slots[index % PAGE_SIZE])
    }

    pub fn page(&self, page: usize) -> Option<&Page> {
        self.cache.get(&(self.semester, page))
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    pub fn flush_cache(&mut self, page: usize) {
        if self.cache.remove(&(self.semester, page)).is_some() {
            debug!("Flush page {} of {}", page, self.semester);
        }
    }

    pub fn flush_cache_all(&mut self) {
        self.cache.clear();
    }

    /// Period codes as understood in this crawler's semester.
    pub fn canonical_periods<S: AsRef<str>>(&self, raw: &[S]) -> Vec<Period> {
        self.periods.canonicalize(self.semester, raw)
    }

    pub fn period_mapper(&self) -> &PeriodMapper {
        &self.periods
    }

    fn load_page(&self, index: usize) -> Result<Page, CrawlerError> {
        let url = self.site.page_url(self.semester, index);
        let mut page = self.site.get_parsed("listing page", &url, |body, doc| {
            let slots = extract_page(doc).ok_or(CrawlerError::Layout {
                url: url.to_string(),
                reason: "no listing table",
            })?;
            Ok(Page {
                index,
                html: body.to_string(),
                slots,
            })
        })?;

        if self.enrich {
            for slot in page.slots.iter_mut() {
                if let CourseSlot::Found(course) = slot {
                    let id = match course.ceiba_link.as_deref() {
                        Some(link) => ceiba::resolve(&self.site, link)?,
                        None => None,
                    };
                    course.ceiba = Some(id);
                }
            }
        }

        if page.is_short() {
            debug!(
                "Page {} of {} holds {} of {} courses",
                index,
                self.semester,
                page.found(),
                PAGE_SIZE
            );
        }
        info!("Loaded page {} of {}", index, self.semester);
        Ok(page)
    }
}
