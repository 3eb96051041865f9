use crate::{period::DEFAULT_PERIOD_BOUNDARY, RetryPolicy, Semester, TransportOptions};

pub const DEFAULT_BASE_URL: &str = "https://nol.ntu.edu.tw/nol/coursesearch/search_result.php";

/// Everything a crawler needs besides the semester.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub base_url: String,
    /// Look up each course's CEIBA page.
    pub enrich: bool,
    pub period_boundary: Semester,
    pub retry: RetryPolicy,
    pub transport: TransportOptions,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            enrich: false,
            period_boundary: DEFAULT_PERIOD_BOUNDARY,
            retry: RetryPolicy::default(),
            transport: TransportOptions::default(),
        }
    }
}
