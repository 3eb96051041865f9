pub mod nol;
pub mod period;

mod config;
mod error;
mod retry;
mod semester;
mod transport;
mod utils;

pub use config::{CrawlerConfig, DEFAULT_BASE_URL};
pub use error::CrawlerError;
pub use nol::{Course, CourseSlot, NolCrawler, Page, ScheduleEntry, Site};
pub use period::{Period, PeriodMapper, TeachingSlot};
pub use retry::{Retrier, RetryPolicy};
pub use semester::Semester;
pub use transport::{HttpResponse, HttpTransport, Transport, TransportOptions};

/// Courses per listing page.
pub const PAGE_SIZE: usize = 15;

/// Listing page holding the course at `index`.
pub fn page_of(index: usize) -> usize {
    index / PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_of() {
        assert_eq!(page_of(0), 0);
        assert_eq!(page_of(14), 0);
        assert_eq!(page_of(15), 1);
        assert_eq!(page_of(44), 2);
        for i in 0..200 {
            assert_eq!(page_of(i), i / PAGE_SIZE);
            assert!(page_of(i) * PAGE_SIZE <= i && i < (page_of(i) + 1) * PAGE_SIZE);
        }
    }
}
