use crate::Semester;

#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Unexpected page layout at {url}: {reason}")]
    Layout { url: String, reason: &'static str },

    #[error("Invalid semester key {0:?}")]
    InvalidSemester(String),

    #[error("No such semester {0}")]
    SemesterNotFound(Semester),

    #[error("Course index {index} out of range ({count} courses in {semester})")]
    IndexOutOfRange {
        semester: Semester,
        index: usize,
        count: usize,
    },

    #[error("Invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unexpected CEIBA redirect to {0}")]
    UnexpectedRedirect(String),

    #[error("Gave up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<CrawlerError>,
    },
}

impl CrawlerError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CrawlerError::Transport(_) | CrawlerError::Status { .. } | CrawlerError::Layout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let status = CrawlerError::Status {
            url: "https://nol.example/".to_string(),
            status: 503,
        };
        assert!(status.is_transient());

        let layout = CrawlerError::Layout {
            url: "https://nol.example/".to_string(),
            reason: "missing semester selector",
        };
        assert!(layout.is_transient());

        assert!(!CrawlerError::InvalidSemester("abc".to_string()).is_transient());
        assert!(!CrawlerError::UnexpectedRedirect("https://x/".to_string()).is_transient());
        assert!(!CrawlerError::RetriesExhausted {
            attempts: 3,
            last: Box::new(status),
        }
        .is_transient());
    }
}
