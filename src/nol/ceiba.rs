use crate::{nol::Site, utils::query_param, CrawlerError, Transport};
use reqwest::Url;
use tracing::debug;

pub const CEIBA_HOST: &str = "ceiba.ntu.edu.tw";

/// Resolves a course web page link to its CEIBA course id.
///
/// The link redirects either to the CEIBA login page, carrying the id as
/// `csn`, or to `/course/<id>/`. `Ok(None)` means the course has no CEIBA
/// page, which includes links pointing anywhere but CEIBA.
pub(crate) fn resolve<T: Transport>(site: &Site<T>, link: &str) -> Result<Option<String>, CrawlerError> {
    let link = link.trim();
    let link = match link.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => link.to_string(),
    };
    let url = Url::parse(&link).map_err(|e| CrawlerError::InvalidUrl {
        url: link.clone(),
        reason: e.to_string(),
    })?;
    if url.host_str() != Some(CEIBA_HOST) {
        debug!("Not a CEIBA link: {}", url);
        return Ok(None);
    }

    site.retrier().run("CEIBA lookup", || {
        let response = site.transport().probe(&url)?;
        match response.status {
            404 => Ok(None),
            300..=399 => match response.location.as_deref() {
                Some(location) => course_id(&url, location).map(Some),
                None => Err(CrawlerError::Status {
                    url: url.to_string(),
                    status: response.status,
                }),
            },
            status => Err(CrawlerError::Status {
                url: url.to_string(),
                status,
            }),
        }
    })
}

fn course_id(from: &Url, location: &str) -> Result<String, CrawlerError> {
    let unexpected = || CrawlerError::UnexpectedRedirect(location.to_string());
    let target = from.join(location).map_err(|_| unexpected())?;
    if target.scheme() != "https" || target.host_str() != Some(CEIBA_HOST) {
        return Err(unexpected());
    }

    if target.path() == "/login_test.php" {
        return query_param(target.as_str(), "csn")
            .filter(|csn| !csn.is_empty())
            .ok_or_else(unexpected);
    }
    match target.path_segments().map(|s| s.collect::<Vec<_>>()).as_deref() {
        Some(["course", id, ..]) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(unexpected()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CrawlerConfig, HttpResponse, RetryPolicy};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Replays canned responses in order.
    struct Replay {
        responses: RefCell<Vec<HttpResponse>>,
        probed: RefCell<Vec<String>>,
    }

    impl Transport for Replay {
        fn fetch(&self, _: &Url) -> Result<HttpResponse, CrawlerError> {
            unreachable!("CEIBA lookups never follow redirects")
        }

        fn probe(&self, url: &Url) -> Result<HttpResponse, CrawlerError> {
            self.probed.borrow_mut().push(url.to_string());
            Ok(self.responses.borrow_mut().remove(0))
        }
    }

    fn redirect(status: u16, location: Option<&str>) -> HttpResponse {
        HttpResponse {
            status,
            location: location.map(ToString::to_string),
            body: String::new(),
        }
    }

    fn site(responses: Vec<HttpResponse>) -> Site<Replay> {
        let config = CrawlerConfig {
            retry: RetryPolicy::immediate(),
            ..CrawlerConfig::default()
        };
        let replay = Replay {
            responses: RefCell::new(responses),
            probed: RefCell::new(vec![]),
        };
        Site::new(&config, replay).unwrap()
    }

    #[test]
    fn test_login_redirect() {
        let site = site(vec![redirect(
            302,
            Some("https://ceiba.ntu.edu.tw/login_test.php?csn=a1b2c3"),
        )]);
        let id = resolve(&site, "http://ceiba.ntu.edu.tw/1032_10000").unwrap();
        assert_eq!(id, Some("a1b2c3".to_string()));
        assert_eq!(
            site.transport().probed.borrow().as_slice(),
            ["https://ceiba.ntu.edu.tw/1032_10000"]
        );
    }

    #[test]
    fn test_course_redirect() {
        let site = site(vec![redirect(302, Some("/course/9f8e7d/index.htm"))]);
        let id = resolve(&site, "https://ceiba.ntu.edu.tw/1032_10000").unwrap();
        assert_eq!(id, Some("9f8e7d".to_string()));
    }

    #[test]
    fn test_missing_page() {
        let site = site(vec![redirect(404, None)]);
        assert_eq!(resolve(&site, "https://ceiba.ntu.edu.tw/1032_1").unwrap(), None);
    }

    #[test]
    fn test_server_errors_are_retried() {
        let site = site(vec![
            redirect(500, None),
            redirect(302, None),
            redirect(302, Some("https://ceiba.ntu.edu.tw/course/abc/")),
        ]);
        let id = resolve(&site, "https://ceiba.ntu.edu.tw/1032_1").unwrap();
        assert_eq!(id, Some("abc".to_string()));
        assert_eq!(site.retrier().retries(), 2);
    }

    #[test]
    fn test_links_outside_ceiba_are_not_requested() {
        let site = site(vec![]);
        assert_eq!(resolve(&site, "http://www.csie.ntu.edu.tw/~lin/ds.html").unwrap(), None);
        assert_eq!(resolve(&site, "https://ceiba.ntu.edu.tw.example/1032_1").unwrap(), None);
        assert!(site.transport().probed.borrow().is_empty());
        assert_eq!(site.retrier().retries(), 0);
    }

    #[test]
    fn test_unexpected_redirect_is_permanent() {
        let site = site(vec![redirect(302, Some("https://www.ntu.edu.tw/"))]);
        let err = resolve(&site, "https://ceiba.ntu.edu.tw/1032_1").unwrap_err();
        assert!(matches!(err, CrawlerError::UnexpectedRedirect(_)));
        assert_eq!(site.retrier().retries(), 0);
    }
}
