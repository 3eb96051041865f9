use reqwest::Url;
use scraper::ElementRef;

/// Element text with surrounding whitespace and `&nbsp;` removed.
pub(crate) fn clean_text(el: ElementRef) -> String {
    trim_nbsp(&el.text().collect::<String>()).to_string()
}

pub(crate) fn trim_nbsp(s: &str) -> &str {
    s.trim_matches(|c: char| c == '\u{a0}' || c.is_whitespace())
}

/// Value of `key` in the query string of `link`, which may be relative.
pub(crate) fn query_param(link: &str, key: &str) -> Option<String> {
    let base = Url::parse("https://localhost/").ok()?;
    let url = base.join(link.trim()).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trim_nbsp() {
        assert_eq!(trim_nbsp("\u{a0} 3 \u{a0}"), "3");
        assert_eq!(trim_nbsp("\u{a0}"), "");
    }

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param("print_table.php?course_id=902%2010750&dpt_code=9020&ser_no=12345", "dpt_code"),
            Some("9020".to_string())
        );
        assert_eq!(
            query_param("https://ceiba.ntu.edu.tw/login_test.php?csn=abc123", "csn"),
            Some("abc123".to_string())
        );
        assert_eq!(query_param("print_table.php?ser_no=1", "dpt_code"), None);
    }
}
