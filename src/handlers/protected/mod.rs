pub mod access;
pub mod projects;

use serde::Deserialize;

use crate::services::visibility::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

/// `?page=&page_size=` as raw strings; unparseable values fall back to defaults
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        parse_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn page_size(&self) -> i64 {
        parse_or(self.page_size.as_deref(), DEFAULT_PAGE_SIZE)
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_garbage_values_use_defaults() {
        let query = PageQuery {
            page: Some("abc".to_string()),
            page_size: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 10);
    }

    #[test]
    fn numeric_values_pass_through_unnormalized() {
        let query = PageQuery {
            page: Some("3".to_string()),
            page_size: Some("-2".to_string()),
        };
        assert_eq!(query.page(), 3);
        assert_eq!(query.page_size(), -2);
    }
}
