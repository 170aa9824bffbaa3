//! Page arithmetic for listings.
//!
//! HTML listings resolve page tokens leniently: anything unusable lands on a
//! valid page. The REST API resolves them strictly and rejects bad tokens.

use serde::Serialize;
use thiserror::Error;

/// Page size of the public job list.
pub const JOBS_PER_PAGE: i64 = 10;
/// Page size of the resume directory.
pub const RESUMES_PER_PAGE: i64 = 5;
/// Page size of every REST resource.
pub const API_PAGE_SIZE: i64 = 20;

/// Strict page resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Invalid page number: {0:?} is not an integer")]
    NotAnInteger(String),

    #[error("Invalid page number: {page} is outside 1..={last}")]
    OutOfRange { page: i64, last: i64 },
}

/// LIMIT/OFFSET for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

/// Splits `count` items into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub count: i64,
    pub per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty collection still has one (empty) page.
    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            return 1;
        }
        (self.count + self.per_page - 1) / self.per_page
    }

    /// Resolve a page token, falling back instead of failing.
    ///
    /// Missing or non-integer tokens give page 1; integers outside the range give the last page.
    pub fn resolve_lenient(&self, token: Option<&str>) -> i64 {
        let last = self.num_pages();
        let Some(raw) = token.map(str::trim) else {
            return 1;
        };
        match raw.parse::<i64>() {
            Ok(page) if (1..=last).contains(&page) => page,
            Ok(_) => last,
            // Integers too large for i64 are still out of range.
            Err(_) if is_integer_literal(raw) => last,
            Err(_) => 1,
        }
    }

    /// Resolve a page token, rejecting anything but an in-range integer.
    ///
    /// A missing token is page 1.
    pub fn resolve_strict(&self, token: Option<&str>) -> Result<i64, PageError> {
        let Some(raw) = token else {
            return Ok(1);
        };
        let page: i64 = raw
            .trim()
            .parse()
            .map_err(|_| PageError::NotAnInteger(raw.to_string()))?;
        let last = self.num_pages();
        if !(1..=last).contains(&page) {
            return Err(PageError::OutOfRange { page, last });
        }
        Ok(page)
    }

    /// LIMIT/OFFSET for an already resolved page number.
    pub fn window(&self, page: i64) -> PageWindow {
        PageWindow {
            limit: self.per_page,
            offset: (page.max(1) - 1) * self.per_page,
        }
    }

    /// Wrap the fetched items for `page`.
    pub fn page<T>(&self, number: i64, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            count: self.count,
            per_page: self.per_page,
        }
    }
}

/// Optional sign followed by at least one ASCII digit.
fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<i64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<i64> {
        self.has_previous().then_some(self.number - 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_pages() {
        assert_eq!(Paginator::new(0, 10).num_pages(), 1);
        assert_eq!(Paginator::new(10, 10).num_pages(), 1);
        assert_eq!(Paginator::new(11, 10).num_pages(), 2);
        assert_eq!(Paginator::new(20, 10).num_pages(), 2);
    }

    #[test]
    fn test_lenient_resolution_never_fails() {
        let pager = Paginator::new(25, 10);
        assert_eq!(pager.resolve_lenient(None), 1);
        assert_eq!(pager.resolve_lenient(Some("abc")), 1);
        assert_eq!(pager.resolve_lenient(Some("2")), 2);
        assert_eq!(pager.resolve_lenient(Some("999")), 3);
        assert_eq!(pager.resolve_lenient(Some("0")), 3);
        assert_eq!(pager.resolve_lenient(Some("-4")), 3);
        assert_eq!(pager.resolve_lenient(Some("99999999999999999999")), 3);
        assert_eq!(pager.resolve_lenient(Some("-99999999999999999999")), 3);
        assert_eq!(pager.resolve_lenient(Some("1e3")), 1);
        assert_eq!(pager.resolve_lenient(Some("-")), 1);
    }

    #[test]
    fn test_strict_resolution() {
        let pager = Paginator::new(25, 20);
        assert_eq!(pager.resolve_strict(None), Ok(1));
        assert_eq!(pager.resolve_strict(Some("2")), Ok(2));
        assert!(matches!(pager.resolve_strict(Some("x")), Err(PageError::NotAnInteger(_))));
        assert_eq!(
            pager.resolve_strict(Some("3")),
            Err(PageError::OutOfRange { page: 3, last: 2 })
        );
        assert!(pager.resolve_strict(Some("0")).is_err());
    }

    #[test]
    fn test_window_and_navigation() {
        let pager = Paginator::new(25, 10);
        assert_eq!(pager.window(3), PageWindow { limit: 10, offset: 20 });

        let first = pager.page(1, vec![1, 2, 3]);
        assert!(first.has_next());
        assert!(!first.has_previous());
        assert_eq!(first.next_page_number(), Some(2));

        let last = pager.page(3, vec![21]);
        assert!(!last.has_next());
        assert_eq!(last.previous_page_number(), Some(2));
    }
}
