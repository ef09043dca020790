//! Cursor-paginated result sets

use serde::{Deserialize, Serialize};

/// One page of a set: the elements plus an opaque continuation cursor.
///
/// `after == None` means the set is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E> {
    /// Elements of this page, in server order
    pub data: Vec<E>,
    /// Cursor for the next page
    pub after: Option<String>,
    #[serde(default = "materialized_by_default")]
    materialized: bool,
}

fn materialized_by_default() -> bool {
    true
}

impl<E> Page<E> {
    /// Create a page
    pub fn new(data: Vec<E>, after: Option<String>) -> Self {
        Self {
            data,
            after,
            materialized: true,
        }
    }

    /// A one-element page with no continuation
    pub fn single(element: E) -> Self {
        Self {
            data: vec![element],
            after: None,
            materialized: true,
        }
    }

    /// An empty page that only carries a cursor (an unmaterialized set)
    pub fn unmaterialized(after: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            after: Some(after.into()),
            materialized: false,
        }
    }

    /// Check whether the elements were sent; `false` for a bare `@set` cursor
    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// Check whether more pages can be fetched
    pub fn has_next(&self) -> bool {
        self.after.is_some()
    }

    /// Number of elements on this page
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this page has no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Map every element, keeping the cursor
    pub fn map<F, U>(self, f: F) -> Page<U>
    where
        F: FnMut(E) -> U,
    {
        Page {
            data: self.data.into_iter().map(f).collect(),
            after: self.after,
            materialized: self.materialized,
        }
    }
}

impl<E> Default for Page<E> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            after: None,
            materialized: true,
        }
    }
}

impl<E> IntoIterator for Page<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_has_no_cursor() {
        let page = Page::single(99);
        assert_eq!(page.len(), 1);
        assert!(!page.has_next());
    }

    #[test]
    fn test_unmaterialized_page() {
        let page: Page<i32> = Page::unmaterialized("abc");
        assert!(page.is_empty());
        assert_eq!(page.after.as_deref(), Some("abc"));
        assert!(!page.is_materialized());
        assert_ne!(page, Page::new(Vec::new(), Some("abc".into())));
    }

    #[test]
    fn test_map_keeps_cursor() {
        let page = Page::new(vec![1, 2], Some("next".into())).map(|x| x * 10);
        assert_eq!(page.data, vec![10, 20]);
        assert_eq!(page.after.as_deref(), Some("next"));
        assert_eq!(page.into_iter().sum::<i32>(), 30);
    }
}
