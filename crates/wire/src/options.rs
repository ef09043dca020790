//! Reader configuration

/// Options controlling how a [`TaggedReader`](crate::TaggedReader) parses input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Maximum container nesting before decoding fails
    pub max_depth: usize,
    /// Accept plain JSON numbers in place of `@int`/`@long`/`@double` tags
    pub allow_bare_numbers: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            max_depth: 128,
            allow_bare_numbers: true,
        }
    }
}

impl ReaderOptions {
    /// Strict options - only tagged numbers, default depth limit
    pub fn strict() -> Self {
        ReaderOptions {
            allow_bare_numbers: false,
            ..Default::default()
        }
    }

    /// Lenient options - bare numbers and deep nesting allowed
    pub fn lenient() -> Self {
        ReaderOptions {
            max_depth: 1024,
            allow_bare_numbers: true,
        }
    }

    /// Override the nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
