//! Configuration options for Transit writing.
//!
//! [`TransitOptions`] controls how the marshaling engine packs values:
//!
//! - **prefer strings**: scalar values whose representation is not a string are
//!   written as prefixed strings (`"~m1482000000000"`) instead of tagged arrays
//!   (`["~#m", 1482000000000]`). This is what Transit JSON does.
//! - **caching**: repeated map keys and tagged strings are replaced by cache codes.
//! - **depth limit**: guards the recursive walk against pathological nesting.
//!
//! ## Examples
//!
//! ```rust
//! use serde_transit::{to_string_with_options, TransitOptions};
//!
//! let options = TransitOptions::new().with_caching(false);
//! let transit = to_string_with_options(&vec![1, 2, 3], options).unwrap();
//! assert_eq!(transit, "[1,2,3]");
//! ```

/// Default nesting limit for the recursive walk.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration options for a Transit [`Writer`](crate::Writer).
///
/// # Examples
///
/// ```rust
/// use serde_transit::TransitOptions;
///
/// // Transit JSON defaults
/// let options = TransitOptions::new();
/// assert!(options.prefer_strings);
///
/// // Tagged arrays for non-string scalars, no caching, unlimited nesting
/// let options = TransitOptions::new()
///     .with_prefer_strings(false)
///     .with_caching(false)
///     .without_depth_limit();
/// assert_eq!(options.max_depth, None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitOptions {
    pub prefer_strings: bool,
    pub caching: bool,
    pub max_depth: Option<usize>,
}

impl Default for TransitOptions {
    fn default() -> Self {
        TransitOptions {
            prefer_strings: true,
            caching: true,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl TransitOptions {
    /// Creates the Transit JSON defaults (prefer strings, caching on, depth 512).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether non-string scalar representations are packed into prefixed strings.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::TransitOptions;
    ///
    /// let options = TransitOptions::new().with_prefer_strings(false);
    /// assert!(!options.prefer_strings);
    /// ```
    #[must_use]
    pub fn with_prefer_strings(mut self, prefer_strings: bool) -> Self {
        self.prefer_strings = prefer_strings;
        self
    }

    /// Enables or disables the rolling write cache.
    #[must_use]
    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Sets the maximum nesting depth.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_transit::TransitOptions;
    ///
    /// let options = TransitOptions::new().with_max_depth(16);
    /// assert_eq!(options.max_depth, Some(16));
    /// ```
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Removes the nesting guard entirely.
    #[must_use]
    pub fn without_depth_limit(mut self) -> Self {
        self.max_depth = None;
        self
    }
}
