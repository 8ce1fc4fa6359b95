//! Write-side string caching.
//!
//! Transit replaces repeated map keys and tagged strings with short cache codes
//! (`^0`, `^1`, ... `^~~`). The marshaling engine only depends on [`WriteCache`];
//! [`RollingCache`] implements the standard Transit policy and [`NoopCache`] turns
//! caching off. A cache lives for exactly one top-level write.

use crate::escape::{ESC, SUB, TAG};
use std::borrow::Cow;
use std::collections::HashMap;

/// Strings shorter than this are never cached.
pub const MIN_SIZE_CACHEABLE: usize = 4;

/// Number of digits in the cache code alphabet.
pub const CACHE_CODE_DIGITS: usize = 44;

/// Cache capacity before it is cleared and numbering restarts.
pub const MAX_CACHE_ENTRIES: usize = CACHE_CODE_DIGITS * CACHE_CODE_DIGITS;

const BASE_CHAR_INDEX: u8 = 48;

/// The cache contract the marshaling engine consults for every emitted string.
pub trait WriteCache {
    /// Whether `s` may be replaced by a cache code in this position.
    fn is_cacheable(&self, s: &str, as_map_key: bool) -> bool;

    /// Returns the cache code for `s` if it has been seen, otherwise records it and
    /// returns `s` unchanged.
    fn write<'s>(&mut self, s: &'s str) -> Cow<'s, str>;
}

/// The standard Transit rolling write cache.
///
/// # Examples
///
/// ```rust
/// use serde_transit::cache::{RollingCache, WriteCache};
///
/// let mut cache = RollingCache::new();
/// assert!(cache.is_cacheable("name", true));
/// assert_eq!(cache.write("name"), "name");
/// assert_eq!(cache.write("name"), "^0");
/// ```
#[derive(Debug, Default)]
pub struct RollingCache {
    codes: HashMap<String, String>,
}

impl RollingCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl WriteCache for RollingCache {
    fn is_cacheable(&self, s: &str, as_map_key: bool) -> bool {
        // length in characters, not bytes
        s.chars().nth(MIN_SIZE_CACHEABLE - 1).is_some()
            && (as_map_key || is_cacheable_prefix(s))
    }

    fn write<'s>(&mut self, s: &'s str) -> Cow<'s, str> {
        if let Some(code) = self.codes.get(s) {
            return Cow::Owned(code.clone());
        }
        if self.codes.len() == MAX_CACHE_ENTRIES {
            tracing::trace!(entries = MAX_CACHE_ENTRIES, "write cache full, resetting");
            self.codes.clear();
        }
        let code = index_to_code(self.codes.len());
        self.codes.insert(s.to_string(), code);
        Cow::Borrowed(s)
    }
}

/// A cache that never caches anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl WriteCache for NoopCache {
    fn is_cacheable(&self, _s: &str, _as_map_key: bool) -> bool {
        false
    }

    fn write<'s>(&mut self, s: &'s str) -> Cow<'s, str> {
        Cow::Borrowed(s)
    }
}

// tagged values, symbols and keywords
fn is_cacheable_prefix(s: &str) -> bool {
    s.strip_prefix(ESC).map_or(false, |rest| {
        rest.starts_with(TAG) || rest.starts_with('$') || rest.starts_with(':')
    })
}

/// Converts a cache index into its wire code.
///
/// # Examples
///
/// ```rust
/// use serde_transit::cache::index_to_code;
///
/// assert_eq!(index_to_code(0), "^0");
/// assert_eq!(index_to_code(43), "^[");
/// assert_eq!(index_to_code(44), "^10");
/// ```
#[must_use]
pub fn index_to_code(index: usize) -> String {
    let hi = index / CACHE_CODE_DIGITS;
    let lo = index % CACHE_CODE_DIGITS;
    let mut code = String::with_capacity(3);
    code.push_str(SUB);
    if hi != 0 {
        code.push(char::from(hi as u8 + BASE_CHAR_INDEX));
    }
    code.push(char::from(lo as u8 + BASE_CHAR_INDEX));
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_rules() {
        let cache = RollingCache::new();
        assert!(!cache.is_cacheable("abc", true));
        assert!(cache.is_cacheable("abcd", true));
        assert!(!cache.is_cacheable("abcd", false));
        assert!(cache.is_cacheable("~#set", false));
        assert!(cache.is_cacheable("~:key", false));
        assert!(cache.is_cacheable("~$sym", false));
        assert!(!cache.is_cacheable("~m123", false));
        assert!(!cache.is_cacheable("~#'", false));
    }

    #[test]
    fn test_codes_are_assigned_in_order() {
        let mut cache = RollingCache::new();
        assert_eq!(cache.write("~:first"), "~:first");
        assert_eq!(cache.write("~:second"), "~:second");
        assert_eq!(cache.write("~:first"), "^0");
        assert_eq!(cache.write("~:second"), "^1");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_code_alphabet_edges() {
        assert_eq!(index_to_code(1), "^1");
        assert_eq!(index_to_code(45), "^11");
        assert_eq!(index_to_code(MAX_CACHE_ENTRIES - 1), "^[[");
    }

    #[test]
    fn test_reset_when_full() {
        let mut cache = RollingCache::new();
        for i in 0..MAX_CACHE_ENTRIES {
            cache.write(&format!("key-{i}"));
        }
        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);
        assert_eq!(cache.write("key-0"), "^0");

        assert_eq!(cache.write("overflow"), "overflow");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.write("overflow"), "^0");
        assert_eq!(cache.write("key-1"), "key-1");
    }

    #[test]
    fn test_noop_cache() {
        let mut cache = NoopCache;
        assert!(!cache.is_cacheable("~#long-tag", true));
        assert_eq!(cache.write("~#long-tag"), "~#long-tag");
    }
}
