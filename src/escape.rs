//! Reserved wire characters and string escaping.
//!
//! Transit reserves three leading characters in strings: `~` (escape), `^` (cache
//! codes and the map marker) and `` ` `` (reserved for future use). A string that
//! starts with one of them gets one extra `~` so readers do not mistake it for an
//! encoded value. The two-character map marker `"^ "` is passed through untouched.

use std::borrow::Cow;

pub const ESC: &str = "~";
pub const SUB: &str = "^";
pub const RES: &str = "`";
pub const TAG: &str = "#";
pub const QUOTE: &str = "'";
pub const MAP_AS_ARRAY: &str = "^ ";

/// Prefix marking a tagged value's tag string (`~#`).
pub const TAG_PREFIX: &str = "~#";

/// Escapes `s` if it starts with a reserved character.
///
/// # Examples
///
/// ```rust
/// use serde_transit::escape::escape;
///
/// assert_eq!(escape("plain"), "plain");
/// assert_eq!(escape("~tilde"), "~~tilde");
/// assert_eq!(escape("^caret"), "~^caret");
/// assert_eq!(escape("`tick"), "~`tick");
/// assert_eq!(escape("^ "), "^ ");
/// ```
#[must_use]
pub fn escape(s: &str) -> Cow<'_, str> {
    if needs_escape(s) {
        let mut escaped = String::with_capacity(s.len() + 1);
        escaped.push_str(ESC);
        escaped.push_str(s);
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(s)
    }
}

#[inline]
fn needs_escape(s: &str) -> bool {
    (s.starts_with(ESC) || s.starts_with(SUB) || s.starts_with(RES)) && s != MAP_AS_ARRAY
}
