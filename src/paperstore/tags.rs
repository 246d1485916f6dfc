//! Tag parsing for uploaded documents.
//!
//! Tags arrive as a single comma-separated string (the way an upload form sends
//! them). A record's tags are an ordered set:
//! - each tag is trimmed
//! - empty entries are dropped
//! - repeated tags keep their first position
//! - at most [`MAX_TAGS`] survive

/// Upper bound on the number of tags stored per document.
pub const MAX_TAGS: usize = 12;

/// Parses a comma-separated tag string into the stored tag list.
///
/// # Examples
/// ```
/// use paperstore::tags::parse_tags;
///
/// assert_eq!(parse_tags("x, y"), vec!["x", "y"]);
/// assert_eq!(parse_tags(" , a,,a , b "), vec!["a", "b"]);
/// assert!(parse_tags("").is_empty());
/// ```
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// Normalizes already-split tags with the same rules as [`parse_tags`].
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if out.len() == MAX_TAGS {
            break;
        }
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
