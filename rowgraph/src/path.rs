//! Flat path helpers.
//!
//! Row keys are flat paths such as `departments/employees/name`: segments joined
//! by the configured separator. Everything here is plain string work; creating
//! container nodes along a path is the document tree's job.

/// Split a path into its non-empty segments.
pub fn split<'a>(path: &'a str, separator: &str) -> Vec<&'a str> {
    path.split(separator).filter(|s| !s.is_empty()).collect()
}

/// Split a path into owned segments.
pub fn split_owned(path: &str, separator: &str) -> Vec<String> {
    split(path, separator).into_iter().map(String::from).collect()
}

/// Whether `path` lies strictly below `prefix`, segment-wise.
///
/// `a/bc` is not under `a/b`. Every non-empty path is under the empty prefix.
pub fn is_under(path: &str, prefix: &str, separator: &str) -> bool {
    if prefix.is_empty() {
        return !path.is_empty();
    }
    path.len() > prefix.len() + separator.len()
        && path.starts_with(prefix)
        && path[prefix.len()..].starts_with(separator)
}

/// Whether `path` equals `prefix` or lies below it.
pub fn is_at_or_under(path: &str, prefix: &str, separator: &str) -> bool {
    path == prefix || is_under(path, prefix, separator)
}

/// The part of `path` after `prefix` and the separator.
pub fn suffix_after<'a>(path: &'a str, prefix: &str, separator: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    if is_under(path, prefix, separator) {
        Some(&path[prefix.len() + separator.len()..])
    } else {
        None
    }
}

/// Join a parent path and a relative path.
pub fn join(parent: &str, relative: &str, separator: &str) -> String {
    match (parent.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}{}{}", parent, separator, relative),
    }
}

/// Join segments back into a path.
pub fn join_segments<S: AsRef<str>>(segments: &[S], separator: &str) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_segments() {
        assert_eq!(split("a/b/c", "/"), vec!["a", "b", "c"]);
        assert_eq!(split("/a//b/", "/"), vec!["a", "b"]);
        assert!(split("", "/").is_empty());
        assert_eq!(split("a.b", "."), vec!["a", "b"]);
    }

    #[test]
    fn test_is_under_respects_segments() {
        assert!(is_under("a/b/c", "a/b", "/"));
        assert!(is_under("a/b", "a", "/"));
        assert!(!is_under("a/bc", "a/b", "/"));
        assert!(!is_under("a/b", "a/b", "/"));
        assert!(!is_under("a", "a/b", "/"));
        assert!(is_under("x", "", "/"));
    }

    #[test]
    fn test_multi_char_separator() {
        assert!(is_under("a::b", "a", "::"));
        assert!(!is_under("a:b", "a", "::"));
        assert_eq!(suffix_after("a::b::c", "a", "::"), Some("b::c"));
    }

    #[test]
    fn test_suffix_after() {
        assert_eq!(suffix_after("departments/employees/id", "departments", "/"), Some("employees/id"));
        assert_eq!(suffix_after("departments", "departments", "/"), None);
        assert_eq!(suffix_after("other/id", "departments", "/"), None);
        assert_eq!(suffix_after("id", "", "/"), Some("id"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("departments", "id", "/"), "departments/id");
        assert_eq!(join("", "id", "/"), "id");
        assert_eq!(join("a", "", "/"), "a");
        assert_eq!(join_segments(&["a", "b"], "."), "a.b");
    }

    #[test]
    fn test_at_or_under() {
        assert!(is_at_or_under("a", "a", "/"));
        assert!(is_at_or_under("a/b", "a", "/"));
        assert!(!is_at_or_under("ab", "a", "/"));
    }
}
