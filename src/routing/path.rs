//! Path string helpers: canonicalisation, group prefixes and joins.

/// Canonical form of a request path.
///
/// Resolves `.` and `..` elements, collapses repeated slashes and guarantees a
/// leading `/`. A trailing slash on the input is preserved.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for part in &parts {
        cleaned.push('/');
        cleaned.push_str(part);
    }
    if cleaned.is_empty() || (path.ends_with('/') && !parts.is_empty()) {
        cleaned.push('/');
    }
    cleaned
}

/// Normalise a group prefix: always a leading `/`, never a trailing one,
/// except for the root prefix `/` itself.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Join a normalised prefix with a pattern.
pub fn join(prefix: &str, pattern: &str) -> String {
    let prefix = if prefix == "/" { "" } else { prefix };
    if pattern.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else if pattern.starts_with('/') {
        format!("{prefix}{pattern}")
    } else {
        format!("{prefix}/{pattern}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("abc", "/abc"),
            ("/abc/", "/abc/"),
            ("//abc//def", "/abc/def"),
            ("/a/./b", "/a/b"),
            ("/a/b/../c", "/a/c"),
            ("/a/b/..", "/a"),
            ("/../../x", "/x"),
            ("/a/.", "/a"),
            ("/..", "/"),
        ];
        for (input, want) in cases {
            assert_eq!(clean_path(input), want, "clean_path({input:?})");
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("v1"), "/v1");
        assert_eq!(normalize_prefix("/v1/"), "/v1");
        assert_eq!(normalize_prefix("/api/v2"), "/api/v2");
        assert_eq!(normalize_prefix(""), "/");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("//"), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/v1", "/home"), "/v1/home");
        assert_eq!(join("/v1", "home"), "/v1/home");
        assert_eq!(join("/v1", "/files/"), "/v1/files/");
        assert_eq!(join("/v1", ""), "/v1");
        assert_eq!(join("/", "/home"), "/home");
        assert_eq!(join("/", ""), "/");
    }
}
