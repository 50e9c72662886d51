use regex::Regex;

/// A compiled path glob such as `/products/*`
///
/// Supported syntax:
/// - `*` matches any run of characters, including `/`
/// - `?` matches exactly one character
/// - everything else matches literally
///
/// Patterns are anchored: they must match the whole path.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use pagewise::url::GlobPattern;
    ///
    /// let pattern = GlobPattern::new("/products/*").unwrap();
    /// assert!(pattern.matches("/products/shoes"));
    /// assert!(!pattern.matches("/about"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut regex_pattern = String::with_capacity(pattern.len() + 8);
        regex_pattern.push('^');

        for ch in pattern.chars() {
            match ch {
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                other => regex_pattern.push_str(&regex::escape(&other.to_string())),
            }
        }

        regex_pattern.push('$');

        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&regex_pattern)?,
        })
    }

    /// Returns true if the whole path matches this pattern
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as written in configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Compiles a list of glob patterns, preserving order
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<GlobPattern>, regex::Error> {
    patterns.iter().map(|p| GlobPattern::new(p)).collect()
}

/// Returns the first pattern in `patterns` that matches `path`
pub fn first_match<'a>(patterns: &'a [GlobPattern], path: &str) -> Option<&'a GlobPattern> {
    patterns.iter().find(|pattern| pattern.matches(path))
}
