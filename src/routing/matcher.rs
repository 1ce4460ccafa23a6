//! Endpoint path pattern matching.
//!
//! # Grammar
//! - literal characters compare 1:1
//! - `{name}` consumes exactly one non-empty segment, up to the next `/`
//! - `*` consumes zero or more characters, `/` included
//!
//! # Design Decisions
//! - Byte-exact comparison, no case folding
//! - `*` tries the longest span first and shrinks on failure
//! - Backtracking work per match is capped; exceeding the cap is a miss

/// Default cap on wildcard expansion steps for a single match.
pub const DEFAULT_BACKTRACK_LIMIT: usize = 100_000;

/// Backtracking matcher for endpoint path patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatcher {
    backtrack_limit: usize,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BACKTRACK_LIMIT)
    }
}

impl PatternMatcher {
    pub const fn new(backtrack_limit: usize) -> Self {
        Self { backtrack_limit }
    }

    /// Returns true if `path` is fully consumed by `pattern`.
    pub fn matches(&self, pattern: &str, path: &str) -> bool {
        let mut budget = self.backtrack_limit;
        let matched = match_from(pattern.as_bytes(), path.as_bytes(), &mut budget);
        if !matched && budget == 0 {
            tracing::warn!(
                pattern = %pattern,
                path = %path,
                limit = self.backtrack_limit,
                "Pattern backtracking limit reached, treating as no match"
            );
        }
        matched
    }
}

/// Matches with the default backtracking limit.
pub fn matches(pattern: &str, path: &str) -> bool {
    PatternMatcher::default().matches(pattern, path)
}

fn match_from(mut pattern: &[u8], mut path: &[u8], budget: &mut usize) -> bool {
    loop {
        match pattern.first() {
            None => return path.is_empty(),
            Some(b'*') => {
                let rest = &pattern[1..];
                for taken in (0..=path.len()).rev() {
                    if *budget == 0 {
                        return false;
                    }
                    *budget -= 1;
                    if match_from(rest, &path[taken..], budget) {
                        return true;
                    }
                }
                return false;
            }
            Some(b'{') if pattern.contains(&b'}') => {
                let close = pattern.iter().position(|&b| b == b'}').unwrap_or(0);
                let segment = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
                if segment == 0 {
                    return false;
                }
                pattern = &pattern[close + 1..];
                path = &path[segment..];
            }
            Some(&expected) => {
                if path.first() != Some(&expected) {
                    return false;
                }
                pattern = &pattern[1..];
                path = &path[1..];
            }
        }
    }
}
