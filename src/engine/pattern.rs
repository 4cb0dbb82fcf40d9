//! Glob matching for index key patterns
//!
//! `*` matches any run of characters (including none), `?` matches exactly one.
//! Everything else matches literally.

/// Returns whether `key` matches `pattern`.
pub fn matches(pattern: &str, key: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let p: Vec<char> = pattern.chars().collect();
    let k: Vec<char> = key.chars().collect();

    // Iterative wildcard match with single-star backtracking
    let (mut pi, mut ki) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ki = 0usize;

    while ki < k.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == k[ki]) {
            pi += 1;
            ki += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ki = ki;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_ki += 1;
            ki = star_ki;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }

    pi == p.len()
}

/// Returns whether `s` contains a glob metacharacter.
pub fn has_wildcards(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}
