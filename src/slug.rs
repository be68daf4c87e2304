/// URL-safe identifier for a display name.
///
/// Lowercases, collapses each run of characters outside `[a-z0-9]` into one
/// hyphen and drops a leading or trailing hyphen. Applying it twice gives the
/// same result as applying it once.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// `base`, then `base-1`, `base-2`, ... for collision resolution.
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
