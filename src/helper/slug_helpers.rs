/// Converts a title into a URL-safe slug: lowercase ASCII alphanumerics
/// with single hyphens between runs, no leading or trailing hyphen.
/// Non-ASCII characters are treated as separators.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut prev_was_hyphen = true; // true so leading separators are skipped
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_was_hyphen = false;
        } else if !prev_was_hyphen {
            slug.push('-');
            prev_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Derives a unique slug for a new post. `exists` is the storage-backed
/// uniqueness oracle and is consulted afresh at every candidate, so the
/// search holds under concurrent post creation; the sequence
/// `base`, `base-1`, `base-2`, … is deterministic and the first free
/// candidate wins. A title with no usable characters falls back to "post"
/// so a published slug is never empty.
pub fn assign_slug<E>(
    title: &str,
    mut exists: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    let base = {
        let s = slugify(title);
        if s.is_empty() {
            "post".to_string()
        } else {
            s
        }
    };

    if !exists(&base)? {
        return Ok(base);
    }
    let mut counter = 1u64;
    loop {
        let candidate = format!("{base}-{counter}");
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        counter += 1;
    }
}
