/// Maximum slug length before uniqueness suffixes.
const SLUG_MAX: usize = 200;

/// Label for a cluster seeded by a document: the title cut to `max_chars`
/// characters, or `"Topic {fallback}"` when the title is blank.
pub(crate) fn cluster_label(title: &str, fallback: &str, max_chars: usize) -> String {
    let title = title.trim();
    if title.is_empty() {
        return format!("Topic {fallback}");
    }
    title.chars().take(max_chars).collect()
}

/// Lowercase ASCII alphanumeric runs joined by `-`. Never empty.
pub(crate) fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= SLUG_MAX {
            break;
        }
    }
    slug.truncate(SLUG_MAX);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("topic");
    }
    slug
}

/// Returns the first of `base`, `base-1`, `base-2`, ... for which `taken`
/// is false.
pub(crate) fn unique_slug<E>(
    base: &str,
    mut taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut n = 1u64;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_truncates_chars() {
        let title = "é".repeat(150);
        let label = cluster_label(&title, "x", 100);
        assert_eq!(label.chars().count(), 100);
    }

    #[test]
    fn test_label_fallback() {
        assert_eq!(cluster_label("   ", "abc123", 100), "Topic abc123");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rust 2024: What's New?"), "rust-2024-what-s-new");
        assert_eq!(slugify("--Hello--World--"), "hello-world");
        assert_eq!(slugify("日本語"), "topic");
        assert_eq!(slugify(&"a".repeat(300)).len(), 200);
    }

    #[test]
    fn test_unique_slug() {
        let taken = ["news", "news-1"];
        let slug = unique_slug::<()>("news", |s| Ok(taken.contains(&s))).unwrap();
        assert_eq!(slug, "news-2");

        let fresh = unique_slug::<()>("other", |s| Ok(taken.contains(&s))).unwrap();
        assert_eq!(fresh, "other");
    }
}
