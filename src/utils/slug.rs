//! URL slugification and path-segment checks.

use deunicode::deunicode;

/// Characters that must never appear in a generated path segment.
const FORBIDDEN_CHARS: &[char] = &[
    '<', '>', ':', '|', '?', '*', '#', '/', '\\', '\t', '\r', '\n', '\0',
];

/// Lowercase ASCII slug: transliterate, keep alphanumerics, join runs of
/// anything else with a single `-`.
///
/// `"Hello, World!"` → `"hello-world"`, `"Ünïcode"` → `"unicode"`.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Whether `tag` can be used verbatim as one directory name under `/tags/`.
pub fn is_safe_segment(tag: &str) -> bool {
    !tag.is_empty()
        && tag != "."
        && tag != ".."
        && !tag.contains(FORBIDDEN_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Hello, World!"), "hello-world");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("  --a   b--  "), "a-b");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_transliterates() {
        assert_eq!(slugify("Ünïcode Title"), "unicode-title");
        assert_eq!(slugify("Café au lait"), "cafe-au-lait");
    }

    #[test]
    fn test_slugify_keeps_digits() {
        assert_eq!(slugify("Step 2: Profit"), "step-2-profit");
    }

    #[test]
    fn test_safe_segment() {
        assert!(is_safe_segment("go"));
        assert!(is_safe_segment("c++"));
        assert!(is_safe_segment("日本語"));
        assert!(!is_safe_segment(""));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment("a\\b"));
        assert!(!is_safe_segment("what?"));
    }
}
