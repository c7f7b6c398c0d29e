use std::cmp::Ordering;

/// Compare two strings case-insensitively (Unicode lowercase).
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
