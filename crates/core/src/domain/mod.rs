pub mod order;
pub mod policy;
pub mod product;
pub mod search;
pub mod user;

/// Canonical form used for every tag, category and free-text comparison:
/// surrounding whitespace removed and ASCII letters lowercased.
pub fn normalize_term(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
