//! Naming of combined policies.
//!
//! Combined policies are named after the user they are attached to followed by a 1-based
//! sequence number, e.g. `alice-1`, `alice-2`. The same names are used again on every
//! replacement, so a stable set of attached policies always produces the same names.

/// Name of the combined policy at `index` (0-based) for `user_name`.
pub fn build_combined_policy_name(user_name: &str, index: usize) -> String {
    format!("{}-{}", user_name, index + 1)
}

/// Split an import id (`"alice-1, alice-2"`) into policy names.
///
/// All spaces are removed from each entry and empty entries are dropped.
pub fn parse_import_id(id: &str) -> Vec<String> {
    id.split(',')
        .map(|name| name.replace(' ', ""))
        .filter(|name| !name.is_empty())
        .collect()
}
