//! Module identifier helpers.
//!
//! A module id is `<name>-<semver>`, e.g. `mod-foo-1.2.0` or
//! `mod-foo-1.2.0-SNAPSHOT.42`. Hints in requests may carry either form.

/// Returns the name part of a module id, or `None` if `value` is not an id.
pub fn module_name(value: &str) -> Option<&str> {
    value
        .match_indices('-')
        .filter(|(idx, _)| *idx > 0)
        .find(|(idx, _)| is_semver(&value[idx + 1..]))
        .map(|(idx, _)| &value[..idx])
}

/// Returns true if `value` looks like a full module id.
pub fn is_module_id(value: &str) -> bool {
    module_name(value).is_some()
}

fn is_semver(value: &str) -> bool {
    let core = value.split(['-', '+']).next().unwrap_or_default();
    let mut parts = 0;
    for part in core.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        parts += 1;
    }
    parts == 3
}
