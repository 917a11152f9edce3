//! Identifier rules shared by instance registration and dictionary lookups.

use once_cell::sync::Lazy;
use regex::Regex;

/// Instance and table names: lowercase, starting with a letter.
pub static NAME_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{1,49}$").expect("valid name pattern"));

/// Dictionary namespaces additionally allow `-` and `.` separators.
pub static NAMESPACE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.\-]{0,49}$").expect("valid namespace pattern"));

pub fn is_valid_name(name: &str) -> bool {
    NAME_IDENTIFIER.is_match(name)
}

pub fn is_valid_namespace(ns: &str) -> bool {
    NAMESPACE_IDENTIFIER.is_match(ns)
}
