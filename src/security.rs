use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether a request may run administrative operations.
///
/// With no key configured, nothing is authorized.
pub fn api_key_matches(configured: Option<&str>, provided: Option<&str>) -> bool {
    match (configured, provided) {
        (Some(expected), Some(provided)) => constant_time_compare(expected, provided),
        _ => false,
    }
}
