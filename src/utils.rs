//! Common utility functions shared across the codebase.

/// Upper-cases the first character, leaving the rest untouched.
///
/// Used to derive resource names from function names.
///
/// # Examples
///
/// ```
/// use fusion::utils::capitalize;
///
/// assert_eq!(capitalize("resize"), "Resize");
/// assert_eq!(capitalize("getUser"), "GetUser");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Checks if the text can be used as a plain JavaScript identifier.
///
/// Only ASCII identifiers are accepted; reserved words are not rejected.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
