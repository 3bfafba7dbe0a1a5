//! Display-name formatting for internal move keys.
//!
//! Resolution order: an authoritative name from the source payload
//! wins; otherwise compound-word rules for the `gmax`/`max` prefixes
//! apply; otherwise the key is simply capitalized.

/// Format a move key like `gmaxwildfire` into a display name.
pub fn format_move_name(key: &str, authoritative: Option<&str>) -> String {
    if let Some(name) = authoritative {
        if !name.is_empty() {
            return name.to_string();
        }
    }

    if let Some(rest) = key.strip_prefix("gmax") {
        return format!("G-Max {}", capitalize(rest));
    }
    if let Some(rest) = key.strip_prefix("max") {
        return format!("Max {}", capitalize(rest));
    }
    capitalize(key)
}

/// Uppercase the first ASCII character, leaving the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoritative_name_wins() {
        assert_eq!(
            format_move_name("doubleedge", Some("Double-Edge")),
            "Double-Edge"
        );
    }

    #[test]
    fn gmax_prefix_becomes_compound() {
        assert_eq!(format_move_name("gmaxwildfire", None), "G-Max Wildfire");
    }

    #[test]
    fn max_prefix_becomes_compound() {
        assert_eq!(format_move_name("maxflare", None), "Max Flare");
    }

    #[test]
    fn plain_key_is_capitalized() {
        assert_eq!(format_move_name("tackle", None), "Tackle");
    }

    #[test]
    fn empty_authoritative_name_is_ignored() {
        assert_eq!(format_move_name("tackle", Some("")), "Tackle");
    }
}
