// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Small numeric and formatting helpers shared across the crate.

/// Round float to nearest integer, rounding half to even (Banker's Rounding).
/// This matches Python's `round()` behavior, which PAF sample grids follow.
#[must_use]
pub fn bankers_round(v: f32) -> f32 {
    let n = v.floor();
    let d = v - n;
    if (d - 0.5).abs() < 1e-6 {
        if n % 2.0 == 0.0 { n } else { n + 1.0 }
    } else {
        v.round()
    }
}

/// Simple pluralization for summary lines.
#[must_use]
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => "persons".to_string(),
        _ => {
            if word.ends_with('s') || word.ends_with("ch") || word.ends_with("sh") {
                format!("{word}es")
            } else if word.ends_with('y') && !word.ends_with("ey") && !word.ends_with("ay") {
                format!("{}ies", &word[..word.len() - 1])
            } else {
                format!("{word}s")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bankers_round_half_to_even() {
        assert!((bankers_round(2.5) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(3.5) - 4.0).abs() < f32::EPSILON);
        assert!((bankers_round(0.5)).abs() < f32::EPSILON);
        assert!((bankers_round(1.5) - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bankers_round_plain_cases() {
        assert!((bankers_round(2.4) - 2.0).abs() < f32::EPSILON);
        assert!((bankers_round(2.6) - 3.0).abs() < f32::EPSILON);
        assert!((bankers_round(7.0) - 7.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("person"), "persons");
        assert_eq!(pluralize("candidate"), "candidates");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("body"), "bodies");
    }
}
