//! Priority attribute rules shared by the publish path and the drainer.
//!
//! The publisher writes a `priority` attribute next to every payload and the
//! drainer sorts on it. The two sides do not agree on casing: the publisher
//! keeps valid input lower-cased and only capitalizes the `"Medium"` fallback,
//! while [`rank`] matches capitalized values only. A lower-cased `"high"`
//! therefore ranks as unknown. Set `broker.capitalize_priority` to publish
//! capitalized values instead.

use tracing::warn;

/// Attribute key carrying the normalized priority.
pub const PRIORITY_ATTRIBUTE: &str = "priority";

/// Rank of an attribute that is missing or not recognized.
pub const UNKNOWN_RANK: u8 = 4;

/// Sort key for a message priority attribute. Lower sorts first.
///
/// Case-sensitive: `"High"` → 1, `"Medium"` → 2, `"Low"` → 3, anything else
/// (or no attribute) → 4.
pub fn rank(attribute: Option<&str>) -> u8 {
    match attribute {
        Some("High") => 1,
        Some("Medium") => 2,
        Some("Low") => 3,
        _ => UNKNOWN_RANK,
    }
}

/// Normalize raw user input into the wire attribute value.
///
/// Valid values (`high`, `medium`, `low` in any casing) are lower-cased.
/// Anything else, including the empty string, becomes the literal
/// `"Medium"`. No input at all becomes `"medium"`.
pub fn normalize_priority_attribute(input: Option<&str>) -> String {
    let Some(raw) = input else {
        return "medium".to_string();
    };

    let lowered = raw.to_lowercase();
    match lowered.as_str() {
        "high" | "medium" | "low" => lowered,
        _ => {
            warn!(priority = raw, "Invalid priority value normalized to 'Medium'");
            "Medium".to_string()
        }
    }
}

/// Capitalized variant of [`normalize_priority_attribute`], matching what
/// [`rank`] expects.
pub fn canonical_priority_attribute(input: Option<&str>) -> String {
    match normalize_priority_attribute(input).as_str() {
        "high" => "High".to_string(),
        "low" => "Low".to_string(),
        _ => "Medium".to_string(),
    }
}
