//! UNSPSC code structure.
//!
//! An UNSPSC code is a fixed-width 8-digit string whose hierarchy is encoded
//! positionally: the first two digits are the segment, the next two the
//! family, then class, then commodity. Trailing zero pairs mark levels that
//! are not yet populated, so ancestry and children can be derived from the
//! code alone without extra storage.

/// Hierarchy level of a code, from broadest to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Segment = 1,
    Family = 2,
    Class = 3,
    Commodity = 4,
}

impl Level {
    /// Numeric level (1-4) as stored in the reference tables.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(n: i32) -> Option<Level> {
        match n {
            1 => Some(Level::Segment),
            2 => Some(Level::Family),
            3 => Some(Level::Class),
            4 => Some(Level::Commodity),
            _ => None,
        }
    }
}

/// Check that a code is exactly 8 ASCII digits and does not start with "00".
pub fn validate_code_format(code: &str) -> bool {
    code.len() == 8 && code.bytes().all(|b| b.is_ascii_digit()) && !code.starts_with("00")
}

/// Check an ETIM class identifier: `EC` followed by 6 digits.
pub fn validate_etim_format(class_code: &str) -> bool {
    class_code.len() == 8
        && class_code.starts_with("EC")
        && class_code[2..].bytes().all(|b| b.is_ascii_digit())
}

/// Derive the hierarchy level from the code's zero-structure.
///
/// Returns `None` for codes that fail format validation.
pub fn level_of(code: &str) -> Option<Level> {
    if !validate_code_format(code) {
        return None;
    }
    if &code[2..] == "000000" {
        Some(Level::Segment)
    } else if &code[4..] == "0000" {
        Some(Level::Family)
    } else if &code[6..] == "00" {
        Some(Level::Class)
    } else {
        Some(Level::Commodity)
    }
}

/// The significant prefix of a code: 2, 4, 6, or 8 digits depending on level.
pub fn significant_prefix(code: &str) -> Option<&str> {
    let level = level_of(code)?;
    Some(&code[..2 * level.as_i32() as usize])
}

/// Pad a 2/4/6-digit prefix out to a full-width 8-digit code.
pub fn pad_to_code(prefix: &str) -> String {
    format!("{:0<8}", prefix)
}

/// Two-digit segment prefix of a valid code.
pub fn segment_prefix(code: &str) -> Option<&str> {
    validate_code_format(code).then(|| &code[..2])
}

/// Four-digit family prefix, present for family level and below.
pub fn family_prefix(code: &str) -> Option<&str> {
    (level_of(code)? >= Level::Family).then(|| &code[..4])
}

/// Six-digit class prefix, present for class level and below.
pub fn class_prefix(code: &str) -> Option<&str> {
    (level_of(code)? >= Level::Class).then(|| &code[..6])
}

/// Full-width ancestor codes in segment -> commodity order, including the
/// code itself as the last entry. `"25171501"` yields
/// `["25000000", "25170000", "25171500", "25171501"]`.
pub fn ancestor_codes(code: &str) -> Vec<String> {
    let Some(level) = level_of(code) else {
        return Vec::new();
    };
    (1..=level.as_i32())
        .map(|l| pad_to_code(&code[..2 * l as usize]))
        .collect()
}

/// The prefix that all children of `parent` share, or `None` when the parent
/// is a commodity (leaf) or malformed.
///
/// Accepts both a bare prefix (`"2517"`) and a full-width code
/// (`"25170000"`), which is normalized to its significant prefix first.
pub fn child_prefix(parent: &str) -> Option<String> {
    let prefix = match parent.len() {
        2 | 4 | 6 => {
            if !parent.bytes().all(|b| b.is_ascii_digit()) || parent.starts_with("00") {
                return None;
            }
            parent.to_string()
        }
        8 => significant_prefix(parent)?.to_string(),
        _ => return None,
    };
    // A full 8-digit significant prefix means commodity level: no children.
    (prefix.len() < 8).then_some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_formats() {
        assert!(validate_code_format("25171501"));
        assert!(validate_code_format("10000000"));
        assert!(validate_code_format("99999999"));
    }

    #[test]
    fn test_invalid_formats() {
        assert!(!validate_code_format("2517150")); // too short
        assert!(!validate_code_format("251715011")); // too long
        assert!(!validate_code_format("2517150a")); // non-digit
        assert!(!validate_code_format("00171501")); // reserved 00 segment
        assert!(!validate_code_format(""));
        assert!(!validate_code_format("25 71501"));
    }

    #[test]
    fn test_etim_format() {
        assert!(validate_etim_format("EC002714"));
        assert!(!validate_etim_format("EC00271")); // too short
        assert!(!validate_etim_format("XX002714"));
        assert!(!validate_etim_format("EC00271a"));
    }

    #[test]
    fn test_level_from_zero_structure() {
        assert_eq!(level_of("25000000"), Some(Level::Segment));
        assert_eq!(level_of("25170000"), Some(Level::Family));
        assert_eq!(level_of("25171500"), Some(Level::Class));
        assert_eq!(level_of("25171501"), Some(Level::Commodity));
        assert_eq!(level_of("bad"), None);
    }

    #[test]
    fn test_significant_prefix() {
        assert_eq!(significant_prefix("25000000"), Some("25"));
        assert_eq!(significant_prefix("25170000"), Some("2517"));
        assert_eq!(significant_prefix("25171500"), Some("251715"));
        assert_eq!(significant_prefix("25171501"), Some("25171501"));
    }

    #[test]
    fn test_ancestor_codes_commodity() {
        assert_eq!(
            ancestor_codes("25171501"),
            vec!["25000000", "25170000", "25171500", "25171501"]
        );
    }

    #[test]
    fn test_ancestor_codes_family() {
        assert_eq!(ancestor_codes("25170000"), vec!["25000000", "25170000"]);
    }

    #[test]
    fn test_ancestors_are_strict_prefixes() {
        let path = ancestor_codes("10101501");
        assert_eq!(path.len(), 4);
        for pair in path.windows(2) {
            let a = significant_prefix(&pair[0]).unwrap();
            let b = significant_prefix(&pair[1]).unwrap();
            assert!(b.starts_with(a) && b.len() > a.len());
        }
    }

    #[test]
    fn test_child_prefix() {
        assert_eq!(child_prefix("2517"), Some("2517".to_string()));
        assert_eq!(child_prefix("25170000"), Some("2517".to_string()));
        assert_eq!(child_prefix("251715"), Some("251715".to_string()));
        assert_eq!(child_prefix("25171501"), None); // commodity is a leaf
        assert_eq!(child_prefix("25"), Some("25".to_string()));
        assert_eq!(child_prefix("001"), None);
        assert_eq!(child_prefix("00171501"), None);
    }

    #[test]
    fn test_pad_to_code() {
        assert_eq!(pad_to_code("25"), "25000000");
        assert_eq!(pad_to_code("2517"), "25170000");
        assert_eq!(pad_to_code("25171501"), "25171501");
    }
}
