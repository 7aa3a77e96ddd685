//! `[EnvironmentVariables]` section model for cxbottle.conf
//!
//! Locates the managed section inside the raw file text and reads the
//! `"KEY" = "VALUE"` lines it contains. Nothing here owns a parsed document;
//! callers keep the original text and work on ranges of it.

use std::collections::BTreeMap;
use std::ops::Range;

/// Header line that opens the managed section
pub const ENV_SECTION_MARKER: &str = "[EnvironmentVariables]";

/// Comment block written in front of a synthesized section
pub const ENV_SECTION_BANNER: &str = r#";;---------------< User defined environment variables >-----------------
;; Add environment variables that need to be defined in the
;; Wine environment here. They should be in the form:
;;
;; "VARIABLE" = "value"
;;
;;----------------------------------------------------------------------
[EnvironmentVariables]"#;

/// Keys always offered as toggles, in emission order
pub const DEFAULT_KEYS: [&str; 5] = [
    "WINEESYNC",
    "WINEMSYNC",
    "D3DM_ENABLE_METALFX",
    "ROSETTA_ADVERTISE_AVX",
    "MTL_HUD_ENABLED",
];

/// Keys that are never turned into toggles and never deleted
pub const SKIP_KEYS: [&str; 2] = ["PROMPT", "CX_BOTTLE_CREATOR_APPID"];

/// Keys whose toggle cannot be renamed
pub const NON_EDITABLE_KEYS: [&str; 3] = [
    "D3DM_ENABLE_METALFX",
    "ROSETTA_ADVERTISE_AVX",
    "MTL_HUD_ENABLED",
];

const BOOLEAN_TOKENS: [&str; 8] = ["0", "1", "true", "false", "yes", "no", "on", "off"];
const TRUE_TOKENS: [&str; 4] = ["1", "true", "yes", "on"];

/// One `"KEY" = "VALUE"` line, possibly commented out with `;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueLine {
    /// Variable name (never empty, never contains `"`)
    pub key: String,

    /// Raw value between the quotes
    pub value: String,

    /// Whether the line carried one or more leading `;`
    pub commented: bool,
}

impl KeyValueLine {
    /// Tokenize a single line.
    ///
    /// Accepted shape: optional whitespace, a run of `;`, optional whitespace,
    /// `"KEY"`, `=` surrounded by optional whitespace, `"VALUE"`, and nothing
    /// but whitespace afterwards.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim_start();
        let uncommented = rest.trim_start_matches(';');
        let commented = uncommented.len() != rest.len();

        let (key, rest) = take_quoted(uncommented.trim_start())?;
        if key.is_empty() {
            return None;
        }

        let rest = rest.trim_start().strip_prefix('=')?;
        let (value, rest) = take_quoted(rest.trim_start())?;
        if !rest.trim().is_empty() {
            return None;
        }

        Some(Self {
            key: key.to_string(),
            value: value.to_string(),
            commented,
        })
    }

    /// Parse a line and keep it only when it is not commented out
    pub fn parse_active(line: &str) -> Option<Self> {
        Self::parse(line).filter(|kv| !kv.commented)
    }

    /// Render the normalized, uncommented form
    pub fn to_line(&self) -> String {
        format_assignment(&self.key, &self.value)
    }
}

/// Render `"KEY" = "VALUE"`
pub fn format_assignment(key: &str, value: &str) -> String {
    format!("\"{}\" = \"{}\"", key, value)
}

/// Split `"inner"rest` into `inner` and `rest`
fn take_quoted(input: &str) -> Option<(&str, &str)> {
    let inner = input.strip_prefix('"')?;
    let end = inner.find('"')?;
    Some((&inner[..end], &inner[end + 1..]))
}

/// Find the byte range of the managed section.
///
/// The range starts at the first `[EnvironmentVariables]` and stops right
/// before the newline of the next `\n[` header, or at the end of the text.
pub fn find_managed_section(text: &str) -> Option<Range<usize>> {
    let start = text.find(ENV_SECTION_MARKER)?;
    let after_marker = start + ENV_SECTION_MARKER.len();
    let end = text[after_marker..]
        .find("\n[")
        .map(|offset| after_marker + offset)
        .unwrap_or(text.len());
    Some(start..end)
}

/// Read active key/value pairs from the managed section.
///
/// Commented and malformed lines are ignored. When a key repeats, the last
/// occurrence wins.
pub fn parse_key_values(text: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    let Some(range) = find_managed_section(text) else {
        return values;
    };

    for kv in text[range].lines().filter_map(KeyValueLine::parse_active) {
        values.insert(kv.key, kv.value);
    }

    values
}

/// Whether `key` can be written as the quoted key of a `"KEY" = "VALUE"` line
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['"', '\n', '\r'])
}

/// Whether a raw value looks like an on/off switch
pub fn is_boolean_like(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}

/// Toggle state for a raw value; anything not true-like is off
pub fn normalize_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUE_TOKENS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenizes_active_and_commented_lines() {
        assert_eq!(
            KeyValueLine::parse(r#"  "WINEESYNC" = "1"  "#),
            Some(KeyValueLine {
                key: "WINEESYNC".into(),
                value: "1".into(),
                commented: false,
            })
        );
        assert_eq!(
            KeyValueLine::parse(r#";; "WINEMSYNC"="0""#),
            Some(KeyValueLine {
                key: "WINEMSYNC".into(),
                value: "0".into(),
                commented: true,
            })
        );
        assert_eq!(
            KeyValueLine::parse(r#""EMPTY" = """#).map(|kv| kv.value),
            Some(String::new())
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "",
            "[EnvironmentVariables]",
            r#""" = "1""#,
            r#""KEY" "1""#,
            r#""KEY" = 1"#,
            r#""KEY" = "1" trailing"#,
            r#"KEY = "1""#,
            r#"; ; "KEY" = "1""#,
        ] {
            assert_eq!(KeyValueLine::parse(line), None, "line: {line:?}");
        }
    }

    #[test]
    fn validates_keys() {
        assert!(is_valid_key("WINEESYNC"));
        assert!(is_valid_key("has space"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("BAD\"KEY"));
        assert!(!is_valid_key("TWO\nLINES"));
    }

    #[test]
    fn section_ends_before_next_header() {
        let text = indoc! {r#"
            [Bottle]
            "Name" = "Steam"
            [EnvironmentVariables]
            "WINEESYNC" = "1"
            [AppDefaults]
            "X" = "y"
        "#};
        let range = find_managed_section(text).unwrap();
        assert_eq!(&text[range], "[EnvironmentVariables]\n\"WINEESYNC\" = \"1\"");
    }

    #[test]
    fn section_runs_to_end_of_text() {
        let text = "prefix\n[EnvironmentVariables]\n\"A\" = \"1\"\n";
        let range = find_managed_section(text).unwrap();
        assert_eq!(range.end, text.len());
        assert_eq!(find_managed_section("[Bottle]\n\"A\" = \"1\"\n"), None);
    }

    #[test]
    fn parse_ignores_comments_and_outside_lines() {
        let text = indoc! {r#"
            [Bottle]
            "OUTSIDE" = "1"
            [EnvironmentVariables]
            ;"COMMENTED" = "1"
            "WINEESYNC" = "1"
            garbage line
            "PROMPT" = "C:\>"
        "#};
        let values = parse_key_values(text);
        assert_eq!(values.len(), 2);
        assert_eq!(values["WINEESYNC"], "1");
        assert_eq!(values["PROMPT"], "C:\\>");
    }

    #[test]
    fn parse_last_duplicate_wins() {
        let text = "[EnvironmentVariables]\n\"A\" = \"1\"\n\"A\" = \"0\"\n";
        assert_eq!(parse_key_values(text)["A"], "0");
        assert!(parse_key_values("no section here").is_empty());
    }

    #[test]
    fn classifies_boolean_values() {
        assert!(is_boolean_like("Yes"));
        assert!(is_boolean_like("  ON "));
        assert!(is_boolean_like("0"));
        assert!(!is_boolean_like("maybe"));
        assert!(!is_boolean_like(""));

        assert!(normalize_bool("TRUE"));
        assert!(normalize_bool(" yes "));
        assert!(normalize_bool("On"));
        assert!(normalize_bool("1"));
        assert!(!normalize_bool("off"));
        assert!(!normalize_bool("maybe"));
    }
}
