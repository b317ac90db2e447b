//! Recognition results and the nested-metadata lookup used to build them.
//!
//! Shazam responses carry the interesting fields at different depths: title
//! and subtitle sit directly on `track`, while album, label and release date
//! are buried in `track.sections[].metadata[]` as `{"title": .., "text": ..}`
//! pairs. [`find_deepest`] hides that difference.

use serde_json::Value;
use std::fmt;

/// Default used when a title, artist or album cannot be found.
pub const UNKNOWN: &str = "Unknown";

/// Metadata extracted from one recognition response.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub label: Option<String>,
    /// Four-digit release year, if the response carried one.
    pub released: Option<String>,
    pub cover_url: Option<String>,
}

impl fmt::Display for RecognitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.artist, self.title, self.album)
    }
}

impl RecognitionResult {
    /// True when the title is missing or the unknown placeholder.
    pub fn has_unknown_title(&self) -> bool {
        let title = self.title.trim();
        title.is_empty() || title.eq_ignore_ascii_case(UNKNOWN)
    }

    /// Parse a Shazam JSON response.
    ///
    /// Returns `None` for an empty response, i.e. one without a `track`
    /// object (Shazam's way of saying "no match").
    pub fn from_json(raw: &Value) -> Option<Self> {
        let track = raw.get("track").filter(|t| t.is_object())?;

        let title = string_field(track, "title").unwrap_or_else(|| UNKNOWN.to_string());
        let artist = string_field(track, "subtitle").unwrap_or_else(|| UNKNOWN.to_string());
        let album = find_deepest(track, "Album")
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN.to_string());
        let label = find_deepest(track, "Label").map(str::to_string);
        let released = find_deepest(track, "Released").and_then(extract_year);
        let cover_url = track.get("images").and_then(|images| {
            string_field(images, "coverart").or_else(|| string_field(images, "coverarthq"))
        });

        Some(RecognitionResult {
            title,
            artist,
            album,
            label,
            released,
            cover_url,
        })
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Find the first string value stored under `key` anywhere inside `value`.
///
/// Traversal is depth-first pre-order: at each object, a direct `key` entry
/// with a string value matches, as does a labelled pair
/// `{"title": key, "text": ..}`; otherwise the object's values are visited
/// in insertion order. Array elements are visited in ascending index order.
/// The first match wins.
pub fn find_deepest<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key).and_then(Value::as_str) {
                return Some(found);
            }
            if map.get("title").and_then(Value::as_str) == Some(key) {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    return Some(text);
                }
            }
            map.values().find_map(|child| find_deepest(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_deepest(child, key)),
        _ => None,
    }
}

/// First run of four ASCII digits, e.g. `"1965"` from `"Dec 3, 1965"`.
fn extract_year(released: &str) -> Option<String> {
    let bytes = released.as_bytes();
    bytes
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .map(|start| released[start..start + 4].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shazam_response() -> Value {
        json!({
            "matches": [{"id": "123"}],
            "track": {
                "key": "123",
                "title": "Drive My Car",
                "subtitle": "The Beatles",
                "images": {
                    "coverart": "https://example.com/cover.jpg",
                    "coverarthq": "https://example.com/cover_hq.jpg"
                },
                "sections": [
                    {
                        "type": "SONG",
                        "metadata": [
                            {"title": "Album", "text": "Rubber Soul"},
                            {"title": "Label", "text": "Parlophone"},
                            {"title": "Released", "text": "1965"}
                        ]
                    },
                    {
                        "type": "RELATED",
                        "metadata": [{"title": "Album", "text": "Somewhere Else"}]
                    }
                ]
            }
        })
    }

    #[test]
    fn test_from_json_full() {
        let result = RecognitionResult::from_json(&shazam_response()).unwrap();
        assert_eq!(result.title, "Drive My Car");
        assert_eq!(result.artist, "The Beatles");
        assert_eq!(result.album, "Rubber Soul");
        assert_eq!(result.label.as_deref(), Some("Parlophone"));
        assert_eq!(result.released.as_deref(), Some("1965"));
        assert_eq!(result.cover_url.as_deref(), Some("https://example.com/cover.jpg"));
        assert!(!result.has_unknown_title());
    }

    #[test]
    fn test_from_json_without_track_is_empty() {
        assert!(RecognitionResult::from_json(&json!({"matches": []})).is_none());
        assert!(RecognitionResult::from_json(&json!({"track": "x"})).is_none());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let result = RecognitionResult::from_json(&json!({"track": {"subtitle": "Someone"}})).unwrap();
        assert_eq!(result.title, UNKNOWN);
        assert_eq!(result.album, UNKNOWN);
        assert!(result.label.is_none());
        assert!(result.released.is_none());
        assert!(result.cover_url.is_none());
        assert!(result.has_unknown_title());
    }

    #[test]
    fn test_find_deepest_first_match_wins() {
        let value = json!({
            "a": {"b": [{"target": "first"}, {"target": "second"}]},
            "target_elsewhere": {"target": "third"}
        });
        assert_eq!(find_deepest(&value, "target"), Some("first"));
    }

    #[test]
    fn test_find_deepest_direct_key_before_children() {
        let value = json!({
            "nested": {"Album": "deep"},
            "Album": "shallow"
        });
        assert_eq!(find_deepest(&value, "Album"), Some("shallow"));
    }

    #[test]
    fn test_find_deepest_missing() {
        let value = json!({"a": [1, 2, {"b": null}]});
        assert_eq!(find_deepest(&value, "b"), None);
        assert_eq!(find_deepest(&value, "zzz"), None);
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("1965").as_deref(), Some("1965"));
        assert_eq!(extract_year("Dec 3, 1965").as_deref(), Some("1965"));
        assert_eq!(extract_year("n/a"), None);
    }
}
