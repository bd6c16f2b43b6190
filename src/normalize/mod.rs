//! Normalization of extended-JSON document trees.
//!
//! Documents exported under the source store's convention wrap non-native
//! values in single-key tag mappings: `{"$oid": "..."}` for identifiers and
//! `{"$date": "..."}` for timestamps. The destination store takes neither,
//! so the normalizer walks the whole tree and eliminates every wrapper:
//! identity fields are dropped, reference fields and stray identifiers are
//! nulled, dates become native timestamps. The transform is total: it
//! never fails and never loses a non-identity field. It is also idempotent,
//! since a normalized tree has no wrappers left to rewrite.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Tag key wrapping a native-identifier literal.
pub const ID_TAG: &str = "$oid";
/// Tag key wrapping an ISO-ish date-time string.
pub const DATE_TAG: &str = "$date";

/// A document tree node: mapping, sequence, or scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    Seq(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    pub fn str(value: impl Into<String>) -> Self {
        Node::Str(value.into())
    }

    /// A `{"$date": "..."}` wrapper, as the source convention writes them.
    pub fn date_tag(raw: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(DATE_TAG.to_string(), Node::Str(raw.into()));
        Node::Map(map)
    }

    /// A `{"$oid": "..."}` wrapper.
    pub fn id_tag(raw: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(ID_TAG.to_string(), Node::Str(raw.into()));
        Node::Map(map)
    }

    /// The wrapped value when this node is a single-key tag mapping with
    /// `tag` as its key.
    fn tagged(&self, tag: &str) -> Option<&Node> {
        match self {
            Node::Map(map) if map.len() == 1 => map.get(tag),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Int(i),
                None => Node::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Node::Str(s),
            serde_json::Value::Array(items) => {
                Node::Seq(items.into_iter().map(Node::from).collect())
            }
            serde_json::Value::Object(entries) => Node::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Field sets driving the normalizer.
#[derive(Debug, Clone)]
pub struct NormalizerRules {
    /// Record-identity fields, removed from mappings entirely.
    pub identity_fields: Vec<String>,
    /// Reference fields whose values are replaced with an explicit null.
    pub reference_fields: Vec<String>,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            identity_fields: vec!["_id".to_string()],
            reference_fields: vec![
                "Category".to_string(),
                "SubCategory".to_string(),
                "SubSubCategory".to_string(),
                "Author".to_string(),
            ],
        }
    }
}

pub struct DocumentNormalizer {
    rules: NormalizerRules,
}

impl DocumentNormalizer {
    pub fn new(rules: NormalizerRules) -> Self {
        Self { rules }
    }

    /// Rewrites `node` into its destination-safe form. Total: no input
    /// shape is an error, and every non-identity field survives.
    pub fn normalize(&self, node: Node) -> Node {
        if let Some(raw) = node.tagged(DATE_TAG) {
            return Node::DateTime(parse_tagged_date(raw));
        }
        if node.tagged(ID_TAG).is_some() {
            // Identifier tags outside the identity fields still carry
            // store-private ids; nulled, not preserved.
            return Node::Null;
        }

        match node {
            Node::Map(map) => {
                let mut out = BTreeMap::new();
                for (key, value) in map {
                    if self.rules.identity_fields.iter().any(|f| *f == key) {
                        continue;
                    }
                    if self.rules.reference_fields.iter().any(|f| *f == key) {
                        out.insert(key, Node::Null);
                        continue;
                    }
                    let value = self.normalize(value);
                    out.insert(key, value);
                }
                Node::Map(out)
            }
            Node::Seq(items) => {
                Node::Seq(items.into_iter().map(|item| self.normalize(item)).collect())
            }
            scalar => scalar,
        }
    }
}

/// Parses the string inside a `$date` wrapper, falling back in tiers: strict
/// RFC 3339 (a trailing literal `Z` normalized to `+00:00` first), then a
/// bare date-time with `Z`/fractional seconds stripped, then the current
/// wall-clock time. Never an error.
fn parse_tagged_date(raw: &Node) -> DateTime<Utc> {
    let Node::Str(raw) = raw else {
        return Utc::now();
    };

    let rfc3339 = if let Some(stripped) = raw.strip_suffix('Z') {
        format!("{stripped}+00:00")
    } else {
        raw.clone()
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&rfc3339) {
        return parsed.with_timezone(&Utc);
    }

    let bare = raw.trim_end_matches('Z');
    let bare = bare.split('.').next().unwrap_or(bare);
    if let Ok(parsed) = NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S") {
        return Utc.from_utc_datetime(&parsed);
    }

    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn normalizer() -> DocumentNormalizer {
        DocumentNormalizer::new(NormalizerRules::default())
    }

    fn map(entries: Vec<(&str, Node)>) -> Node {
        Node::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn date_tag_becomes_native_timestamp() {
        let doc = map(vec![("CreatedOn", Node::date_tag("2025-12-21T00:00:00.000Z"))]);
        let expected = Utc.with_ymd_and_hms(2025, 12, 21, 0, 0, 0).unwrap();

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        assert_eq!(out["CreatedOn"], Node::DateTime(expected));
    }

    #[test]
    fn bare_date_time_parses_via_second_tier() {
        let doc = map(vec![("UpdatedOn", Node::date_tag("2024-02-29T13:37:00"))]);
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 13, 37, 0).unwrap();

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        assert_eq!(out["UpdatedOn"], Node::DateTime(expected));
    }

    #[test]
    fn malformed_date_falls_back_without_error() {
        let doc = map(vec![("CreatedOn", Node::date_tag("not-a-date"))]);

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        // Fallback fired: the field survives and holds some valid timestamp.
        assert!(matches!(out["CreatedOn"], Node::DateTime(_)));
    }

    #[test]
    fn identity_field_is_removed_even_when_nested() {
        let doc = map(vec![
            ("_id", Node::id_tag("652d9f3be7a1c2b3d4e5f601")),
            (
                "Nested",
                map(vec![
                    ("_id", Node::id_tag("652d9f3be7a1c2b3d4e5f602")),
                    ("Title", Node::str("kept")),
                ]),
            ),
        ]);

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        assert!(!out.contains_key("_id"));
        let Node::Map(nested) = &out["Nested"] else {
            panic!("expected nested mapping");
        };
        assert!(!nested.contains_key("_id"));
        assert_eq!(nested["Title"], Node::str("kept"));
    }

    #[test]
    fn reference_field_with_tagged_id_becomes_null() {
        let doc = map(vec![("Category", Node::id_tag("652d9f3be7a1c2b3d4e5f603"))]);

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        assert_eq!(out["Category"], Node::Null);
    }

    #[test]
    fn stray_id_tag_outside_identity_fields_is_nulled() {
        let doc = map(vec![("Owner", Node::id_tag("652d9f3be7a1c2b3d4e5f604"))]);

        let Node::Map(out) = normalizer().normalize(doc) else {
            panic!("expected mapping");
        };
        assert_eq!(out["Owner"], Node::Null);
    }

    #[test]
    fn sequences_keep_order_and_length() {
        let doc = Node::Seq(vec![
            Node::date_tag("2025-01-01T00:00:00Z"),
            Node::str("plain"),
            Node::Int(7),
        ]);

        let Node::Seq(out) = normalizer().normalize(doc) else {
            panic!("expected sequence");
        };
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0], Node::DateTime(_)));
        assert_eq!(out[1], Node::str("plain"));
        assert_eq!(out[2], Node::Int(7));
    }

    #[test]
    fn normalize_is_idempotent() {
        let doc = map(vec![
            ("_id", Node::id_tag("652d9f3be7a1c2b3d4e5f605")),
            ("Category", Node::id_tag("652d9f3be7a1c2b3d4e5f606")),
            ("CreatedOn", Node::date_tag("2025-12-21T00:00:00.000Z")),
            (
                "Cast",
                Node::Seq(vec![Node::str("one"), Node::str("two")]),
            ),
            ("Views", Node::Int(42)),
        ]);

        let once = normalizer().normalize(doc);
        let twice = normalizer().normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn no_tag_wrappers_survive_anywhere() {
        let doc = map(vec![(
            "Deep",
            Node::Seq(vec![map(vec![(
                "Inner",
                map(vec![("When", Node::date_tag("2023-06-01T12:00:00Z"))]),
            )])]),
        )]);

        fn has_wrapper(node: &Node) -> bool {
            match node {
                Node::Map(map) => {
                    (map.len() == 1 && (map.contains_key(ID_TAG) || map.contains_key(DATE_TAG)))
                        || map.values().any(has_wrapper)
                }
                Node::Seq(items) => items.iter().any(has_wrapper),
                _ => false,
            }
        }

        assert!(!has_wrapper(&normalizer().normalize(doc)));
    }

    #[test]
    fn json_values_convert_to_nodes() {
        let value = serde_json::json!({
            "Title": "clip",
            "Views": 3,
            "Tags": ["a", "b"],
            "Extra": null,
        });

        let node = Node::from(value);
        let Node::Map(map) = &node else {
            panic!("expected mapping");
        };
        assert_eq!(map["Title"], Node::str("clip"));
        assert_eq!(map["Views"], Node::Int(3));
        assert_eq!(
            map["Tags"],
            Node::Seq(vec![Node::str("a"), Node::str("b")])
        );
        assert_eq!(map["Extra"], Node::Null);
    }
}
