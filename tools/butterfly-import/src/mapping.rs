//! Tag classification rules
//!
//! A mapping file lists output tables, each with a geometry type and the
//! tag keys/values that select elements for it:
//!
//! ```yaml
//! tables:
//!   roads:
//!     type: linestring
//!     mapping:
//!       highway: [__any__]
//!   buildings:
//!     type: polygon
//!     mapping:
//!       building: [__any__]
//!       amenity: [school, hospital]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use butterfly_common::{Error, Result, Tags};
use serde::Deserialize;

/// Value wildcard accepting any tag value
pub const ANY: &str = "__any__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    LineString,
    Polygon,
}

impl TableType {
    pub fn as_str(self) -> &'static str {
        match self {
            TableType::LineString => "linestring",
            TableType::Polygon => "polygon",
        }
    }
}

/// One matched rule: the table it belongs to and the tag that selected it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub table: String,
    pub key: String,
    pub value: String,
}

/// Classification contract: deterministic for identical tags.
pub trait TagMatcher: Send + Sync {
    fn matches(&self, tags: &Tags) -> Vec<Match>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Table {
    #[serde(rename = "type")]
    pub kind: TableType,
    pub mapping: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mapping {
    pub tables: BTreeMap<String, Table>,
}

impl Mapping {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text).map_err(|e| match e {
            Error::InvalidInput(msg) => {
                Error::InvalidInput(format!("{}: {msg}", path.as_ref().display()))
            }
            other => other,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("invalid mapping: {e}")))
    }

    /// Matcher over all tables of the given geometry type
    pub fn matcher(&self, kind: TableType) -> TableMatcher {
        let mut rules: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for (name, table) in self.tables.iter().filter(|(_, t)| t.kind == kind) {
            for (key, values) in &table.mapping {
                let entry = rules.entry(key.clone()).or_default();
                for value in values {
                    entry.push((value.clone(), name.clone()));
                }
            }
        }
        TableMatcher { rules }
    }
}

/// Key/value rules compiled from a [`Mapping`]
#[derive(Debug, Clone, Default)]
pub struct TableMatcher {
    // tag key -> (value or ANY, table)
    rules: BTreeMap<String, Vec<(String, String)>>,
}

impl TableMatcher {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TagMatcher for TableMatcher {
    fn matches(&self, tags: &Tags) -> Vec<Match> {
        let mut matches: Vec<Match> = Vec::new();
        for (key, value) in tags {
            let Some(rules) = self.rules.get(key) else {
                continue;
            };
            for (rule_value, table) in rules {
                if rule_value != ANY && rule_value != value {
                    continue;
                }
                // one match per table, first key wins
                if matches.iter().any(|m| &m.table == table) {
                    continue;
                }
                matches.push(Match {
                    table: table.clone(),
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"
tables:
  roads:
    type: linestring
    mapping:
      highway: [__any__]
  railways:
    type: linestring
    mapping:
      railway: [rail, tram]
  buildings:
    type: polygon
    mapping:
      building: [__any__]
      amenity: [school]
"#;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_linestring_matcher() {
        let mapping = Mapping::from_yaml_str(MAPPING).unwrap();
        let matcher = mapping.matcher(TableType::LineString);

        let found = matcher.matches(&tags(&[("highway", "primary"), ("name", "A12")]));
        assert_eq!(
            found,
            vec![Match {
                table: "roads".to_string(),
                key: "highway".to_string(),
                value: "primary".to_string(),
            }]
        );

        assert!(matcher.matches(&tags(&[("railway", "abandoned")])).is_empty());
        assert_eq!(matcher.matches(&tags(&[("railway", "tram")])).len(), 1);
    }

    #[test]
    fn test_one_match_per_table() {
        let mapping = Mapping::from_yaml_str(MAPPING).unwrap();
        let matcher = mapping.matcher(TableType::Polygon);

        let found = matcher.matches(&tags(&[("amenity", "school"), ("building", "yes")]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "amenity");
    }

    #[test]
    fn test_polygon_matcher_ignores_linestring_tables() {
        let mapping = Mapping::from_yaml_str(MAPPING).unwrap();
        let matcher = mapping.matcher(TableType::Polygon);
        assert!(matcher.matches(&tags(&[("highway", "primary")])).is_empty());
    }

    #[test]
    fn test_invalid_mapping() {
        let err =
            Mapping::from_yaml_str("tables: {roads: {type: circle, mapping: {}}}").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
