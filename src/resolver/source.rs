//! Name source descriptions
//!
//! Every upstream API returns some JSON document holding an array of
//! entries, each entry holding one name. A source records where to fetch the
//! document and two JSON pointers: one to the array, one to the name inside
//! each entry.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where and how to fetch the names of one mode
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NameSource {
    pub url: String,
    /// Query string parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    /// JSON pointer to the array of entries ("" = the document itself)
    #[serde(default)]
    pub items: String,
    /// JSON pointer to the name inside one entry
    pub field: String,
}

impl NameSource {
    pub fn new(url: &str, items: &str, field: &str) -> Self {
        Self {
            url: url.to_string(),
            query: BTreeMap::new(),
            items: items.to_string(),
            field: field.to_string(),
        }
    }

    pub fn with_query(mut self, params: &[(&str, &str)]) -> Self {
        for (key, value) in params {
            self.query.insert((*key).to_string(), (*value).to_string());
        }
        self
    }

    /// Pull the names out of a response document
    ///
    /// Entries without a string at `field` are skipped. Fails if `items`
    /// does not point at an array.
    pub fn extract(&self, document: &Value) -> Result<Vec<String>, String> {
        let entries = document
            .pointer(&self.items)
            .and_then(Value::as_array)
            .ok_or_else(|| format!("no array at '{}'", self.items))?;

        Ok(entries
            .iter()
            .filter_map(|entry| entry.pointer(&self.field))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}

/// Built-in source table for the supported modes
pub fn default_sources() -> HashMap<String, NameSource> {
    let cargo_query = |url: &str, table: &str, field: &str| {
        NameSource::new(url, "/cargoquery", &format!("/title/{}", field)).with_query(&[
            ("action", "cargoquery"),
            ("tables", table),
            ("fields", field),
            ("format", "json"),
            ("origin", "*"),
        ])
    };

    HashMap::from([
        (
            "pokemon".to_string(),
            NameSource::new("https://pokeapi.co/api/v2/pokemon", "/results", "/name")
                .with_query(&[("limit", "10000")]),
        ),
        (
            "digimon".to_string(),
            NameSource::new("https://digimon-api.vercel.app/api/digimon", "", "/name"),
        ),
        (
            "temtem".to_string(),
            NameSource::new("https://temtem-api.mael.tech/api/temtems", "", "/name"),
        ),
        (
            "coromon".to_string(),
            NameSource::new(
                "https://coromon.fandom.com/api.php",
                "/query/categorymembers",
                "/title",
            )
            .with_query(&[
                ("action", "query"),
                ("list", "categorymembers"),
                ("cmtitle", "Category:Coromon"),
                ("cmlimit", "max"),
                ("format", "json"),
            ]),
        ),
        (
            "kindredfates".to_string(),
            cargo_query("https://www.kindredfateswiki.com/api.php", "Kinfolk", "name"),
        ),
        (
            "palworld".to_string(),
            cargo_query("https://palworld.wiki.gg/api.php", "Pals", "Pal"),
        ),
    ])
}
