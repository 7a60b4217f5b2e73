//! Index settings and mappings applied when a tender index is created

use crate::engine::TENDER_DOC_TYPE;
use serde_json::{json, Value};

/// String fields analyzed as free text; every other string is a keyword
pub const TEXT_FIELDS: [&str; 6] = [
    "title",
    "description",
    "details",
    "name",
    "locality",
    "streetAddress",
];

/// Keywords longer than this are not indexed
pub const KEYWORD_IGNORE_ABOVE: u32 = 256;

/// Analyzer for the whole-document `_all` field
pub const ALL_FIELD_ANALYZER: &str = "spanish";

/// Regex matching the names in [`TEXT_FIELDS`]
pub fn text_fields_pattern() -> String {
    format!("({})", TEXT_FIELDS.join("|"))
}

/// Body sent with the create-index request
pub fn index_mapping() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1
        },
        "mappings": {
            TENDER_DOC_TYPE: {
                "dynamic_templates": [
                    {
                        "texts": {
                            "match_mapping_type": "string",
                            "match_pattern": "regex",
                            "match": text_fields_pattern(),
                            "mapping": { "type": "text" }
                        }
                    },
                    {
                        "keywords": {
                            "match_mapping_type": "string",
                            "mapping": { "type": "keyword", "ignore_above": KEYWORD_IGNORE_ABOVE }
                        }
                    }
                ],
                "_all": {
                    "analyzer": ALL_FIELD_ANALYZER
                },
                "properties": {
                    "status": { "type": "keyword" }
                }
            }
        }
    })
}
