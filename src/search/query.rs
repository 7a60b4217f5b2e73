//! Search request parameters and query building

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

/// Aggregate field covering the whole document
pub const ALL_FIELD: &str = "_all";

/// Exact-match field for the tender status
pub const STATUS_FIELD: &str = "status";

/// Exact-match field for the tender identifier
pub const TENDER_ID_FIELD: &str = "tenderID";

/// Characters the engine refuses in index names
const INDEX_NAME_FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'];

/// Value of an exact-match filter: one space-separated string or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TermValues {
    One(String),
    Many(Vec<String>),
}

impl TermValues {
    /// Values to match; a single string is split on spaces
    pub fn values(&self) -> Vec<String> {
        match self {
            TermValues::One(text) => text
                .split(' ')
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
            TermValues::Many(values) => values.clone(),
        }
    }
}

impl From<&str> for TermValues {
    fn from(value: &str) -> Self {
        TermValues::One(value.to_string())
    }
}

impl From<Vec<&str>> for TermValues {
    fn from(values: Vec<&str>) -> Self {
        TermValues::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Parameters of one search request, from a JSON body or a query string.
///
/// Keys other than these are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct QueryParameters {
    /// Free text matched against the whole document
    #[serde(default)]
    pub query: Option<String>,

    /// Tender status filter
    #[serde(default)]
    pub status: Option<TermValues>,

    /// Tender identifier filter
    #[serde(default)]
    pub tid: Option<TermValues>,

    /// Offset of the first hit (default 0)
    #[serde(default, deserialize_with = "deserialize_start")]
    pub start: Option<u64>,

    /// Index to search (default: the configured default index)
    #[serde(default)]
    #[validate(custom(function = "validate_index_name"))]
    pub api: Option<String>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<TermValues>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_tid(mut self, tid: impl Into<TermValues>) -> Self {
        self.tid = Some(tid.into());
        self
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    /// Effective offset
    pub fn start_or_default(&self) -> u64 {
        self.start.unwrap_or(0)
    }
}

/// Accepts `10` as well as `"10"`, since query strings carry only text
fn deserialize_start<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StartValue {
        Number(u64),
        Text(String),
    }

    match Option::<StartValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StartValue::Number(n)) => Ok(Some(n)),
        Some(StartValue::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(StartValue::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("start must be a non-negative integer, got '{}'", text))),
    }
}

/// Reject names the engine would not accept as an index
pub fn validate_index_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name.len() > 255
        || name.starts_with(['_', '-', '+'])
        || name.contains(INDEX_NAME_FORBIDDEN);

    if invalid {
        let mut err = ValidationError::new("index_name");
        err.message = Some(format!("'{}' is not a valid index name", name).into());
        return Err(err);
    }
    Ok(())
}

/// One condition of a query body
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    /// Full-text match; `all_terms` requires every word to be present
    Match {
        field: String,
        query: String,
        all_terms: bool,
    },
    Term {
        field: String,
        value: String,
    },
    Terms {
        field: String,
        values: Vec<String>,
    },
    Bool {
        must: Vec<Clause>,
    },
}

impl Clause {
    /// Full-text match; text with a space in it must match every word
    pub fn match_text(field: &str, text: &str) -> Self {
        Clause::Match {
            field: field.to_string(),
            query: text.to_string(),
            all_terms: text.contains(' '),
        }
    }

    /// Exact match on one or several values; `None` without values
    pub fn exact(field: &str, mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(Clause::Term {
                field: field.to_string(),
                value: values.remove(0),
            }),
            _ => Some(Clause::Terms {
                field: field.to_string(),
                values,
            }),
        }
    }

    /// Engine JSON for this clause
    pub fn to_json(&self) -> Value {
        match self {
            Clause::MatchAll => json!({"match_all": {}}),
            Clause::Match {
                field,
                query,
                all_terms,
            } => {
                let mut params = json!({"query": query});
                if *all_terms {
                    params["operator"] = json!("and");
                }
                json!({"match": {field.as_str(): params}})
            }
            Clause::Term { field, value } => json!({"term": {field.as_str(): value}}),
            Clause::Terms { field, values } => json!({"terms": {field.as_str(): values}}),
            Clause::Bool { must } => {
                let must: Vec<Value> = must.iter().map(Clause::to_json).collect();
                json!({"bool": {"must": must}})
            }
        }
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Body sent to the engine's search endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryBody {
    pub query: Clause,
}

impl QueryBody {
    pub fn to_json(&self) -> Value {
        json!({"query": self.query.to_json()})
    }
}

/// Maps request parameters to a boolean query
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the query body for `params`.
    ///
    /// Clauses come in the order text, status, tender id. None gives
    /// `match_all`, one is used bare, several are combined under `bool.must`.
    pub fn build(params: &QueryParameters) -> QueryBody {
        let mut clauses = Vec::new();

        if let Some(text) = params.query.as_deref().filter(|t| !t.is_empty()) {
            clauses.push(Clause::match_text(ALL_FIELD, text));
        }

        if let Some(status) = &params.status {
            clauses.extend(Clause::exact(STATUS_FIELD, status.values()));
        }

        if let Some(tid) = &params.tid {
            clauses.extend(Clause::exact(TENDER_ID_FIELD, tid.values()));
        }

        let query = match clauses.len() {
            0 => Clause::MatchAll,
            1 => clauses.remove(0),
            _ => Clause::Bool { must: clauses },
        };

        QueryBody { query }
    }
}
