use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Activities keyed by name, in the order the server sent them
pub type ActivitiesCollection = IndexMap<String, ActivityDetails>;

/// One activity as served by `GET /activities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub schedule: String,
    pub max_participants: i64,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl ActivityDetails {
    /// Capacity minus current participants. Not clamped: a server that
    /// overbooks shows up as a negative count.
    pub fn spots_left(&self) -> i64 {
        self.max_participants - self.participants.len() as i64
    }
}

/// Body of signup/unregister responses.
/// Success carries `message`, failure carries `detail`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Date,
    /// Keep server order
    Unsorted,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "name" => SortKey::Name,
            "date" => SortKey::Date,
            _ => SortKey::Unsorted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Date => "date",
            SortKey::Unsorted => "none",
        }
    }
}

/// Filter controls as they arrive from the page. Every field is optional;
/// a missing control means that dimension is at its default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BoardQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

/// Normalized filters fed to the projection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardFilters {
    pub category: String,
    pub sort: SortKey,
    /// Lowercased and trimmed, for matching
    pub search: String,
    /// As typed, echoed back into the search box
    pub search_text: String,
}

impl BoardFilters {
    pub fn new(category: &str, sort: SortKey, search: &str) -> Self {
        Self {
            category: category.to_string(),
            sort,
            search: search.trim().to_lowercase(),
            search_text: search.to_string(),
        }
    }
}

impl From<&BoardQuery> for BoardFilters {
    fn from(query: &BoardQuery) -> Self {
        BoardFilters::new(
            query.category.as_deref().unwrap_or(""),
            query.sort.as_deref().map(SortKey::parse).unwrap_or_default(),
            query.search.as_deref().unwrap_or(""),
        )
    }
}
