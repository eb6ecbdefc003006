use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{ActivitiesCollection, ActivityDetails, BoardFilters, SortKey};


pub const LOAD_FAILED_MESSAGE: &str = "Failed to load activities. Please try again later.";

/// Declarative render tree for the board page
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub cards: Vec<ActivityCard>,
    /// Every category present in the cache, for the category control
    pub categories: Vec<String>,
    /// Replaces the list when the last load failed
    pub load_error: Option<&'static str>,
    pub category: String,
    pub sort: &'static str,
    /// Search box contents as the user typed them
    pub search: String,
}

impl BoardView {
    pub fn failed(filters: &BoardFilters) -> Self {
        Self {
            cards: Vec::new(),
            categories: Vec::new(),
            load_error: Some(LOAD_FAILED_MESSAGE),
            category: filters.category.clone(),
            sort: filters.sort.as_str(),
            search: filters.search_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityCard {
    /// Stable element id derived from the activity name
    pub element_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub schedule: String,
    pub spots_left: i64,
    pub participants: Vec<ParticipantRow>,
    pub register: RegisterAction,
}

impl ActivityCard {
    pub fn availability(&self) -> String {
        format!("{} spots left", self.spots_left)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantRow {
    pub email: String,
    pub remove: UnregisterAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterAction {
    pub activity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnregisterAction {
    pub activity: String,
    pub email: String,
}

/// Projects the cached collection through the filters.
/// Category filter first, then search, then sort.
pub fn project(activities: &ActivitiesCollection, filters: &BoardFilters) -> BoardView {
    let mut selected: Vec<(&String, &ActivityDetails)> = activities
        .iter()
        .filter(|(_, details)| {
            filters.category.is_empty() || details.category.as_deref() == Some(filters.category.as_str())
        })
        .filter(|(name, details)| matches_search(name, details, &filters.search))
        .collect();

    match filters.sort {
        SortKey::Name => selected.sort_by(|a, b| compare_names(a.0, b.0)),
        SortKey::Date => selected.sort_by(|a, b| compare_dates(a.1.date.as_deref(), b.1.date.as_deref())),
        SortKey::Unsorted => {}
    }

    let categories: BTreeSet<&str> = activities
        .values()
        .filter_map(|details| details.category.as_deref())
        .filter(|category| !category.is_empty())
        .collect();

    BoardView {
        cards: selected.into_iter().map(|(name, details)| card(name, details)).collect(),
        categories: categories.into_iter().map(str::to_string).collect(),
        load_error: None,
        category: filters.category.clone(),
        sort: filters.sort.as_str(),
        search: filters.search_text.clone(),
    }
}

/// `needle` is already lowercased; empty matches everything
fn matches_search(name: &str, details: &ActivityDetails, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    name.to_lowercase().contains(needle)
        || details.description.to_lowercase().contains(needle)
        || details
            .category
            .as_deref()
            .is_some_and(|category| category.to_lowercase().contains(needle))
}

/// Case-insensitive, lowercase first when names differ only by case.
/// No collation tables: accented letters order by code point, so "Échecs"
/// sorts after "Zumba".
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Dated entries ascending; undated or unparseable ones after them, in
/// their existing relative order
fn compare_dates(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a.and_then(parse_date), b.and_then(parse_date)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Milliseconds since the epoch. Date-only and offset-less values are read as UTC.
pub fn parse_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn card(name: &str, details: &ActivityDetails) -> ActivityCard {
    let participants = details
        .participants
        .iter()
        .map(|email| ParticipantRow {
            email: email.clone(),
            remove: UnregisterAction {
                activity: name.to_string(),
                email: email.clone(),
            },
        })
        .collect();

    ActivityCard {
        element_id: element_id(name),
        name: name.to_string(),
        description: details.description.clone(),
        category: details.category.clone().unwrap_or_default(),
        date: details.date.clone().unwrap_or_default(),
        schedule: details.schedule.clone(),
        spots_left: details.spots_left(),
        participants,
        register: RegisterAction {
            activity: name.to_string(),
        },
    }
}

fn element_id(name: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("activity-{encoded}")
}
