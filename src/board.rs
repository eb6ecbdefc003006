use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::{Mutex, RwLock};

use crate::api::ActivityApi;
use crate::error::ApiError;
use crate::models::{ActivitiesCollection, BoardFilters};
use crate::projections::{project, BoardView};

pub const REGISTER_PROMPT: &str = "Enter student email to register:";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

/// Non-empty local and domain parts, a dot in the domain, no whitespace or extra `@`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// How the board talks to whoever is driving it
pub trait Interaction {
    /// Ask for a line of input; `None` means the user cancelled
    fn prompt(&mut self, message: &str) -> Option<String>;
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { activities: usize },
    Failed,
    /// A newer reload had already been applied
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Server accepted; carries its message
    Completed(String),
    /// Server refused; carries the text shown to the user
    Rejected { status: u16, detail: String },
    /// Transport or decode failure
    Failed,
    InvalidEmail,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Signup,
    Unregister,
}

impl Mutation {
    fn failure_message(self) -> &'static str {
        match self {
            Mutation::Signup => "Failed to sign up. Please try again.",
            Mutation::Unregister => "Failed to unregister. Please try again.",
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    activities: ActivitiesCollection,
    load_failed: bool,
    /// Ticket of the reload whose result is on display
    applied: u64,
}

/// Owns the cached activities and drives fetch, render and mutations.
///
/// Mutations on the same activity run one at a time; mutations on
/// different activities overlap freely. Every reload takes a ticket when
/// it is issued, and a result is dropped if a later-issued reload has
/// already been applied.
pub struct ActivityBoard<A> {
    api: A,
    state: RwLock<BoardState>,
    issued: AtomicU64,
    activity_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<A: ActivityApi> ActivityBoard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: RwLock::new(BoardState::default()),
            issued: AtomicU64::new(0),
            activity_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Fetch the full collection and replace the cache
    pub async fn load(&self) -> LoadOutcome {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.api.fetch_activities().await;
        self.commit(ticket, result).await
    }

    async fn commit(&self, ticket: u64, result: Result<ActivitiesCollection, ApiError>) -> LoadOutcome {
        let mut state = self.state.write().await;
        if ticket < state.applied {
            tracing::debug!(ticket, applied = state.applied, "dropping stale reload");
            return LoadOutcome::Superseded;
        }
        state.applied = ticket;

        match result {
            Ok(activities) => {
                let count = activities.len();
                state.activities = activities;
                state.load_failed = false;
                tracing::debug!(count, "activities loaded");
                LoadOutcome::Loaded { activities: count }
            }
            Err(e) => {
                state.load_failed = true;
                tracing::error!("Error fetching activities: {e}");
                LoadOutcome::Failed
            }
        }
    }

    /// Project the current cache. The failure message stands in for the
    /// list until the next successful load.
    pub async fn render(&self, filters: &BoardFilters) -> BoardView {
        let state = self.state.read().await;
        if state.load_failed {
            return BoardView::failed(filters);
        }
        project(&state.activities, filters)
    }

    pub async fn snapshot(&self) -> ActivitiesCollection {
        self.state.read().await.activities.clone()
    }

    pub async fn register_participant<I>(&self, activity: &str, ui: &mut I) -> MutationOutcome
    where
        I: Interaction + Send,
    {
        let raw = match ui.prompt(REGISTER_PROMPT) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return MutationOutcome::Cancelled,
        };
        let email = raw.trim();
        if !is_valid_email(email) {
            ui.alert(INVALID_EMAIL_MESSAGE);
            return MutationOutcome::InvalidEmail;
        }

        self.mutate(Mutation::Signup, activity, email, ui).await
    }

    pub async fn unregister_participant<I>(&self, activity: &str, email: &str, ui: &mut I) -> MutationOutcome
    where
        I: Interaction + Send,
    {
        self.mutate(Mutation::Unregister, activity, email, ui).await
    }

    async fn activity_lock(&self, activity: &str) -> Arc<Mutex<()>> {
        let mut locks = self.activity_locks.lock().await;
        locks.entry(activity.to_string()).or_default().clone()
    }

    /// Drops the map entry once no other mutation holds or waits on it
    async fn release_lock(&self, activity: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.activity_locks.lock().await;
        drop(lock);
        if locks.get(activity).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(activity);
        }
    }

    async fn mutate<I>(&self, kind: Mutation, activity: &str, email: &str, ui: &mut I) -> MutationOutcome
    where
        I: Interaction + Send,
    {
        let lock = self.activity_lock(activity).await;
        let result = {
            let _guard = lock.lock().await;
            match kind {
                Mutation::Signup => self.api.signup(activity, email).await,
                Mutation::Unregister => self.api.unregister(activity, email).await,
            }
        };
        self.release_lock(activity, lock).await;

        // Participant addresses stay at debug level
        match result {
            Ok(message) => {
                tracing::info!(?kind, activity, "mutation accepted");
                tracing::debug!(?kind, activity, email, "{message}");
                ui.alert(&message);
                self.load().await;
                MutationOutcome::Completed(message)
            }
            Err(ApiError::Rejected { status, detail }) => {
                let detail = detail.unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
                tracing::warn!(?kind, activity, status, "mutation rejected");
                tracing::debug!(?kind, activity, email, "{detail}");
                ui.alert(&detail);
                MutationOutcome::Rejected { status, detail }
            }
            Err(e) => {
                tracing::error!(?kind, activity, "request failed: {e}");
                tracing::debug!(?kind, activity, email, "request failed");
                ui.alert(kind.failure_message());
                MutationOutcome::Failed
            }
        }
    }
}
