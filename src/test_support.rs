//! Shared fixtures for the crate's tests: sample data, a scripted
//! `ActivityApi`, and an in-process fake of the activities server.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::api::ActivityApi;
use crate::board::Interaction;
use crate::error::ApiError;
use crate::models::{ActivitiesCollection, ActivityDetails};

pub fn activity(
    description: &str,
    category: Option<&str>,
    date: Option<&str>,
    max_participants: i64,
    participants: &[&str],
) -> ActivityDetails {
    ActivityDetails {
        description: description.to_string(),
        category: category.map(str::to_string),
        date: date.map(str::to_string),
        schedule: "Fridays, 3:30 PM - 5:00 PM".to_string(),
        max_participants,
        participants: participants.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn sample_activities() -> ActivitiesCollection {
    let mut activities = ActivitiesCollection::new();
    activities.insert(
        "Programming Class".to_string(),
        activity("Learn programming fundamentals", Some("Academic"), Some("2024-03-15"), 20, &[]),
    );
    activities.insert(
        "Chess Club".to_string(),
        activity("Learn strategies and compete", Some("Games"), Some("2024-05-01"), 10, &["a@x.com"]),
    );
    activities.insert(
        "Gym Class".to_string(),
        activity("Physical education", Some("Sports"), None, 30, &["b@x.com", "c@x.com"]),
    );
    activities
}

/// Canned answers for the board tests, with a log of what was called
#[derive(Default)]
pub struct ScriptedApi {
    pub fetches: Mutex<VecDeque<Result<ActivitiesCollection, ApiError>>>,
    pub mutations: Mutex<VecDeque<Result<String, ApiError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fetch(&self, result: Result<ActivitiesCollection, ApiError>) {
        self.fetches.lock().unwrap().push_back(result);
    }

    pub fn push_mutation(&self, result: Result<String, ApiError>) {
        self.mutations.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_mutation(&self) -> Result<String, ApiError> {
        self.mutations
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted mutation response left")
    }
}

impl ActivityApi for ScriptedApi {
    async fn fetch_activities(&self) -> Result<ActivitiesCollection, ApiError> {
        self.record("GET /activities".to_string());
        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted fetch response left")
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        self.record(format!("POST {activity} signup {email}"));
        self.next_mutation()
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        self.record(format!("DELETE {activity} unregister {email}"));
        self.next_mutation()
    }
}

/// Holds every mutation at a gate until permits are handed out, so tests
/// can see which calls reached the server while others are still parked
pub struct GatedApi {
    calls: Mutex<Vec<String>>,
    gate: Semaphore,
}

impl GatedApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        }
    }

    /// Lets `permits` parked or future mutations complete
    pub fn open(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn pass(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        self.gate.acquire().await.expect("gate closed").forget();
    }
}

impl ActivityApi for GatedApi {
    async fn fetch_activities(&self) -> Result<ActivitiesCollection, ApiError> {
        Ok(ActivitiesCollection::new())
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        self.pass(format!("POST {activity} signup {email}")).await;
        Ok(format!("Signed up {email}"))
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        self.pass(format!("DELETE {activity} unregister {email}")).await;
        Ok(format!("Unregistered {email}"))
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Records alerts and answers prompts from a fixed reply
#[derive(Debug, Default)]
pub struct RecordingUi {
    pub reply: Option<String>,
    pub prompts: Vec<String>,
    pub alerts: Vec<String>,
}

impl RecordingUi {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }
}

impl Interaction for RecordingUi {
    fn prompt(&mut self, message: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.reply.clone()
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

pub fn malformed_json_error() -> ApiError {
    ApiError::Decode(serde_json::from_str::<serde_json::Value>("not json").unwrap_err())
}

#[derive(Clone)]
struct FakeState {
    activities: Arc<Mutex<ActivitiesCollection>>,
    fetches: Arc<AtomicUsize>,
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

type Reply = (StatusCode, Json<serde_json::Value>);

fn detail(status: StatusCode, message: &str) -> Reply {
    (status, Json(serde_json::json!({ "detail": message })))
}

async fn list_activities(State(state): State<FakeState>) -> Json<ActivitiesCollection> {
    state.fetches.fetch_add(1, Ordering::SeqCst);
    Json(state.activities.lock().unwrap().clone())
}

async fn signup(
    State(state): State<FakeState>,
    Path(name): Path<String>,
    Query(query): Query<EmailQuery>,
) -> Reply {
    let mut activities = state.activities.lock().unwrap();
    let Some(details) = activities.get_mut(&name) else {
        return detail(StatusCode::NOT_FOUND, "Activity not found");
    };
    if details.participants.contains(&query.email) {
        return detail(StatusCode::BAD_REQUEST, "Student is already signed up");
    }
    details.participants.push(query.email.clone());
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": format!("Signed up {} for {}", query.email, name) })),
    )
}

async fn unregister(
    State(state): State<FakeState>,
    Path(name): Path<String>,
    Query(query): Query<EmailQuery>,
) -> Reply {
    let mut activities = state.activities.lock().unwrap();
    let Some(details) = activities.get_mut(&name) else {
        return detail(StatusCode::NOT_FOUND, "Activity not found");
    };
    let before = details.participants.len();
    details.participants.retain(|p| p != &query.email);
    if details.participants.len() == before {
        return detail(StatusCode::NOT_FOUND, "Participant not found");
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": format!("Unregistered {} from {}", query.email, name) })),
    )
}

async fn broken() -> &'static str {
    "<html>upstream exploded</html>"
}

/// In-process activities server bound to an ephemeral port
pub struct FakeServer {
    addr: SocketAddr,
    state: FakeState,
}

impl FakeServer {
    pub async fn start(activities: ActivitiesCollection) -> Self {
        let state = FakeState {
            activities: Arc::new(Mutex::new(activities)),
            fetches: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/activities", get(list_activities))
            .route("/activities/:name/signup", post(signup))
            .route("/activities/:name/unregister", delete(unregister))
            .route("/broken/activities", get(broken))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn snapshot(&self) -> ActivitiesCollection {
        self.state.activities.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }
}
