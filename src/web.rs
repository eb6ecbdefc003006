use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::ActivityApi;
use crate::board::{ActivityBoard, Interaction, REGISTER_PROMPT};
use crate::error::WebError;
use crate::models::{BoardFilters, BoardQuery};
use crate::projections::BoardView;

type SharedBoard<A> = Arc<ActivityBoard<A>>;

/// One `<option>` of a filter control
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "board.html")]
struct BoardTemplate<'a> {
    view: &'a BoardView,
    notices: Vec<String>,
    category_options: Vec<SelectOption>,
    sort_options: Vec<SelectOption>,
    register_prompt: &'static str,
}

fn category_options(view: &BoardView) -> Vec<SelectOption> {
    let mut options = vec![SelectOption {
        value: String::new(),
        label: "All Categories".to_string(),
        selected: view.category.is_empty(),
    }];
    options.extend(view.categories.iter().map(|category| SelectOption {
        value: category.clone(),
        label: category.clone(),
        selected: *category == view.category,
    }));
    options
}

fn sort_options(view: &BoardView) -> Vec<SelectOption> {
    [("name", "Name"), ("date", "Date"), ("none", "Server order")]
        .into_iter()
        .map(|(value, label)| SelectOption {
            value: value.to_string(),
            label: label.to_string(),
            selected: view.sort == value,
        })
        .collect()
}

fn render_page(view: &BoardView, notices: Vec<String>) -> Result<Html<String>, WebError> {
    let template = BoardTemplate {
        view,
        notices,
        category_options: category_options(view),
        sort_options: sort_options(view),
        register_prompt: REGISTER_PROMPT,
    };
    Ok(Html(template.render()?))
}

/// Answers the board's prompt from a submitted form field and collects
/// alerts so they can be shown on the returned page
#[derive(Debug, Default)]
pub struct FormInteraction {
    answer: Option<String>,
    pub notices: Vec<String>,
}

impl FormInteraction {
    pub fn new(answer: Option<String>) -> Self {
        Self {
            answer,
            notices: Vec::new(),
        }
    }
}

impl Interaction for FormInteraction {
    fn prompt(&mut self, _message: &str) -> Option<String> {
        self.answer.take()
    }

    fn alert(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

/// Form posted by the register and remove buttons. Filter fields ride
/// along so the page comes back the way it was.
#[derive(Debug, Deserialize)]
pub struct ParticipantForm {
    pub activity: String,
    pub email: Option<String>,
    #[serde(flatten)]
    pub filters: BoardQuery,
}

pub fn router<A: ActivityApi>(board: SharedBoard<A>) -> Router {
    Router::new()
        .route("/", get(board_page::<A>))
        .route("/board/register", post(register::<A>))
        .route("/board/unregister", post(unregister::<A>))
        .route("/board/reload", post(reload::<A>))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(board)
}

async fn board_page<A: ActivityApi>(
    State(board): State<SharedBoard<A>>,
    Query(query): Query<BoardQuery>,
) -> Result<Html<String>, WebError> {
    let filters = BoardFilters::from(&query);
    let view = board.render(&filters).await;
    tracing::debug!(cards = view.cards.len(), "rendering board");
    render_page(&view, Vec::new())
}

async fn register<A: ActivityApi>(
    State(board): State<SharedBoard<A>>,
    Form(form): Form<ParticipantForm>,
) -> Result<Html<String>, WebError> {
    let mut ui = FormInteraction::new(form.email);
    board.register_participant(&form.activity, &mut ui).await;

    let view = board.render(&BoardFilters::from(&form.filters)).await;
    render_page(&view, ui.notices)
}

async fn unregister<A: ActivityApi>(
    State(board): State<SharedBoard<A>>,
    Form(form): Form<ParticipantForm>,
) -> Result<Html<String>, WebError> {
    let mut ui = FormInteraction::default();
    match form.email.as_deref() {
        Some(email) => {
            board.unregister_participant(&form.activity, email, &mut ui).await;
        }
        None => ui.alert("Missing participant email."),
    }

    let view = board.render(&BoardFilters::from(&form.filters)).await;
    render_page(&view, ui.notices)
}

async fn reload<A: ActivityApi>(
    State(board): State<SharedBoard<A>>,
    Form(query): Form<BoardQuery>,
) -> Result<Html<String>, WebError> {
    board.load().await;
    let view = board.render(&BoardFilters::from(&query)).await;
    render_page(&view, Vec::new())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
