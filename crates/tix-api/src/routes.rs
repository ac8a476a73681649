//! HTTP routes
//!
//! Handlers translate requests into store calls and nothing else; every rule
//! lives in tix-core.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tix_core::error::required;
use tix_core::{
    Comment, CommentWithTicket, NewComment, NewTask, NewTicket, NewUser, Priority, Status, Task,
    Ticket, TicketDetail, TicketFilter, User, UserUpdate, parse_severity,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::response::{ApiResult, Body, Created, Path, Query, created, ok};
use crate::state::AppState;

type AppStateRef = State<Arc<AppState>>;

/// Query parameters for listing tickets. The first filter present wins.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    assignee: Option<i64>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    created_within_days: Option<u32>,
    #[serde(default)]
    created_before_days: Option<u32>,
}

impl ListQuery {
    fn filter(self, legacy_severity_index: bool) -> tix_core::Result<TicketFilter> {
        let filter = if let Some(status) = self.status {
            TicketFilter::Status(status.parse()?)
        } else if let Some(user_id) = self.assignee {
            TicketFilter::Assignee(user_id)
        } else if let Some(severity) = self.severity {
            TicketFilter::Severity(parse_severity(&severity, legacy_severity_index)?)
        } else if let Some(text) = self.search {
            TicketFilter::Search(text)
        } else if let Some(days) = self.created_within_days {
            TicketFilter::CreatedWithinDays(days)
        } else if let Some(days) = self.created_before_days {
            TicketFilter::CreatedBeforeDays(days)
        } else {
            TicketFilter::All
        };
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
struct SeverityQuery {
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct CloseTaskQuery {
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
}

/// Request to create a ticket
#[derive(Debug, Deserialize)]
struct CreateTicketRequest {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default, alias = "assigned_to")]
    assignee_id: Option<i64>,
    #[serde(default, alias = "requestor")]
    requestor_id: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

impl CreateTicketRequest {
    fn into_new_ticket(self) -> tix_core::Result<NewTicket> {
        let priority = self
            .priority
            .map(|p| p.parse::<Priority>())
            .transpose()?;
        Ok(NewTicket {
            id: self.id,
            assignee_id: required(self.assignee_id, "assignee_id")?,
            requestor_id: self.requestor_id,
            title: required(self.title, "title")?,
            description: required(self.description, "description")?,
            priority,
            created_at: None,
        })
    }
}

/// Request to add a task to a ticket
#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default, alias = "assigned_to")]
    assignee_id: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "due_date")]
    due_at: Option<DateTime<Utc>>,
}

/// Request to add a comment to a ticket
#[derive(Debug, Deserialize)]
struct CreateCommentRequest {
    #[serde(default, alias = "user_id")]
    author_id: Option<i64>,
    #[serde(default, alias = "content")]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateCommentRequest {
    #[serde(default, alias = "comment_content")]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default, alias = "user_name")]
    name: Option<String>,
    #[serde(default, alias = "user_email")]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    #[serde(default, alias = "user_name")]
    name: Option<String>,
    #[serde(default, alias = "user_email")]
    email: Option<String>,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tickets(
    State(state): AppStateRef,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Ticket>> {
    let filter = query.filter(state.queries.legacy_severity_index)?;
    ok(state.run(move |db| db.list_tickets(&filter)).await?)
}

async fn list_by_status(state: Arc<AppState>, status: Status) -> ApiResult<Vec<Ticket>> {
    ok(state
        .run(move |db| db.list_tickets(&TicketFilter::Status(status)))
        .await?)
}

async fn open_tickets(State(state): AppStateRef) -> ApiResult<Vec<Ticket>> {
    list_by_status(state, Status::Open).await
}

async fn closed_tickets(State(state): AppStateRef) -> ApiResult<Vec<Ticket>> {
    list_by_status(state, Status::Closed).await
}

async fn tickets_by_user(
    State(state): AppStateRef,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<Ticket>> {
    ok(state.run(move |db| db.tickets_for_user(user_id, None)).await?)
}

async fn tickets_by_user_and_status(
    State(state): AppStateRef,
    Path((user_id, status)): Path<(i64, String)>,
) -> ApiResult<Vec<Ticket>> {
    ok(state
        .run(move |db| db.tickets_for_user(user_id, Some(status.as_str())))
        .await?)
}

async fn tickets_by_severity(
    State(state): AppStateRef,
    Query(query): Query<SeverityQuery>,
) -> ApiResult<Vec<Ticket>> {
    let severity = required(query.severity, "severity")?;
    let priority = parse_severity(&severity, state.queries.legacy_severity_index)?;
    let status = query.status;
    ok(state
        .run(move |db| db.tickets_by_severity(priority, status.as_deref()))
        .await?)
}

async fn search_tickets(
    State(state): AppStateRef,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Ticket>> {
    let text = required(query.q, "q")?;
    ok(state.run(move |db| db.search_tickets(&text)).await?)
}

async fn create_ticket(
    State(state): AppStateRef,
    Body(req): Body<CreateTicketRequest>,
) -> Created<Ticket> {
    let input = req.into_new_ticket()?;
    created(state.run(move |db| db.create_ticket(input)).await?)
}

async fn get_ticket(
    State(state): AppStateRef,
    Path(id): Path<i64>,
) -> ApiResult<TicketDetail> {
    let limit = state.queries.detail_preview_limit;
    ok(state
        .run(move |db| db.ticket_detail_with_limit(id, limit))
        .await?)
}

async fn close_ticket(State(state): AppStateRef, Path(id): Path<i64>) -> ApiResult<Ticket> {
    ok(state.run(move |db| db.close_ticket(id)).await?)
}

async fn ticket_comments(
    State(state): AppStateRef,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Comment>> {
    ok(state.run(move |db| db.comments_for_ticket(id)).await?)
}

async fn add_comment(
    State(state): AppStateRef,
    Path(ticket_id): Path<i64>,
    Body(req): Body<CreateCommentRequest>,
) -> Created<Comment> {
    let input = NewComment::new(
        ticket_id,
        required(req.author_id, "author_id")?,
        required(req.body, "body")?,
    );
    created(state.run(move |db| db.add_comment(input)).await?)
}

async fn ticket_tasks(State(state): AppStateRef, Path(id): Path<i64>) -> ApiResult<Vec<Task>> {
    ok(state.run(move |db| db.tasks_for_ticket(id)).await?)
}

async fn create_task(
    State(state): AppStateRef,
    Path(ticket_id): Path<i64>,
    Body(req): Body<CreateTaskRequest>,
) -> Created<Task> {
    let input = NewTask {
        id: req.id,
        ticket_id,
        assignee_id: required(req.assignee_id, "assignee_id")?,
        title: required(req.title, "title")?,
        description: required(req.description, "description")?,
        due_at: req.due_at,
        created_at: None,
    };
    created(state.run(move |db| db.create_task(input)).await?)
}

async fn list_tasks(State(state): AppStateRef) -> ApiResult<Vec<Task>> {
    ok(state.run(|db| db.list_tasks()).await?)
}

async fn close_task(
    State(state): AppStateRef,
    Path(id): Path<i64>,
    Query(query): Query<CloseTaskQuery>,
) -> ApiResult<Task> {
    let closed_at = query.closed_at.unwrap_or_else(tix_core::db::now);
    ok(state.run(move |db| db.close_task(id, closed_at)).await?)
}

async fn latest_comments(
    State(state): AppStateRef,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<CommentWithTicket>> {
    let limit = query.limit.unwrap_or(state.queries.recent_comments_limit);
    ok(state
        .run(move |db| db.recent_comments_with_ticket(limit))
        .await?)
}

async fn get_comment(State(state): AppStateRef, Path(id): Path<i64>) -> ApiResult<Comment> {
    ok(state.run(move |db| db.get_comment(id)).await?)
}

async fn update_comment(
    State(state): AppStateRef,
    Path(id): Path<i64>,
    Body(req): Body<UpdateCommentRequest>,
) -> ApiResult<Comment> {
    let body = required(req.body, "body")?;
    ok(state.run(move |db| db.update_comment(id, &body)).await?)
}

async fn create_user(
    State(state): AppStateRef,
    Body(req): Body<CreateUserRequest>,
) -> Created<User> {
    let input = NewUser {
        id: req.id,
        name: required(req.name, "name")?,
        email: req.email,
    };
    created(state.run(move |db| db.create_user(input)).await?)
}

async fn get_user(State(state): AppStateRef, Path(id): Path<i64>) -> ApiResult<User> {
    ok(state.run(move |db| db.get_user(id)).await?)
}

async fn update_user(
    State(state): AppStateRef,
    Path(id): Path<i64>,
    Body(req): Body<UpdateUserRequest>,
) -> ApiResult<User> {
    let update = UserUpdate {
        name: req.name,
        email: req.email,
    };
    ok(state.run(move |db| db.update_user(id, update)).await?)
}

async fn user_comments(State(state): AppStateRef, Path(id): Path<i64>) -> ApiResult<Vec<Comment>> {
    let limit = state.queries.recent_comments_limit;
    ok(state
        .run(move |db| db.recent_comments_by_user(id, limit))
        .await?)
}

async fn user_comments_with_count(
    State(state): AppStateRef,
    Path((id, count)): Path<(i64, usize)>,
) -> ApiResult<Vec<Comment>> {
    ok(state
        .run(move |db| db.recent_comments_by_user(id, count))
        .await?)
}

/// Build the router
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/open", get(open_tickets))
        .route("/tickets/closed", get(closed_tickets))
        .route("/tickets/byuser/{id}", get(tickets_by_user))
        .route(
            "/tickets/byuser/{id}/{status}",
            get(tickets_by_user_and_status),
        )
        .route("/tickets/byseverity", get(tickets_by_severity))
        .route("/tickets/search", get(search_tickets))
        .route("/tickets/{id}", get(get_ticket))
        .route("/tickets/{id}/close", post(close_ticket))
        .route(
            "/tickets/{id}/comments",
            get(ticket_comments).post(add_comment),
        )
        .route("/tickets/{id}/tasks", get(ticket_tasks).post(create_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}/close", post(close_task))
        .route("/comments/latest", get(latest_comments))
        .route("/comments/{id}", get(get_comment))
        .route("/comments/{id}/update", post(update_comment))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/update", post(update_user))
        .route("/users/{id}/comments", get(user_comments))
        .route("/users/{id}/comments/{count}", get(user_comments_with_count))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
