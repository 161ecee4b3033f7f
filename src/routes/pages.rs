use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::Context;

use super::{base_context, format_percent, load_detail, load_list, render_template, PageQuery};
use crate::backend::{Batch, Review};
use crate::metrics::{genuine_split, BatchStats};
use crate::overlay::UploadPhase;
use crate::session::{
    expired_session_cookie, session_cookie, session_id_from_headers, Credentials, CurrentUser,
    Notice, Session,
};
use crate::state::AppState;
use crate::upload::ACCEPTED_EXTENSIONS;
use crate::views::{BatchListView, DetailView, Page, PageView};

#[derive(Debug, Serialize)]
struct BatchRow {
    id: String,
    name: String,
    status: String,
    completed: bool,
    total_reviews: u64,
    upload_date: String,
    genuine_percentage: String,
    suspicious_percentage: String,
    genuine_bar: f64,
    genuine_count: u64,
    suspicious_count: u64,
}

impl BatchRow {
    fn from_batch(batch: &Batch) -> Self {
        let (genuine_count, suspicious_count) = genuine_split(batch);
        Self {
            id: batch.id.clone(),
            name: batch.batch_name.clone(),
            status: batch.status.clone(),
            completed: batch.is_completed(),
            total_reviews: batch.total_reviews,
            upload_date: batch.upload_date(),
            genuine_percentage: format_percent(batch.genuine_percentage),
            suspicious_percentage: format_percent(batch.suspicious_percentage),
            genuine_bar: batch.genuine_percentage.clamp(0.0, 100.0),
            genuine_count,
            suspicious_count,
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct ListContext {
    loading: bool,
    error: Option<String>,
    stats: BatchStats,
    query: String,
    total: usize,
    rows: Vec<BatchRow>,
}

impl ListContext {
    fn from_view(view: &BatchListView) -> Self {
        Self {
            loading: view.batches.is_loading(),
            error: view.batches.error().map(str::to_string),
            stats: view.stats(),
            query: view.query.clone(),
            total: view.batches.data().map_or(0, Vec::len),
            rows: view.visible().into_iter().map(BatchRow::from_batch).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReviewRow {
    id: String,
    username: String,
    feedback: String,
    rating: String,
    sentiment: &'static str,
    ai_percent: String,
    spam_percent: String,
    has_link: bool,
    is_promotional: bool,
    consistent: bool,
    authenticity_percent: String,
    authenticity_bar: f64,
    tier: &'static str,
    selected: bool,
}

impl ReviewRow {
    fn from_review(review: &Review, selected: bool) -> Self {
        let authenticity = review.authenticity.score * 100.0;
        Self {
            id: review.id.clone(),
            username: review.username.clone(),
            feedback: review.feedback.clone(),
            rating: format!("{}/5", review.rating),
            sentiment: review.tone().label(),
            ai_percent: format!("{:.0}", review.ai_detection.ai_probability * 100.0),
            spam_percent: format_percent(review.spam_detection.score),
            has_link: review.link_detection.has_link,
            is_promotional: review.promotional_keywords.is_promotional,
            consistent: review.is_consistent(),
            authenticity_percent: format!("{:.1}", authenticity),
            authenticity_bar: authenticity.clamp(0.0, 100.0),
            tier: review.tier().label(),
            selected,
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    name: String,
    uploaded_at: String,
    total_reviews: u64,
    genuine_percentage: String,
    suspicious_percentage: String,
}

#[derive(Debug, Serialize)]
struct DetailContext {
    batch_id: String,
    loading: bool,
    error: Option<String>,
    batch: Option<BatchSummary>,
    query: String,
    review_count: usize,
    selected_count: usize,
    rows: Vec<ReviewRow>,
}

impl DetailContext {
    fn from_view(view: &DetailView) -> Self {
        let batch = view.detail.data().map(|d| BatchSummary {
            name: d.batch.display_name().to_string(),
            uploaded_at: d.batch.upload_time(),
            total_reviews: d.batch.total_reviews,
            genuine_percentage: format_percent(d.batch.genuine_percentage),
            suspicious_percentage: format_percent(d.batch.suspicious_percentage),
        });

        Self {
            batch_id: view.batch_id.clone(),
            loading: view.detail.is_loading(),
            error: view.detail.error().map(str::to_string),
            batch,
            query: view.query.clone(),
            review_count: view.reviews().len(),
            selected_count: view.selection_len(),
            rows: view
                .visible()
                .into_iter()
                .map(|r| ReviewRow::from_review(r, view.is_selected(&r.id)))
                .collect(),
        }
    }
}

pub async fn landing() -> impl IntoResponse {
    render_template("landing.html", Context::new())
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    logged_out: Option<String>,
}

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if let Some(id) = session_id_from_headers(&headers) {
        if state.sessions.get(id).await.is_some() {
            return Redirect::to("/dashboard").into_response();
        }
    }

    let mut ctx = Context::new();
    if query.logged_out.is_some() {
        ctx.insert("notices", &[Notice::success("Logged out successfully")]);
    }
    render_template("login.html", ctx).into_response()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(credentials): Form<Credentials>,
) -> Response {
    let email = credentials.email.clone();
    match state
        .sessions
        .login(credentials, state.config.access_password.as_deref())
        .await
    {
        Ok(session) => {
            state
                .sessions
                .notify(session.id, Notice::success("Logged in successfully"))
                .await;
            (
                [(header::SET_COOKIE, session_cookie(session.id))],
                Redirect::to("/dashboard"),
            )
                .into_response()
        }
        Err(e) => {
            tracing::info!("Rejected sign-in for {:?}: {}", email, e);
            let mut ctx = Context::new();
            ctx.insert("email", &email);
            ctx.insert("notices", &[Notice::error(e.to_string())]);
            (StatusCode::UNAUTHORIZED, render_template("login.html", ctx)).into_response()
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, CurrentUser(user): CurrentUser) -> Response {
    state.sessions.logout(user.id).await;
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/login?logged_out=1"),
    )
        .into_response()
}

async fn list_page(
    state: &AppState,
    user: &Session,
    page: Page,
    query: PageQuery,
    template: &str,
    nav: &str,
) -> Html<String> {
    load_list(state, user.id, page, query.keep_view()).await;

    let listing = state
        .sessions
        .with(user.id, |s| {
            let view = s.view.batch_list_mut(page)?;
            if let Some(q) = &query.q {
                view.query = q.trim().to_string();
            }
            Some(ListContext::from_view(view))
        })
        .await
        .flatten()
        .unwrap_or_default();

    let notices = state.sessions.take_notices(user.id).await;
    let mut ctx = base_context(user, nav, &notices);
    ctx.insert("listing", &listing);
    render_template(template, ctx)
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    list_page(&state, &user, Page::Dashboard, query, "dashboard.html", "overview").await
}

pub async fn my_batches(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    list_page(&state, &user, Page::Batches, query, "batches.html", "batches").await
}

pub async fn queue(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    list_page(&state, &user, Page::Queue, query, "queue.html", "queue").await
}

pub async fn batch_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    load_detail(&state, user.id, &id, query.keep_view()).await;

    let detail = state
        .sessions
        .with(user.id, |s| {
            let view = s.view.detail_mut(&id)?;
            if let Some(q) = &query.q {
                view.query = q.trim().to_string();
            }
            Some(DetailContext::from_view(view))
        })
        .await
        .flatten();

    let notices = state.sessions.take_notices(user.id).await;
    let mut ctx = base_context(&user, "overview", &notices);
    ctx.insert("batch_id", &id);
    ctx.insert("detail", &detail);
    render_template("batch_detail.html", ctx)
}

pub async fn upload_page(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    state
        .sessions
        .with(user.id, |s| s.view = PageView::None)
        .await;

    let notices = state.sessions.take_notices(user.id).await;
    let mut ctx = base_context(&user, "add", &notices);
    ctx.insert("accept", &ACCEPTED_EXTENSIONS.join(","));
    render_template("upload.html", ctx)
}

/// Polled by the browser while an upload is in flight.
pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Response {
    let progress = state
        .sessions
        .with(user.id, |s| s.upload.as_ref().map(|t| t.snapshot()))
        .await
        .flatten();

    let Some(progress) = progress else {
        return Redirect::to("/dashboard/add").into_response();
    };

    let settled = match progress.phase {
        UploadPhase::Submitting => None,
        UploadPhase::Succeeded => Some((
            Notice::success("File uploaded successfully! Analysis started."),
            "/dashboard/queue",
        )),
        UploadPhase::Failed(message) => Some((Notice::error(message), "/dashboard/add")),
    };

    if let Some((notice, location)) = settled {
        state
            .sessions
            .with(user.id, |s| {
                s.upload = None;
                s.notices.push(notice);
            })
            .await;
        return Redirect::to(location).into_response();
    }

    let mut ctx = base_context(&user, "add", &[]);
    ctx.insert("filename", &progress.filename);
    ctx.insert("overlay", &progress.overlay_visible);
    render_template("upload_status.html", ctx).into_response()
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        render_template("not_found.html", Context::new()),
    )
}
