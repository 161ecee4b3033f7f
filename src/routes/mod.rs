mod api;
mod pages;

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tera::Context;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::resource::Resource;
use crate::session::{Notice, Session};
use crate::state::AppState;
use crate::views::{BatchListView, DetailView, Page, PageView};

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(pages::landing))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/logout", post(pages::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/dashboard/reviews", get(pages::my_batches))
        .route("/dashboard/batches/:id/delete", post(api::delete_batch))
        .route("/dashboard/batches/:id/download", get(api::download_results))
        .route("/dashboard/queue", get(pages::queue))
        .route("/dashboard/queue/refresh", post(api::refresh_queue))
        .route("/dashboard/queue/:id/remove", post(api::remove_from_queue))
        .route("/dashboard/batch/:id", get(pages::batch_detail))
        .route("/dashboard/batch/:id/select", post(api::toggle_selection))
        .route("/dashboard/batch/:id/selected/download", post(api::download_selected))
        .route("/dashboard/batch/:id/selected/delete", post(api::delete_selected))
        .route("/dashboard/batch/:id/download/all", get(api::download_all))
        .route("/dashboard/batch/:id/download/authentic", get(api::download_authentic))
        .route("/dashboard/add", get(pages::upload_page).post(api::upload))
        .route("/dashboard/add/status", get(pages::upload_status))
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `?q=` sets the search box; `?view=current` re-renders the page from the
/// session instead of fetching it again.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    pub view: Option<String>,
}

impl PageQuery {
    fn keep_view(&self) -> bool {
        self.view.as_deref() == Some("current")
    }
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Failed to render {}: {:?}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}

fn base_context(user: &Session, nav: &str, notices: &[Notice]) -> Context {
    let mut ctx = Context::new();
    ctx.insert("user_email", &user.email);
    ctx.insert("nav", nav);
    ctx.insert("notices", notices);
    ctx
}

/// Fetches the batch list for `page` unless the session already shows it
/// and `keep` is set.
async fn load_list(state: &AppState, sid: Uuid, page: Page, keep: bool) {
    if keep {
        let present = state
            .sessions
            .with(sid, |s| s.view.batch_list(page).is_some())
            .await
            .unwrap_or(false);
        if present {
            return;
        }
    }

    state
        .sessions
        .with(sid, |s| {
            s.view = PageView::for_list(page, BatchListView::new(Resource::Loading));
        })
        .await;

    let status = (page == Page::Queue).then_some("Pending");
    let result = state.backend.list_batches(status).await;
    if let Err(e) = &result {
        tracing::error!("Failed to fetch batches: {}", e);
    }

    state
        .sessions
        .with(sid, |s| {
            if let Some(view) = s.view.batch_list_mut(page) {
                view.batches = Resource::from_result(result);
            }
        })
        .await;
}

async fn load_detail(state: &AppState, sid: Uuid, batch_id: &str, keep: bool) {
    if keep {
        let present = state
            .sessions
            .with(sid, |s| s.view.detail(batch_id).is_some())
            .await
            .unwrap_or(false);
        if present {
            return;
        }
    }

    state
        .sessions
        .with(sid, |s| {
            s.view = PageView::Detail(DetailView::new(batch_id, Resource::Loading));
        })
        .await;

    let result = state.backend.get_batch(batch_id).await;
    if let Err(e) = &result {
        tracing::error!("Failed to load batch {}: {}", batch_id, e);
    }

    state
        .sessions
        .with(sid, |s| {
            if let Some(view) = s.view.detail_mut(batch_id) {
                view.detail = Resource::from_result(result);
            }
        })
        .await;
}

fn safe_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid pattern"));
    let cleaned = unsafe_chars.replace_all(name, "_");
    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "download.json".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Percent-encodes `segment` so it can be placed in a redirect path.
fn path_segment(segment: &str) -> Cow<'_, str> {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    let reserved = RESERVED.get_or_init(|| Regex::new(r"[^A-Za-z0-9._~-]+").expect("valid pattern"));
    reserved.replace_all(segment, |caps: &Captures| {
        caps[0].bytes().map(|b| format!("%{:02X}", b)).collect::<String>()
    })
}

/// Pretty-printed JSON offered as a file download.
fn json_attachment<T: Serialize>(filename: &str, body: &T) -> Response {
    match serde_json::to_string_pretty(body) {
        Ok(json) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", safe_filename(filename)),
                ),
            ],
            json,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to serialize {}: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Whole percentages print without decimals, others with one.
fn format_percent(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
