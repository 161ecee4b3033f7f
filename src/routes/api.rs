use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{json_attachment, load_detail, load_list, path_segment};
use crate::backend::BackendClient;
use crate::exports::{self, ExportError};
use crate::overlay::{race_overlay, OverlayTimings, UploadPhase, UploadTracker};
use crate::session::{CurrentUser, Notice};
use crate::state::AppState;
use crate::upload::{check_extension, prepare_batch, FileKind, UploadError};
use crate::views::{DetailView, Page, PageView};

fn detail_location(batch_id: &str) -> String {
    format!("/dashboard/batch/{}?view=current", path_segment(batch_id))
}

/// Deletes a batch on the backend and drops it from the list on screen.
async fn delete_listed_batch(
    state: &AppState,
    user_id: uuid::Uuid,
    page: Page,
    batch_id: &str,
    success: impl FnOnce(&str) -> String,
) {
    let name = state
        .sessions
        .with(user_id, |s| {
            s.view
                .batch_list(page)
                .and_then(|v| v.find(batch_id))
                .map(|b| b.batch_name.clone())
        })
        .await
        .flatten()
        .unwrap_or_else(|| batch_id.to_string());

    match state.backend.delete_batch(batch_id).await {
        Ok(()) => {
            tracing::info!("Deleted batch {} ({})", batch_id, name);
            state
                .sessions
                .with(user_id, |s| {
                    if let Some(view) = s.view.batch_list_mut(page) {
                        view.remove(batch_id);
                    }
                    s.notices.push(Notice::success(success(&name)));
                })
                .await;
        }
        Err(e) => {
            tracing::error!("Failed to delete batch {}: {}", batch_id, e);
            state
                .sessions
                .notify(user_id, Notice::error(format!("Could not remove {}", name)))
                .await;
        }
    }
}

pub async fn delete_batch(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Redirect {
    delete_listed_batch(&state, user.id, Page::Batches, &id, |_| {
        "Batch analysis deleted successfully".to_string()
    })
    .await;
    Redirect::to("/dashboard/reviews?view=current")
}

pub async fn remove_from_queue(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Redirect {
    delete_listed_batch(&state, user.id, Page::Queue, &id, |name| {
        format!("Removed {} from queue", name)
    })
    .await;
    Redirect::to("/dashboard/queue?view=current")
}

pub async fn refresh_queue(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Redirect {
    load_list(&state, user.id, Page::Queue, false).await;
    Redirect::to("/dashboard/queue?view=current")
}

/// Full results of one batch, offered from the My Batches page.
pub async fn download_results(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.backend.get_batch(&id).await {
        Ok(detail) => {
            let export = exports::results(&detail);
            tracing::info!("Exporting {} reviews of batch {}", export.count, id);
            state
                .sessions
                .notify(
                    user.id,
                    Notice::success(format!("Downloading {} results...", detail.batch.display_name())),
                )
                .await;
            json_attachment(&export.filename, &export.body)
        }
        Err(e) => {
            tracing::error!("Failed to export batch {}: {}", id, e);
            state
                .sessions
                .notify(user.id, Notice::error(e.user_message()))
                .await;
            Redirect::to("/dashboard/reviews?view=current").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    review_id: String,
}

pub async fn toggle_selection(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Form(form): Form<SelectForm>,
) -> Redirect {
    state
        .sessions
        .with(user.id, |s| {
            if let Some(view) = s.view.detail_mut(&id) {
                view.toggle(&form.review_id);
            }
        })
        .await;
    Redirect::to(&detail_location(&id))
}

/// Builds a download from the detail view currently on screen, or records
/// why it could not be built.
async fn export_from_view(
    state: &AppState,
    user_id: uuid::Uuid,
    batch_id: &str,
    build: impl FnOnce(&mut DetailView) -> Result<(Response, String), ExportError>,
) -> Response {
    load_detail(state, user_id, batch_id, true).await;

    let outcome = state
        .sessions
        .with(user_id, |s| {
            let view = s.view.detail_mut(batch_id)?;
            let outcome = build(view);
            let notice = match &outcome {
                Ok((_, message)) => Notice::success(message.clone()),
                Err(e) => Notice::error(e.to_string()),
            };
            s.notices.push(notice);
            Some(outcome)
        })
        .await
        .flatten();

    match outcome {
        Some(Ok((response, _))) => response,
        _ => Redirect::to(&detail_location(batch_id)).into_response(),
    }
}

pub async fn download_all(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    export_from_view(&state, user.id, &id, |view| {
        let batch = view.detail.data().map(|d| &d.batch);
        let export = exports::separated(batch, view.reviews())?;
        Ok((
            json_attachment(&export.filename, &export.body),
            "Raw file (with genuine + suspicious) downloaded".to_string(),
        ))
    })
    .await
}

pub async fn download_authentic(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    export_from_view(&state, user.id, &id, |view| {
        let batch = view.detail.data().map(|d| &d.batch);
        let export = exports::authentic_only(batch, view.reviews())?;
        Ok((
            json_attachment(&export.filename, &export.body),
            format!("{} genuine reviews downloaded", export.count),
        ))
    })
    .await
}

pub async fn download_selected(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Response {
    export_from_view(&state, user.id, &id, |view| {
        let done = {
            let export = exports::selected(view.selected_reviews())?;
            (
                json_attachment(&export.filename, &export.body),
                format!("{} selected reviews downloaded", export.count),
            )
        };
        view.clear_selection();
        Ok(done)
    })
    .await
}

/// Hides the selected rows from this view. No backend call is made: the
/// detection service exposes no per-review delete.
pub async fn delete_selected(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Redirect {
    state
        .sessions
        .with(user.id, |s| {
            let Some(view) = s.view.detail_mut(&id) else {
                return;
            };
            let notice = if view.selection_len() == 0 {
                Notice::error(ExportError::NothingSelected.to_string())
            } else {
                Notice::success(format!("{} reviews deleted", view.delete_selected()))
            };
            s.notices.push(notice);
        })
        .await;
    Redirect::to(&detail_location(&id))
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Redirect {
    let limit_mb = state.config.max_upload_bytes / (1024 * 1024);
    let read = read_file_field(&mut multipart, limit_mb).await;

    let (filename, data) = match read {
        Ok(Some((filename, data))) if !filename.is_empty() => (filename, data),
        Ok(_) => {
            state
                .sessions
                .notify(user.id, Notice::error(UploadError::NoFile.to_string()))
                .await;
            return Redirect::to("/dashboard/add");
        }
        Err(e) => {
            tracing::warn!("Unreadable upload: {:?}", e);
            state
                .sessions
                .notify(user.id, Notice::error(e.to_string()))
                .await;
            return Redirect::to("/dashboard/add");
        }
    };

    let kind = match check_extension(&filename) {
        Ok(kind) => kind,
        Err(e) => {
            tracing::info!("Rejected upload {}", filename);
            state
                .sessions
                .notify(user.id, Notice::error(e.to_string()))
                .await;
            return Redirect::to("/dashboard/add");
        }
    };

    let tracker = UploadTracker::new(&filename);
    state
        .sessions
        .with(user.id, |s| {
            s.view = PageView::None;
            s.upload = Some(tracker.clone());
        })
        .await;

    let timings = OverlayTimings {
        show_after: state.config.slow_network_after,
        hide_after: state.config.slow_network_hide_after,
    };
    tokio::spawn(submit_upload(
        state.backend.clone(),
        timings,
        tracker,
        filename,
        kind,
        data,
    ));

    Redirect::to("/dashboard/add/status")
}

/// Name and content of the form's `file` field, if it has one.
async fn read_file_field(
    multipart: &mut Multipart,
    limit_mb: usize,
) -> Result<Option<(String, Vec<u8>)>, UploadError> {
    let unreadable = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge { limit_mb }
        } else {
            UploadError::Malformed(e.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(unreadable)?;
        return Ok(Some((filename, data.to_vec())));
    }
    Ok(None)
}

async fn submit_upload(
    backend: BackendClient,
    timings: OverlayTimings,
    tracker: UploadTracker,
    filename: String,
    kind: FileKind,
    data: Vec<u8>,
) {
    let outcome = async {
        let batch = prepare_batch(&filename, kind, &data)?;
        let count = batch.reviews.len();
        race_overlay(backend.create_batch(&batch), timings, |visible| {
            tracker.set_overlay(visible)
        })
        .await?;
        Ok::<_, UploadError>(count)
    }
    .await;

    match outcome {
        Ok(count) => {
            tracing::info!("Submitted {} with {} reviews", filename, count);
            tracker.finish(UploadPhase::Succeeded);
        }
        Err(e) => {
            tracing::error!("Upload of {} failed: {:?}", filename, e);
            tracker.finish(UploadPhase::Failed(e.to_string()));
        }
    }
}
