use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{DonationSubmission, InternId, InternRegistration, NotificationId};
use super::repository::FundraisingRepository;
use super::service::{FundraisingError, FundraisingService};
use super::views::{DashboardView, DonationReceiptView, InternView, LeaderboardEntry};

/// Router builder exposing the intern, leaderboard, and public donation endpoints.
pub fn fundraising_router<R>(service: Arc<FundraisingService<R>>) -> Router
where
    R: FundraisingRepository + 'static,
{
    Router::new()
        .route("/api/v1/interns", post(register_handler::<R>))
        .route("/api/v1/interns/:intern_id", get(intern_handler::<R>))
        .route(
            "/api/v1/interns/:intern_id/dashboard",
            get(dashboard_handler::<R>),
        )
        .route(
            "/api/v1/interns/:intern_id/notifications",
            get(notifications_handler::<R>),
        )
        .route(
            "/api/v1/interns/:intern_id/notifications/:notification_id/read",
            post(mark_read_handler::<R>),
        )
        .route(
            "/api/v1/interns/:intern_id/achievements",
            get(achievements_handler::<R>),
        )
        .route("/api/v1/leaderboard", get(leaderboard_handler::<R>))
        .route("/api/v1/donations", post(donation_handler::<R>))
        .with_state(service)
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    payload: Result<Json<InternRegistration>, JsonRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Json(registration) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.register_intern(registration) {
        Ok(intern) => (StatusCode::CREATED, Json(InternView::from(&intern))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn intern_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    intern_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Path(intern_id) = match intern_id {
        Ok(path) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.intern(InternId(intern_id)) {
        Ok(intern) => (StatusCode::OK, Json(InternView::from(&intern))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    intern_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Path(intern_id) = match intern_id {
        Ok(path) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.dashboard(InternId(intern_id)) {
        Ok(snapshot) => (StatusCode::OK, Json(DashboardView::from(&snapshot))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn notifications_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    intern_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Path(intern_id) = match intern_id {
        Ok(path) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.notifications(InternId(intern_id)) {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn mark_read_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Path((intern_id, notification_id)) = match ids {
        Ok(path) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.mark_read(InternId(intern_id), NotificationId(notification_id)) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "notification_id": notification_id,
                "is_read": true,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn achievements_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    intern_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Path(intern_id) = match intern_id {
        Ok(path) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.achievements(InternId(intern_id)) {
        Ok(achievements) => (StatusCode::OK, Json(achievements)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn leaderboard_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    match service.leaderboard() {
        Ok(interns) => {
            let entries: Vec<LeaderboardEntry> =
                interns.iter().map(LeaderboardEntry::from).collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donation_handler<R>(
    State(service): State<Arc<FundraisingService<R>>>,
    payload: Result<Json<DonationSubmission>, JsonRejection>,
) -> Response
where
    R: FundraisingRepository + 'static,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    match service.record_donation(submission) {
        Ok(receipt) => {
            (StatusCode::CREATED, Json(DonationReceiptView::from(&receipt))).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Malformed paths and bodies, including unparseable amounts, are validation failures.
fn bad_request(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

pub(crate) fn error_response(error: FundraisingError) -> Response {
    let status = match &error {
        FundraisingError::Validation(_) => StatusCode::BAD_REQUEST,
        FundraisingError::NotFound(_) => StatusCode::NOT_FOUND,
        FundraisingError::Conflict(_) => StatusCode::CONFLICT,
        FundraisingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}
