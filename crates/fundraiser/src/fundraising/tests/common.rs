use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::config::ProgramConfig;
use crate::fundraising::domain::{
    Amount, DonationSubmission, Intern, InternRegistration, UserId,
};
use crate::fundraising::repository::{FundraisingRepository, LedgerStore, RepositoryError};
use crate::fundraising::service::DonationReceipt;
use crate::fundraising::{fundraising_router, FundraisingService, SqliteRepository};

pub(super) type SqliteService = FundraisingService<SqliteRepository>;

pub(super) fn program() -> ProgramConfig {
    ProgramConfig {
        default_goal: Amount::from_dollars(100),
    }
}

pub(super) fn build_service() -> (SqliteService, Arc<SqliteRepository>) {
    let repository = Arc::new(SqliteRepository::in_memory().expect("in-memory database"));
    let service = FundraisingService::new(repository.clone(), program());
    (service, repository)
}

pub(super) fn registration(username: &str) -> InternRegistration {
    InternRegistration {
        user_id: UserId(format!("user-{username}")),
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: "Intern".to_string(),
        email: format!("{username}@example.org"),
        goal_amount: None,
    }
}

pub(super) fn register(service: &SqliteService, username: &str) -> Intern {
    service
        .register_intern(registration(username))
        .expect("registration succeeds")
}

pub(super) fn submission(referral_code: &str, dollars: i64) -> DonationSubmission {
    DonationSubmission {
        referral_code: referral_code.to_string(),
        amount: Some(Amount::from_dollars(dollars)),
        donor_name: Some("Grace".to_string()),
        donor_email: Some("grace@example.org".to_string()),
        message: Some("Go team".to_string()),
    }
}

pub(super) fn donate(service: &SqliteService, intern: &Intern, dollars: i64) -> DonationReceipt {
    service
        .record_donation(submission(&intern.referral_code, dollars))
        .expect("donation succeeds")
}

pub(super) struct UnavailableRepository;

impl FundraisingRepository for UnavailableRepository {
    fn atomically<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn LedgerStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) fn unavailable_service() -> FundraisingService<UnavailableRepository> {
    FundraisingService::new(Arc::new(UnavailableRepository), program())
}

pub(super) fn router_with_service(service: SqliteService) -> axum::Router {
    fundraising_router(Arc::new(service))
}

pub(super) fn assert_not_found_response(response: &Response) {
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
