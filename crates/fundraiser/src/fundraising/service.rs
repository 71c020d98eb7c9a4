use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, DateTime, Utc};
use tracing::{info, warn};

use crate::config::ProgramConfig;

use super::achievements;
use super::domain::{
    Achievement, Donation, DonationSubmission, Intern, InternId, InternRegistration, NewIntern,
    Notification, NotificationId,
};
use super::ledger;
use super::notifier;
use super::referral;
use super::repository::{FundraisingRepository, LedgerStore, RepositoryError};
use super::scoring::{self, Standing};

/// Donations shown on the dashboard.
pub const RECENT_DONATIONS_LIMIT: usize = 5;
/// Newest-first notifications returned by the feed.
pub const NOTIFICATION_FEED_LIMIT: usize = 10;

/// Everything a single donation produced, committed together.
#[derive(Debug, Clone)]
pub struct DonationReceipt {
    pub donation: Donation,
    pub intern: Intern,
    pub unlocked: Vec<Achievement>,
    pub notification: Notification,
}

/// Read model behind the intern dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub intern: Intern,
    pub recent_donations: Vec<Donation>,
    pub unread_notifications: u64,
    pub achievements_count: u64,
    pub total_donations_count: u64,
}

/// Service composing the ledger, scoring, achievement evaluator, and notifier over one
/// repository. Every public operation runs inside a single store transaction.
pub struct FundraisingService<R> {
    repository: Arc<R>,
    program: ProgramConfig,
}

impl<R> FundraisingService<R>
where
    R: FundraisingRepository + 'static,
{
    pub fn new(repository: Arc<R>, program: ProgramConfig) -> Self {
        Self {
            repository,
            program,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Creates the intern profile with a unique referral code, grants `welcome`, and
    /// evaluates the remaining rules against the initial rank.
    pub fn register_intern(
        &self,
        registration: InternRegistration,
    ) -> Result<Intern, FundraisingError> {
        if registration.user_id.0.trim().is_empty() {
            return Err(FundraisingError::Validation(
                "user_id is required".to_string(),
            ));
        }

        let now = Utc::now();
        let base = referral::base_code(&registration.username, now.year()).ok_or_else(|| {
            FundraisingError::Validation("username must contain letters or digits".to_string())
        })?;

        let goal_amount = registration
            .goal_amount
            .unwrap_or(self.program.default_goal);
        if !goal_amount.is_positive() {
            return Err(FundraisingError::Validation(
                "goal_amount must be greater than zero".to_string(),
            ));
        }

        let result: Result<Intern, FundraisingError> = self.repository.atomically(|store| {
            let referral_code =
                referral::unique_code(&base, |candidate| store.referral_code_taken(candidate))?;

            let new_intern = NewIntern {
                user_id: registration.user_id.clone(),
                username: registration.username.trim().to_string(),
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
                email: registration.email.trim().to_string(),
                referral_code,
                goal_amount,
                created_at: now,
            };

            let mut intern = store.insert_intern(&new_intern).map_err(|err| match err {
                RepositoryError::Conflict(_) => FundraisingError::Validation(
                    "an intern profile already exists for this user".to_string(),
                ),
                other => other.into(),
            })?;

            intern.rank = scoring::recompute_rank(store, intern.id)?;
            achievements::grant_welcome(store, &intern, now)?;
            achievements::evaluate(store, &intern, now)?;
            Ok(intern)
        });

        match &result {
            Ok(intern) => info!(
                intern_id = %intern.id,
                referral_code = %intern.referral_code,
                "intern registered"
            ),
            Err(FundraisingError::Repository(err)) => warn!(error = %err, "registration failed"),
            Err(_) => {}
        }
        result
    }

    /// Records a donation against the intern owning the referral code.
    ///
    /// Ledger append, total increment, points, rank, achievements, and the notification
    /// commit together or not at all.
    pub fn record_donation(
        &self,
        submission: DonationSubmission,
    ) -> Result<DonationReceipt, FundraisingError> {
        let now = Utc::now();
        let donor = submission.donor();
        let code = submission.referral_code.trim();

        let result: Result<DonationReceipt, FundraisingError> =
            self.repository.atomically(|store| {
                let mut intern = store
                    .intern_by_referral_code(code)?
                    .ok_or_else(|| {
                        FundraisingError::NotFound("invalid referral code".to_string())
                    })?;
                let amount = ledger::validate_amount(submission.amount)?;

                let donation = ledger::record_donation(store, &mut intern, amount, &donor, now)?;
                intern.points = scoring::recompute_points(store, intern.id)?;
                intern.rank = scoring::recompute_rank(store, intern.id)?;
                let unlocked = achievements::evaluate(store, &intern, now)?;
                let notification = notifier::notify_donation(store, &donation)?;

                Ok(DonationReceipt {
                    donation,
                    intern,
                    unlocked,
                    notification,
                })
            });

        match &result {
            Ok(receipt) => info!(
                intern_id = %receipt.intern.id,
                amount = %receipt.donation.amount,
                total_raised = %receipt.intern.total_raised,
                rank = receipt.intern.rank,
                unlocked = receipt.unlocked.len(),
                "donation recorded"
            ),
            Err(FundraisingError::Repository(err)) => {
                warn!(error = %err, "donation rolled back")
            }
            Err(_) => {}
        }
        result
    }

    /// Persists and returns `floor(total_raised / 10)` for the intern.
    pub fn recompute_points(&self, intern_id: InternId) -> Result<i64, FundraisingError> {
        self.repository
            .atomically(|store| scoring::recompute_points(store, intern_id))
    }

    /// Single-intern rank recompute, followed by an achievement evaluation.
    pub fn recompute_rank(&self, intern_id: InternId) -> Result<u32, FundraisingError> {
        let now = Utc::now();
        self.repository
            .atomically(|store| refresh(store, intern_id, now).map(|intern| intern.rank))
    }

    /// All-intern rank recompute; every re-ranked intern is evaluated.
    pub fn recompute_ranks(&self) -> Result<Vec<Standing>, FundraisingError> {
        let now = Utc::now();
        self.repository.atomically(|store| {
            let standings = scoring::recompute_ranks(store)?;
            rerank_and_evaluate(store, &standings, now)?;
            Ok(standings)
        })
    }

    /// Recomputes every rank, evaluates every intern, and returns interns in rank order.
    pub fn leaderboard(&self) -> Result<Vec<Intern>, FundraisingError> {
        let now = Utc::now();
        self.repository.atomically(|store| {
            let standings = scoring::recompute_ranks(store)?;
            rerank_and_evaluate(store, &standings, now)
        })
    }

    /// Intern profile with freshly derived points and rank.
    pub fn intern(&self, intern_id: InternId) -> Result<Intern, FundraisingError> {
        let now = Utc::now();
        self.repository
            .atomically(|store| refresh(store, intern_id, now))
    }

    pub fn dashboard(&self, intern_id: InternId) -> Result<DashboardSnapshot, FundraisingError> {
        let now = Utc::now();
        self.repository.atomically(|store| {
            let intern = refresh(store, intern_id, now)?;
            Ok(DashboardSnapshot {
                recent_donations: store.recent_donations(intern_id, RECENT_DONATIONS_LIMIT)?,
                unread_notifications: store.unread_notification_count(intern_id)?,
                achievements_count: store.achievement_count(intern_id)?,
                total_donations_count: store.donation_count(intern_id)?,
                intern,
            })
        })
    }

    pub fn notifications(
        &self,
        intern_id: InternId,
    ) -> Result<Vec<Notification>, FundraisingError> {
        self.repository.atomically(|store| {
            require_intern(store, intern_id)?;
            Ok(store.notifications(intern_id, NOTIFICATION_FEED_LIMIT)?)
        })
    }

    /// Unlocked achievements, oldest first.
    pub fn achievements(&self, intern_id: InternId) -> Result<Vec<Achievement>, FundraisingError> {
        self.repository.atomically(|store| {
            require_intern(store, intern_id)?;
            Ok(store.achievements(intern_id)?)
        })
    }

    pub fn mark_read(
        &self,
        intern_id: InternId,
        notification_id: NotificationId,
    ) -> Result<(), FundraisingError> {
        self.repository.atomically(|store| {
            require_intern(store, intern_id)?;
            notifier::mark_read(store, intern_id, notification_id)
        })
    }
}

fn require_intern(store: &dyn LedgerStore, intern_id: InternId) -> Result<Intern, FundraisingError> {
    store
        .intern(intern_id)?
        .ok_or_else(|| FundraisingError::intern_not_found(intern_id))
}

/// Applies fresh standings to the stored interns and runs the evaluator for each,
/// returning them in rank order.
fn rerank_and_evaluate(
    store: &mut dyn LedgerStore,
    standings: &[Standing],
    now: DateTime<Utc>,
) -> Result<Vec<Intern>, FundraisingError> {
    let mut by_id: HashMap<InternId, Intern> = store
        .interns()?
        .into_iter()
        .map(|intern| (intern.id, intern))
        .collect();

    let mut ordered = Vec::with_capacity(standings.len());
    for standing in standings {
        let Some(mut intern) = by_id.remove(&standing.intern_id) else {
            continue;
        };
        intern.rank = standing.rank;
        intern.points = scoring::recompute_points(store, intern.id)?;
        achievements::evaluate(store, &intern, now)?;
        ordered.push(intern);
    }
    Ok(ordered)
}

fn refresh(
    store: &mut dyn LedgerStore,
    intern_id: InternId,
    now: DateTime<Utc>,
) -> Result<Intern, FundraisingError> {
    let mut intern = require_intern(store, intern_id)?;
    intern.points = scoring::recompute_points(store, intern_id)?;
    intern.rank = scoring::recompute_rank(store, intern_id)?;
    achievements::evaluate(store, &intern, now)?;
    Ok(intern)
}

/// Error raised by the fundraising service.
#[derive(Debug, thiserror::Error)]
pub enum FundraisingError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl FundraisingError {
    pub fn intern_not_found(intern_id: InternId) -> Self {
        Self::NotFound(format!("intern {intern_id} not found"))
    }
}
