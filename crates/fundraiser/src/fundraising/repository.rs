use chrono::{DateTime, Utc};

use super::domain::{
    Achievement, AchievementKind, Amount, Donation, DonorInfo, Intern, InternId, NewIntern,
    Notification, NotificationId, NotificationKind,
};

/// Title, description, and icon written when an achievement is unlocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementTemplate {
    pub title: String,
    pub description: String,
    pub icon: String,
}

/// Operations available inside one store transaction.
///
/// Every method observes the writes made earlier in the same transaction. Nothing is
/// visible to other callers until [`FundraisingRepository::atomically`] commits.
pub trait LedgerStore {
    fn insert_intern(&mut self, intern: &NewIntern) -> Result<Intern, RepositoryError>;
    fn referral_code_taken(&self, code: &str) -> Result<bool, RepositoryError>;
    fn intern(&self, id: InternId) -> Result<Option<Intern>, RepositoryError>;
    fn intern_by_referral_code(&self, code: &str) -> Result<Option<Intern>, RepositoryError>;
    /// All interns, ordered by id.
    fn interns(&self) -> Result<Vec<Intern>, RepositoryError>;

    fn insert_donation(
        &mut self,
        intern: InternId,
        amount: Amount,
        donor: &DonorInfo,
        at: DateTime<Utc>,
    ) -> Result<Donation, RepositoryError>;
    /// Adds `amount` to the running total in place and returns the new total.
    fn add_to_total(
        &mut self,
        intern: InternId,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Result<Amount, RepositoryError>;
    fn donation_count(&self, intern: InternId) -> Result<u64, RepositoryError>;
    /// Newest first.
    fn recent_donations(
        &self,
        intern: InternId,
        limit: usize,
    ) -> Result<Vec<Donation>, RepositoryError>;

    fn set_points(&mut self, intern: InternId, points: i64) -> Result<(), RepositoryError>;
    fn set_rank(&mut self, intern: InternId, rank: u32) -> Result<(), RepositoryError>;

    /// Creates the achievement unless one of the same kind is already unlocked, in which
    /// case `None` is returned and nothing is written.
    fn unlock_achievement(
        &mut self,
        intern: InternId,
        kind: AchievementKind,
        template: &AchievementTemplate,
        at: DateTime<Utc>,
    ) -> Result<Option<Achievement>, RepositoryError>;
    /// Unlocked achievements, oldest first.
    fn achievements(&self, intern: InternId) -> Result<Vec<Achievement>, RepositoryError>;
    fn achievement_count(&self, intern: InternId) -> Result<u64, RepositoryError>;

    fn insert_notification(
        &mut self,
        intern: InternId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError>;
    /// Newest first.
    fn notifications(
        &self,
        intern: InternId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError>;
    fn unread_notification_count(&self, intern: InternId) -> Result<u64, RepositoryError>;
    /// Returns `false` when no notification with that id belongs to the intern.
    fn mark_notification_read(
        &mut self,
        intern: InternId,
        notification: NotificationId,
    ) -> Result<bool, RepositoryError>;
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait FundraisingRepository: Send + Sync {
    /// Runs `work` inside a single transaction. The transaction commits when `work`
    /// returns `Ok` and rolls back otherwise, so either every effect is visible or none.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn LedgerStore) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
