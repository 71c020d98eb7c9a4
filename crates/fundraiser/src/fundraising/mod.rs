//! Intern fundraising: the donation ledger, points and standings, achievements, and the
//! notification feed, orchestrated by [`FundraisingService`] over one transactional store.

pub mod achievements;
pub mod domain;
pub mod ledger;
pub mod notifier;
pub mod referral;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod sqlite;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    Achievement, AchievementId, AchievementKind, Amount, AmountParseError, Donation, DonationId,
    DonationSubmission, DonorInfo, Intern, InternId, InternRegistration, NewIntern, Notification,
    NotificationId, NotificationKind, UserId,
};
pub use repository::{AchievementTemplate, FundraisingRepository, LedgerStore, RepositoryError};
pub use router::fundraising_router;
pub use scoring::{points_for, rank_of, Standing};
pub use service::{DashboardSnapshot, DonationReceipt, FundraisingError, FundraisingService};
pub use sqlite::SqliteRepository;
pub use views::{DashboardView, DonationReceiptView, DonationView, InternView, LeaderboardEntry};
