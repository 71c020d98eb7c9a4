use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Achievement, Amount, Donation, DonationId, Intern, InternId, Notification, UserId,
};
use super::service::{DashboardSnapshot, DonationReceipt};

/// `min(total_raised / goal_amount * 100, 100)`, rounded to two decimals.
pub fn progress_percentage(total_raised: Amount, goal_amount: Amount) -> f64 {
    if !goal_amount.is_positive() || total_raised.cents() <= 0 {
        return 0.0;
    }
    let ratio = total_raised.cents() as f64 / goal_amount.cents() as f64 * 100.0;
    (ratio.min(100.0) * 100.0).round() / 100.0
}

/// First and last name joined, falling back to the username when both are blank.
pub fn full_name(intern: &Intern) -> String {
    let joined = format!("{} {}", intern.first_name.trim(), intern.last_name.trim());
    let joined = joined.trim();
    if joined.is_empty() {
        intern.username.clone()
    } else {
        joined.to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InternView {
    pub id: InternId,
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub referral_code: String,
    pub total_raised: Amount,
    pub goal_amount: Amount,
    pub progress_percentage: f64,
    pub points: i64,
    pub rank: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Intern> for InternView {
    fn from(intern: &Intern) -> Self {
        Self {
            id: intern.id,
            user_id: intern.user_id.clone(),
            username: intern.username.clone(),
            full_name: full_name(intern),
            email: intern.email.clone(),
            referral_code: intern.referral_code.clone(),
            total_raised: intern.total_raised,
            goal_amount: intern.goal_amount,
            progress_percentage: progress_percentage(intern.total_raised, intern.goal_amount),
            points: intern.points,
            rank: intern.rank,
            created_at: intern.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DonationView {
    pub id: DonationId,
    pub amount: Amount,
    pub donor_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Donation> for DonationView {
    fn from(donation: &Donation) -> Self {
        Self {
            id: donation.id,
            amount: donation.amount,
            donor_name: donation.donor_name.clone(),
            message: donation.message.clone(),
            created_at: donation.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub intern: InternView,
    pub recent_donations: Vec<DonationView>,
    pub unread_notifications: u64,
    pub achievements_count: u64,
    pub total_donations_count: u64,
}

impl From<&DashboardSnapshot> for DashboardView {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        Self {
            intern: InternView::from(&snapshot.intern),
            recent_donations: snapshot.recent_donations.iter().map(DonationView::from).collect(),
            unread_notifications: snapshot.unread_notifications,
            achievements_count: snapshot.achievements_count,
            total_donations_count: snapshot.total_donations_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub intern_id: InternId,
    pub full_name: String,
    pub referral_code: String,
    pub total_raised: Amount,
    pub points: i64,
}

impl From<&Intern> for LeaderboardEntry {
    fn from(intern: &Intern) -> Self {
        Self {
            rank: intern.rank,
            intern_id: intern.id,
            full_name: full_name(intern),
            referral_code: intern.referral_code.clone(),
            total_raised: intern.total_raised,
            points: intern.points,
        }
    }
}

/// Response to a public donation. Donor contact details are not echoed back.
#[derive(Debug, Clone, Serialize)]
pub struct DonationReceiptView {
    pub donation: DonationView,
    pub intern: LeaderboardEntry,
    pub unlocked: Vec<Achievement>,
    pub notification: Notification,
}

impl From<&DonationReceipt> for DonationReceiptView {
    fn from(receipt: &DonationReceipt) -> Self {
        Self {
            donation: DonationView::from(&receipt.donation),
            intern: LeaderboardEntry::from(&receipt.intern),
            unlocked: receipt.unlocked.clone(),
            notification: receipt.notification.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intern(first: &str, last: &str) -> Intern {
        let now = Utc::now();
        Intern {
            id: InternId(1),
            user_id: UserId("user-1".to_string()),
            username: "ada".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: "ada@example.org".to_string(),
            referral_code: "ada2026".to_string(),
            total_raised: Amount::from_dollars(50),
            goal_amount: Amount::from_dollars(100),
            points: 5,
            rank: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn progress_caps_at_one_hundred() {
        let goal = Amount::from_dollars(100);
        assert_eq!(progress_percentage(Amount::ZERO, goal), 0.0);
        assert_eq!(progress_percentage(Amount::from_dollars(50), goal), 50.0);
        assert_eq!(progress_percentage(Amount::from_cents(3_333), goal), 33.33);
        assert_eq!(progress_percentage(Amount::from_dollars(110), goal), 100.0);
        assert_eq!(progress_percentage(Amount::from_dollars(10), Amount::ZERO), 0.0);
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(full_name(&intern("Ada", "Lovelace")), "Ada Lovelace");
        assert_eq!(full_name(&intern("Ada", "")), "Ada");
        assert_eq!(full_name(&intern(" ", "")), "ada");
    }

    #[test]
    fn intern_view_carries_progress() {
        let view = InternView::from(&intern("Ada", "Lovelace"));
        assert_eq!(view.progress_percentage, 50.0);
        assert_eq!(view.full_name, "Ada Lovelace");
        let json = serde_json::to_value(&view).expect("serializes");
        assert_eq!(json["total_raised"], "50.00");
    }
}
