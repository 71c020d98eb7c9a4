use chrono::{DateTime, Utc};

use super::domain::{Donation, InternId, Notification, NotificationId, NotificationKind};
use super::repository::LedgerStore;
use super::service::FundraisingError;

pub const DONATION_TITLE: &str = "New Donation!";

pub fn donation_message(donation: &Donation) -> String {
    format!("You received a ${} donation!", donation.amount)
}

/// Appends an unread notification for the intern.
pub fn notify(
    store: &mut dyn LedgerStore,
    intern: InternId,
    kind: NotificationKind,
    title: &str,
    message: &str,
    at: DateTime<Utc>,
) -> Result<Notification, FundraisingError> {
    Ok(store.insert_notification(intern, kind, title, message, at)?)
}

/// The one notification every recorded donation produces.
pub fn notify_donation(
    store: &mut dyn LedgerStore,
    donation: &Donation,
) -> Result<Notification, FundraisingError> {
    notify(
        store,
        donation.intern_id,
        NotificationKind::Donation,
        DONATION_TITLE,
        &donation_message(donation),
        donation.created_at,
    )
}

/// Flips the read flag. Fails with `NotFound` when the notification does not exist or
/// belongs to someone else; re-reading an already read notification succeeds.
pub fn mark_read(
    store: &mut dyn LedgerStore,
    intern: InternId,
    notification: NotificationId,
) -> Result<(), FundraisingError> {
    if store.mark_notification_read(intern, notification)? {
        Ok(())
    } else {
        Err(FundraisingError::NotFound(format!(
            "notification {notification} not found"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::super::domain::{Amount, DonationId};
    use super::*;

    #[test]
    fn donation_message_includes_the_amount() {
        let donation = Donation {
            id: DonationId(3),
            intern_id: InternId(1),
            amount: Amount::from_dollars(50),
            donor_name: "Anonymous".to_string(),
            donor_email: String::new(),
            message: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(donation_message(&donation), "You received a $50.00 donation!");
    }
}
