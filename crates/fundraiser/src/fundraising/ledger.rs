//! Append-only donation ledger.

use chrono::{DateTime, Utc};

use super::domain::{Amount, Donation, DonorInfo, Intern};
use super::repository::LedgerStore;
use super::service::FundraisingError;

/// Donations must move money toward the goal.
pub fn validate_amount(amount: Option<Amount>) -> Result<Amount, FundraisingError> {
    match amount {
        None => Err(FundraisingError::Validation(
            "donation amount is required".to_string(),
        )),
        Some(amount) if !amount.is_positive() => Err(FundraisingError::Validation(format!(
            "donation amount must be greater than zero, got {amount}"
        ))),
        Some(amount) if amount > Amount::MAX_DONATION => {
            Err(FundraisingError::Validation(format!(
                "donation amount must not exceed {}, got {amount}",
                Amount::MAX_DONATION
            )))
        }
        Some(amount) => Ok(amount),
    }
}

/// Appends the donation and bumps the intern's running total.
///
/// The caller owns the surrounding transaction; on success `intern.total_raised`
/// reflects the stored total.
pub fn record_donation(
    store: &mut dyn LedgerStore,
    intern: &mut Intern,
    amount: Amount,
    donor: &DonorInfo,
    at: DateTime<Utc>,
) -> Result<Donation, FundraisingError> {
    let amount = validate_amount(Some(amount))?;
    if intern.total_raised.checked_add(amount).is_none() {
        return Err(FundraisingError::Validation(format!(
            "donation of {amount} would overflow the running total"
        )));
    }

    let donation = store.insert_donation(intern.id, amount, donor, at)?;
    intern.total_raised = store.add_to_total(intern.id, amount, at)?;
    intern.updated_at = at;

    Ok(donation)
}
