//! Achievement evaluation.
//!
//! Unlocking is create-if-absent: [`unlock_if_absent`] writes at most one achievement of
//! a kind per intern no matter how often the evaluator runs. The store backs this with a
//! uniqueness constraint, so a repeated evaluation with unchanged state is a no-op.

use chrono::{DateTime, Utc};

use super::domain::{Achievement, AchievementKind, Amount, Intern};
use super::repository::{AchievementTemplate, LedgerStore};
use super::service::FundraisingError;

/// Interns ranked at or above this position earn `top_performer`.
pub const TOP_PERFORMER_CUTOFF: u32 = 3;

/// Facts the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternProgress {
    pub donation_count: u64,
    pub total_raised: Amount,
    pub goal_amount: Amount,
    pub rank: u32,
}

impl InternProgress {
    pub fn of(intern: &Intern, donation_count: u64) -> Self {
        Self {
            donation_count,
            total_raised: intern.total_raised,
            goal_amount: intern.goal_amount,
            rank: intern.rank,
        }
    }
}

/// Kinds whose conditions hold for the given progress, in evaluation order.
pub fn qualifying_kinds(progress: &InternProgress) -> Vec<AchievementKind> {
    let mut kinds = Vec::new();
    if progress.donation_count == 1 {
        kinds.push(AchievementKind::FirstDonation);
    }
    if progress.total_raised >= progress.goal_amount {
        kinds.push(AchievementKind::GoalReached);
    }
    // Rank 0 means "never ranked" and must not count as a podium finish.
    if progress.rank >= 1 && progress.rank <= TOP_PERFORMER_CUTOFF {
        kinds.push(AchievementKind::TopPerformer);
    }
    kinds
}

pub fn template_for(kind: AchievementKind, intern: &Intern) -> AchievementTemplate {
    let (title, description, icon) = match kind {
        AchievementKind::Welcome => (
            "Welcome!".to_string(),
            "You've joined the fundraising team!".to_string(),
            "🎉",
        ),
        AchievementKind::FirstDonation => (
            "First Donation!".to_string(),
            "You received your first donation!".to_string(),
            "🎉",
        ),
        AchievementKind::GoalReached => (
            "Goal Reached!".to_string(),
            format!("You reached your goal of ${}!", intern.goal_amount),
            "🎯",
        ),
        AchievementKind::TopPerformer => (
            "Top Performer!".to_string(),
            format!("You're in the top {TOP_PERFORMER_CUTOFF} performers!"),
            "🏆",
        ),
        AchievementKind::Streak => (
            "Streak Master!".to_string(),
            "You kept the donations coming!".to_string(),
            "🔥",
        ),
        AchievementKind::SocialButterfly => (
            "Social Butterfly!".to_string(),
            "Your network showed up for you!".to_string(),
            "🦋",
        ),
    };

    AchievementTemplate {
        title,
        description,
        icon: icon.to_string(),
    }
}

/// Returns the new achievement, or `None` if the intern already holds this kind.
pub fn unlock_if_absent(
    store: &mut dyn LedgerStore,
    intern: &Intern,
    kind: AchievementKind,
    at: DateTime<Utc>,
) -> Result<Option<Achievement>, FundraisingError> {
    let template = template_for(kind, intern);
    let unlocked = store.unlock_achievement(intern.id, kind, &template, at)?;
    if let Some(achievement) = &unlocked {
        tracing::debug!(
            intern_id = %intern.id,
            kind = achievement.kind.as_str(),
            "achievement unlocked"
        );
    }
    Ok(unlocked)
}

/// Granted once at registration, outside the donation flow.
pub fn grant_welcome(
    store: &mut dyn LedgerStore,
    intern: &Intern,
    at: DateTime<Utc>,
) -> Result<Option<Achievement>, FundraisingError> {
    unlock_if_absent(store, intern, AchievementKind::Welcome, at)
}

/// Applies every rule to the intern's stored state and returns what was newly unlocked.
pub fn evaluate(
    store: &mut dyn LedgerStore,
    intern: &Intern,
    at: DateTime<Utc>,
) -> Result<Vec<Achievement>, FundraisingError> {
    let donation_count = store.donation_count(intern.id)?;
    let progress = InternProgress::of(intern, donation_count);

    let mut unlocked = Vec::new();
    for kind in qualifying_kinds(&progress) {
        if let Some(achievement) = unlock_if_absent(store, intern, kind, at)? {
            unlocked.push(achievement);
        }
    }
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(donation_count: u64, total: i64, goal: i64, rank: u32) -> InternProgress {
        InternProgress {
            donation_count,
            total_raised: Amount::from_dollars(total),
            goal_amount: Amount::from_dollars(goal),
            rank,
        }
    }

    #[test]
    fn first_donation_requires_exactly_one_gift() {
        assert!(qualifying_kinds(&progress(1, 50, 100, 9)).contains(&AchievementKind::FirstDonation));
        assert!(!qualifying_kinds(&progress(0, 0, 100, 9)).contains(&AchievementKind::FirstDonation));
        assert!(!qualifying_kinds(&progress(2, 80, 100, 9)).contains(&AchievementKind::FirstDonation));
    }

    #[test]
    fn goal_reached_is_inclusive() {
        assert!(qualifying_kinds(&progress(3, 100, 100, 9)).contains(&AchievementKind::GoalReached));
        assert!(qualifying_kinds(&progress(3, 110, 100, 9)).contains(&AchievementKind::GoalReached));
        assert!(!qualifying_kinds(&progress(3, 99, 100, 9)).contains(&AchievementKind::GoalReached));
    }

    #[test]
    fn top_performer_covers_the_podium_only() {
        for rank in 1..=3 {
            assert!(qualifying_kinds(&progress(0, 0, 100, rank))
                .contains(&AchievementKind::TopPerformer));
        }
        assert!(!qualifying_kinds(&progress(0, 0, 100, 4)).contains(&AchievementKind::TopPerformer));
        assert!(!qualifying_kinds(&progress(0, 0, 100, 0)).contains(&AchievementKind::TopPerformer));
    }

    #[test]
    fn reserved_kinds_never_qualify() {
        let kinds = qualifying_kinds(&progress(1, 10_000, 100, 1));
        assert!(!kinds.contains(&AchievementKind::Streak));
        assert!(!kinds.contains(&AchievementKind::SocialButterfly));
        assert!(!kinds.contains(&AchievementKind::Welcome));
    }
}
