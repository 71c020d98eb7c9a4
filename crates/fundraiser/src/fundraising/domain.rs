use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Store-assigned identifier for an intern profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

/// Opaque reference to the account owned by the external auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for InternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary value held as whole cents.
///
/// Parses from `"50"`, `"50.5"` or `"50.25"` (JSON numbers are accepted through their
/// textual form) and always renders with two decimals, e.g. `"50.00"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    /// Largest single gift accepted, `99,999,999.99`.
    pub const MAX_DONATION: Amount = Amount(9_999_999_999);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn parse(raw: &str) -> Result<Self, AmountParseError> {
        let trimmed = raw.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !all_digits(whole)
            || !all_digits(fraction)
        {
            return Err(AmountParseError::Malformed(raw.to_string()));
        }

        // Trailing zeros past the cents position carry no value ("50.0" from a JSON float).
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > 2 {
            return Err(AmountParseError::TooPrecise(raw.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| AmountParseError::Malformed(raw.to_string()))?
        };
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().unwrap_or(0) * 10,
            _ => fraction.parse::<i64>().unwrap_or(0),
        };

        let total = whole
            .checked_mul(100)
            .and_then(|value| value.checked_add(cents))
            .ok_or_else(|| AmountParseError::Malformed(raw.to_string()))?;

        Ok(Self(if negative { -total } else { total }))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Number(serde_json::Number),
            Text(String),
        }

        let raw = match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(number) => number.to_string(),
            RawAmount::Text(text) => text,
        };
        Amount::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountParseError {
    #[error("'{0}' is not a valid amount")]
    Malformed(String),
    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),
}

/// Campaign participant and the aggregates derived from their ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intern {
    pub id: InternId,
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub referral_code: String,
    pub total_raised: Amount,
    pub goal_amount: Amount,
    pub points: i64,
    pub rank: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload accepted from the account layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InternRegistration {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub goal_amount: Option<Amount>,
}

/// Fully resolved row handed to the store on registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIntern {
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub referral_code: String,
    pub goal_amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Optional details a donor may leave alongside the gift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl DonorInfo {
    pub const ANONYMOUS: &'static str = "Anonymous";

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(Self::ANONYMOUS)
    }
}

/// Public donation form: the referral code picks the recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DonationSubmission {
    #[serde(default)]
    pub referral_code: String,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub donor_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DonationSubmission {
    pub fn donor(&self) -> DonorInfo {
        DonorInfo {
            name: self.donor_name.clone(),
            email: self.donor_email.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Donation {
    pub id: DonationId,
    pub intern_id: InternId,
    pub amount: Amount,
    pub donor_name: String,
    pub donor_email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Milestones an intern can unlock. `Streak` and `SocialButterfly` are reserved and
/// have no trigger yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    Welcome,
    FirstDonation,
    GoalReached,
    TopPerformer,
    Streak,
    SocialButterfly,
}

impl AchievementKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AchievementKind::Welcome => "welcome",
            AchievementKind::FirstDonation => "first_donation",
            AchievementKind::GoalReached => "goal_reached",
            AchievementKind::TopPerformer => "top_performer",
            AchievementKind::Streak => "streak",
            AchievementKind::SocialButterfly => "social_butterfly",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "welcome" => Some(AchievementKind::Welcome),
            "first_donation" => Some(AchievementKind::FirstDonation),
            "goal_reached" => Some(AchievementKind::GoalReached),
            "top_performer" => Some(AchievementKind::TopPerformer),
            "streak" => Some(AchievementKind::Streak),
            "social_butterfly" => Some(AchievementKind::SocialButterfly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub intern_id: InternId,
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at: DateTime<Utc>,
    pub is_unlocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Achievement,
    Donation,
    Milestone,
    RankChange,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Achievement => "achievement",
            NotificationKind::Donation => "donation",
            NotificationKind::Milestone => "milestone",
            NotificationKind::RankChange => "rank_change",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "achievement" => Some(NotificationKind::Achievement),
            "donation" => Some(NotificationKind::Donation),
            "milestone" => Some(NotificationKind::Milestone),
            "rank_change" => Some(NotificationKind::RankChange),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub intern_id: InternId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
