//! SQLite-backed ledger.
//!
//! One connection sits behind a mutex and every unit of work opens a `BEGIN IMMEDIATE`
//! transaction, so concurrent donations for the same intern are serialized and the
//! running total is always updated with an in-place increment.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::domain::{
    Achievement, AchievementId, AchievementKind, Amount, Donation, DonationId, DonorInfo, Intern,
    InternId, NewIntern, Notification, NotificationId, NotificationKind, UserId,
};
use super::repository::{AchievementTemplate, FundraisingRepository, LedgerStore, RepositoryError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS interns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    referral_code TEXT NOT NULL UNIQUE,
    total_raised_cents INTEGER NOT NULL DEFAULT 0 CHECK (total_raised_cents >= 0),
    goal_amount_cents INTEGER NOT NULL CHECK (goal_amount_cents > 0),
    points INTEGER NOT NULL DEFAULT 0,
    rank INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    intern_id INTEGER NOT NULL REFERENCES interns(id) ON DELETE CASCADE,
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    donor_name TEXT NOT NULL DEFAULT '',
    donor_email TEXT NOT NULL DEFAULT '',
    message TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS achievements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    intern_id INTEGER NOT NULL REFERENCES interns(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    unlocked_at TEXT NOT NULL,
    is_unlocked INTEGER NOT NULL DEFAULT 1,
    UNIQUE (intern_id, kind)
);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    intern_id INTEGER NOT NULL REFERENCES interns(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_interns_total ON interns(total_raised_cents DESC, id);
CREATE INDEX IF NOT EXISTS idx_donations_intern ON donations(intern_id, created_at);
CREATE INDEX IF NOT EXISTS idx_notifications_intern ON notifications(intern_id, is_read);
";

const INTERN_COLUMNS: &str = "id, user_id, username, first_name, last_name, email, referral_code,
    total_raised_cents, goal_amount_cents, points, rank, created_at, updated_at";

const DONATION_COLUMNS: &str =
    "id, intern_id, amount_cents, donor_name, donor_email, message, created_at";

const ACHIEVEMENT_COLUMNS: &str =
    "id, intern_id, kind, title, description, icon, unlocked_at, is_unlocked";

const NOTIFICATION_COLUMNS: &str = "id, intern_id, kind, title, message, is_read, created_at";

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                RepositoryError::Conflict(err.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound,
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (or creates) a database file in WAL mode and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, RepositoryError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<(), RepositoryError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl FundraisingRepository for SqliteRepository {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn LedgerStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // Dropping `tx` without committing rolls everything back.
        let value = {
            let mut ledger = SqliteLedger { conn: &tx };
            work(&mut ledger)?
        };

        tx.commit().map_err(RepositoryError::from)?;
        Ok(value)
    }
}

struct SqliteLedger<'conn> {
    conn: &'conn Connection,
}

fn unknown_code(index: usize, code: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        Type::Text,
        format!("unknown kind code '{code}'").into(),
    )
}

fn intern_from_row(row: &Row<'_>) -> rusqlite::Result<Intern> {
    Ok(Intern {
        id: InternId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        referral_code: row.get(6)?,
        total_raised: Amount::from_cents(row.get(7)?),
        goal_amount: Amount::from_cents(row.get(8)?),
        points: row.get(9)?,
        rank: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn donation_from_row(row: &Row<'_>) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: DonationId(row.get(0)?),
        intern_id: InternId(row.get(1)?),
        amount: Amount::from_cents(row.get(2)?),
        donor_name: row.get(3)?,
        donor_email: row.get(4)?,
        message: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn achievement_from_row(row: &Row<'_>) -> rusqlite::Result<Achievement> {
    let code: String = row.get(2)?;
    let kind = AchievementKind::from_code(&code).ok_or_else(|| unknown_code(2, &code))?;
    Ok(Achievement {
        id: AchievementId(row.get(0)?),
        intern_id: InternId(row.get(1)?),
        kind,
        title: row.get(3)?,
        description: row.get(4)?,
        icon: row.get(5)?,
        unlocked_at: row.get(6)?,
        is_unlocked: row.get(7)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let code: String = row.get(2)?;
    let kind = NotificationKind::from_code(&code).ok_or_else(|| unknown_code(2, &code))?;
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        intern_id: InternId(row.get(1)?),
        kind,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl SqliteLedger<'_> {
    fn fetch_intern(
        &self,
        clause: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<Intern>, RepositoryError> {
        let sql = format!("SELECT {INTERN_COLUMNS} FROM interns WHERE {clause}");
        Ok(self
            .conn
            .query_row(&sql, [value], intern_from_row)
            .optional()?)
    }

    fn count(&self, sql: &str, intern: InternId) -> Result<u64, RepositoryError> {
        let count: i64 = self.conn.query_row(sql, [intern.0], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn expect_updated(changed: usize) -> Result<(), RepositoryError> {
        if changed == 0 {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }
}

impl LedgerStore for SqliteLedger<'_> {
    fn insert_intern(&mut self, intern: &NewIntern) -> Result<Intern, RepositoryError> {
        self.conn.execute(
            "INSERT INTO interns (
                user_id, username, first_name, last_name, email, referral_code,
                goal_amount_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                intern.user_id.0,
                intern.username,
                intern.first_name,
                intern.last_name,
                intern.email,
                intern.referral_code,
                intern.goal_amount.cents(),
                intern.created_at,
            ],
        )?;

        let id = InternId(self.conn.last_insert_rowid());
        self.intern(id)?.ok_or(RepositoryError::NotFound)
    }

    fn referral_code_taken(&self, code: &str) -> Result<bool, RepositoryError> {
        let taken: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM interns WHERE referral_code = ?1)",
            [code],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    fn intern(&self, id: InternId) -> Result<Option<Intern>, RepositoryError> {
        self.fetch_intern("id = ?1", &id.0)
    }

    fn intern_by_referral_code(&self, code: &str) -> Result<Option<Intern>, RepositoryError> {
        self.fetch_intern("referral_code = ?1", &code)
    }

    fn interns(&self) -> Result<Vec<Intern>, RepositoryError> {
        let sql = format!("SELECT {INTERN_COLUMNS} FROM interns ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let interns = stmt
            .query_map([], intern_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(interns)
    }

    fn insert_donation(
        &mut self,
        intern: InternId,
        amount: Amount,
        donor: &DonorInfo,
        at: DateTime<Utc>,
    ) -> Result<Donation, RepositoryError> {
        self.conn.execute(
            "INSERT INTO donations (intern_id, amount_cents, donor_name, donor_email, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                intern.0,
                amount.cents(),
                donor.display_name(),
                donor.email.as_deref().unwrap_or_default(),
                donor.message.as_deref().unwrap_or_default(),
                at,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {DONATION_COLUMNS} FROM donations WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id], donation_from_row)?)
    }

    fn add_to_total(
        &mut self,
        intern: InternId,
        amount: Amount,
        at: DateTime<Utc>,
    ) -> Result<Amount, RepositoryError> {
        let changed = self.conn.execute(
            "UPDATE interns
             SET total_raised_cents = total_raised_cents + ?2, updated_at = ?3
             WHERE id = ?1",
            params![intern.0, amount.cents(), at],
        )?;
        Self::expect_updated(changed)?;

        let total: i64 = self.conn.query_row(
            "SELECT total_raised_cents FROM interns WHERE id = ?1",
            [intern.0],
            |row| row.get(0),
        )?;
        Ok(Amount::from_cents(total))
    }

    fn donation_count(&self, intern: InternId) -> Result<u64, RepositoryError> {
        self.count("SELECT COUNT(*) FROM donations WHERE intern_id = ?1", intern)
    }

    fn recent_donations(
        &self,
        intern: InternId,
        limit: usize,
    ) -> Result<Vec<Donation>, RepositoryError> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations
             WHERE intern_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let donations = stmt
            .query_map(params![intern.0, limit as i64], donation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(donations)
    }

    fn set_points(&mut self, intern: InternId, points: i64) -> Result<(), RepositoryError> {
        let changed = self.conn.execute(
            "UPDATE interns SET points = ?2 WHERE id = ?1",
            params![intern.0, points],
        )?;
        Self::expect_updated(changed)
    }

    fn set_rank(&mut self, intern: InternId, rank: u32) -> Result<(), RepositoryError> {
        let changed = self.conn.execute(
            "UPDATE interns SET rank = ?2 WHERE id = ?1",
            params![intern.0, rank],
        )?;
        Self::expect_updated(changed)
    }

    fn unlock_achievement(
        &mut self,
        intern: InternId,
        kind: AchievementKind,
        template: &AchievementTemplate,
        at: DateTime<Utc>,
    ) -> Result<Option<Achievement>, RepositoryError> {
        let inserted = self.conn.execute(
            "INSERT INTO achievements (intern_id, kind, title, description, icon, unlocked_at, is_unlocked)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
             ON CONFLICT (intern_id, kind) DO NOTHING",
            params![
                intern.0,
                kind.as_str(),
                template.title,
                template.description,
                template.icon,
                at,
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }

        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = ?1");
        Ok(Some(self.conn.query_row(&sql, [id], achievement_from_row)?))
    }

    fn achievements(&self, intern: InternId) -> Result<Vec<Achievement>, RepositoryError> {
        let sql = format!(
            "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements
             WHERE intern_id = ?1 AND is_unlocked = 1
             ORDER BY unlocked_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let achievements = stmt
            .query_map([intern.0], achievement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(achievements)
    }

    fn achievement_count(&self, intern: InternId) -> Result<u64, RepositoryError> {
        self.count(
            "SELECT COUNT(*) FROM achievements WHERE intern_id = ?1 AND is_unlocked = 1",
            intern,
        )
    }

    fn insert_notification(
        &mut self,
        intern: InternId,
        kind: NotificationKind,
        title: &str,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        self.conn.execute(
            "INSERT INTO notifications (intern_id, kind, title, message, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![intern.0, kind.as_str(), title, message, at],
        )?;

        let id = self.conn.last_insert_rowid();
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id], notification_from_row)?)
    }

    fn notifications(
        &self,
        intern: InternId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE intern_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notifications = stmt
            .query_map(params![intern.0, limit as i64], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    fn unread_notification_count(&self, intern: InternId) -> Result<u64, RepositoryError> {
        self.count(
            "SELECT COUNT(*) FROM notifications WHERE intern_id = ?1 AND is_read = 0",
            intern,
        )
    }

    fn mark_notification_read(
        &mut self,
        intern: InternId,
        notification: NotificationId,
    ) -> Result<bool, RepositoryError> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND intern_id = ?2",
            params![notification.0, intern.0],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_intern(user: &str, code: &str) -> NewIntern {
        NewIntern {
            user_id: UserId(user.to_string()),
            username: user.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: format!("{user}@example.org"),
            referral_code: code.to_string(),
            goal_amount: Amount::from_dollars(100),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_referral_codes_surface_as_conflicts() {
        let repository = SqliteRepository::in_memory().expect("schema applies");

        let result: Result<(), RepositoryError> = repository.atomically(|store| {
            store.insert_intern(&new_intern("ada", "ada2026"))?;
            store.insert_intern(&new_intern("grace", "ada2026"))?;
            Ok(())
        });

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[test]
    fn failed_work_rolls_back_every_write() {
        let repository = SqliteRepository::in_memory().expect("schema applies");

        let result: Result<(), RepositoryError> = repository.atomically(|store| {
            store.insert_intern(&new_intern("ada", "ada2026"))?;
            Err(RepositoryError::Unavailable("boom".to_string()))
        });
        assert!(result.is_err());

        let interns = repository
            .atomically(|store| store.interns())
            .expect("read succeeds");
        assert!(interns.is_empty());
    }

    #[test]
    fn totals_increment_in_place() {
        let repository = SqliteRepository::in_memory().expect("schema applies");

        let stamped = Utc::now();
        let (total, stored) = repository
            .atomically(|store| {
                let intern = store.insert_intern(&new_intern("ada", "ada2026"))?;
                store.add_to_total(intern.id, Amount::from_dollars(50), stamped)?;
                let total = store.add_to_total(intern.id, Amount::from_cents(1_050), stamped)?;
                Ok::<_, RepositoryError>((total, store.intern(intern.id)?))
            })
            .expect("increments succeed");

        assert_eq!(total, Amount::from_cents(6_050));
        let stored = stored.expect("intern present");
        assert_eq!(stored.total_raised, total);
        assert_eq!(stored.updated_at, stamped);
    }

    #[test]
    fn achievements_unlock_once_per_kind() {
        let repository = SqliteRepository::in_memory().expect("schema applies");
        let template = AchievementTemplate {
            title: "Goal Reached!".to_string(),
            description: "You reached your goal of $100.00!".to_string(),
            icon: "🎯".to_string(),
        };

        let (first, second, count) = repository
            .atomically(|store| {
                let intern = store.insert_intern(&new_intern("ada", "ada2026"))?;
                let now = Utc::now();
                let first =
                    store.unlock_achievement(intern.id, AchievementKind::GoalReached, &template, now)?;
                let second =
                    store.unlock_achievement(intern.id, AchievementKind::GoalReached, &template, now)?;
                let count = store.achievement_count(intern.id)?;
                Ok::<_, RepositoryError>((first, second, count))
            })
            .expect("unlocks succeed");

        let first = first.expect("first unlock writes a row");
        assert_eq!(first.kind, AchievementKind::GoalReached);
        assert!(first.is_unlocked);
        assert!(second.is_none());
        assert_eq!(count, 1);
    }

    #[test]
    fn notifications_are_scoped_to_their_intern() {
        let repository = SqliteRepository::in_memory().expect("schema applies");

        let (own, foreign, unread) = repository
            .atomically(|store| {
                let ada = store.insert_intern(&new_intern("ada", "ada2026"))?;
                let grace = store.insert_intern(&new_intern("grace", "grace2026"))?;
                let note = store.insert_notification(
                    ada.id,
                    NotificationKind::Donation,
                    "New Donation!",
                    "You received a $5.00 donation!",
                    Utc::now(),
                )?;
                let foreign = store.mark_notification_read(grace.id, note.id)?;
                let own = store.mark_notification_read(ada.id, note.id)?;
                let unread = store.unread_notification_count(ada.id)?;
                Ok::<_, RepositoryError>((own, foreign, unread))
            })
            .expect("notification writes succeed");

        assert!(own);
        assert!(!foreign);
        assert_eq!(unread, 0);
    }

    #[test]
    fn deleting_an_intern_cascades_to_children() {
        let repository = SqliteRepository::in_memory().expect("schema applies");

        repository
            .atomically(|store| {
                let intern = store.insert_intern(&new_intern("ada", "ada2026"))?;
                store.insert_donation(
                    intern.id,
                    Amount::from_dollars(5),
                    &DonorInfo::default(),
                    Utc::now(),
                )?;
                store.insert_notification(
                    intern.id,
                    NotificationKind::Donation,
                    "New Donation!",
                    "You received a $5.00 donation!",
                    Utc::now(),
                )?;
                Ok::<_, RepositoryError>(())
            })
            .expect("seed succeeds");

        repository
            .execute_raw("DELETE FROM interns")
            .expect("delete succeeds");

        let conn = repository.conn.lock().expect("connection mutex poisoned");
        let orphans: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM donations) + (SELECT COUNT(*) FROM notifications)",
                [],
                |row| row.get(0),
            )
            .expect("count succeeds");
        assert_eq!(orphans, 0);
    }
}
