//! SQLite-backed ticket and registrant storage.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    NewRegistrant, NewTicket, Registrant, RegistrantPage, RegistrantStore, RegistryError, Ticket,
    TicketMode, TicketStore, UserId,
};

const TICKET_COLUMNS: &str =
    "id, owner_id, title, quota, registered_count, private, created_at, updated_at";

const REGISTRANT_COLUMNS: &str =
    "id, user_id, ticket_id, ticket_owner_id, is_verified, created_at";

/// SQLite store implementing both [`TicketStore`] and [`RegistrantStore`]
/// over one connection.
///
/// Queries run on the blocking pool so callers can bound them with a timeout.
#[derive(Clone)]
pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn new(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, RegistryError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RegistryError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                quota INTEGER NOT NULL,
                registered_count INTEGER NOT NULL DEFAULT 0,
                private INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_owner_id ON tickets(owner_id);

            CREATE TABLE IF NOT EXISTS registrants (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
                ticket_owner_id INTEGER NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_registrants_user_ticket
                ON registrants(user_id, ticket_id);
            CREATE INDEX IF NOT EXISTS idx_registrants_ticket_owner
                ON registrants(ticket_owner_id);
            "#,
        )
        .map_err(db_err)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RegistryError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| RegistryError::Database("connection lock poisoned".to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| RegistryError::Database(format!("blocking task failed: {e}")))?
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        Ok(Ticket {
            id: row.get(0)?,
            owner_id: row.get::<_, i64>(1)? as UserId,
            title: row.get(2)?,
            quota: row.get(3)?,
            registered_count: row.get(4)?,
            mode: TicketMode::from_flag(row.get(5)?),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }

    fn row_to_registrant(row: &rusqlite::Row) -> rusqlite::Result<Registrant> {
        let created_at: String = row.get(5)?;
        Ok(Registrant {
            id: row.get(0)?,
            user_id: row.get::<_, i64>(1)? as UserId,
            ticket_id: row.get(2)?,
            ticket_owner_id: row.get::<_, i64>(3)? as UserId,
            is_verified: row.get(4)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn fetch_ticket(conn: &Connection, ticket_id: &str) -> Result<Option<Ticket>, RegistryError> {
        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"),
            params![ticket_id],
            Self::row_to_ticket,
        )
        .optional()
        .map_err(db_err)
    }
}

/// Both the `(user_id, ticket_id)` index and a colliding text primary key
/// surface as `UniqueViolation`.
fn db_err(e: rusqlite::Error) -> RegistryError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RegistryError::UniqueViolation
        }
        _ => RegistryError::Database(e.to_string()),
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TicketStore for SqliteRegistry {
    async fn get(&self, ticket_id: &str) -> Result<Option<Ticket>, RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| Self::fetch_ticket(conn, &ticket_id))
            .await
    }

    async fn owner_id(&self, ticket_id: &str) -> Result<UserId, RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT owner_id FROM tickets WHERE id = ?",
                params![ticket_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(db_err)?
            .map(|id| id as UserId)
            .ok_or(RegistryError::NotFound(ticket_id))
        })
        .await
    }

    async fn mode(&self, ticket_id: &str) -> Result<TicketMode, RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT private FROM tickets WHERE id = ?",
                params![ticket_id],
                |row| row.get::<_, bool>(0),
            )
            .optional()
            .map_err(db_err)?
            .map(TicketMode::from_flag)
            .ok_or(RegistryError::NotFound(ticket_id))
        })
        .await
    }

    async fn increment_registered_count(&self, ticket_id: &str) -> Result<(), RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE tickets SET registered_count = registered_count + 1, updated_at = ? WHERE id = ?",
                    params![Utc::now().to_rfc3339(), ticket_id],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(RegistryError::NotFound(ticket_id));
            }
            Ok(())
        })
        .await
    }

    async fn create(&self, ticket: NewTicket) -> Result<Ticket, RegistryError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO tickets (id, owner_id, title, quota, registered_count, private, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?, ?)",
                params![
                    ticket.id,
                    ticket.owner_id as i64,
                    ticket.title,
                    ticket.quota,
                    ticket.mode.is_private(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

            Ok(Ticket {
                id: ticket.id,
                owner_id: ticket.owner_id,
                title: ticket.title,
                quota: ticket.quota,
                registered_count: 0,
                mode: ticket.mode,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    async fn update_quota(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        quota: u32,
        mode: TicketMode,
    ) -> Result<Ticket, RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE tickets SET quota = ?, private = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
                    params![
                        quota,
                        mode.is_private(),
                        Utc::now().to_rfc3339(),
                        ticket_id,
                        owner_id as i64,
                    ],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(RegistryError::NotFound(ticket_id));
            }
            Self::fetch_ticket(conn, &ticket_id)?.ok_or(RegistryError::NotFound(ticket_id))
        })
        .await
    }

    async fn delete(&self, ticket_id: &str, owner_id: UserId) -> Result<(), RegistryError> {
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "DELETE FROM tickets WHERE id = ? AND owner_id = ?",
                    params![ticket_id, owner_id as i64],
                )
                .map_err(db_err)?;
            if changed == 0 {
                return Err(RegistryError::NotFound(ticket_id));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RegistrantStore for SqliteRegistry {
    async fn create(&self, registrant: NewRegistrant) -> Result<Registrant, RegistryError> {
        self.with_conn(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO registrants (id, user_id, ticket_id, ticket_owner_id, is_verified, created_at, updated_at) VALUES (?, ?, ?, ?, 0, ?, ?)",
                params![
                    registrant.id,
                    registrant.user_id as i64,
                    registrant.ticket_id,
                    registrant.ticket_owner_id as i64,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

            Ok(Registrant {
                id: registrant.id,
                user_id: registrant.user_id,
                ticket_id: registrant.ticket_id,
                ticket_owner_id: registrant.ticket_owner_id,
                is_verified: false,
                created_at: now,
            })
        })
        .await
    }

    async fn mark_verified(
        &self,
        registrant_id: &str,
        ticket_id: &str,
        owner_id: UserId,
    ) -> Result<bool, RegistryError> {
        let registrant_id = registrant_id.to_string();
        let ticket_id = ticket_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE registrants SET is_verified = 1, updated_at = ? WHERE id = ? AND ticket_id = ? AND ticket_owner_id = ?",
                    params![
                        Utc::now().to_rfc3339(),
                        registrant_id,
                        ticket_id,
                        owner_id as i64,
                    ],
                )
                .map_err(db_err)?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Registrant>, RegistryError> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {REGISTRANT_COLUMNS} FROM registrants WHERE user_id = ? ORDER BY created_at DESC"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![user_id as i64], Self::row_to_registrant)
                .map_err(db_err)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
        })
        .await
    }

    async fn list_by_ticket(
        &self,
        ticket_id: &str,
        owner_id: UserId,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<RegistrantPage, RegistryError> {
        let ticket_id = ticket_id.to_string();
        let pattern = format!("%{}%", search.unwrap_or(""));
        let page = page.max(1);
        let offset = i64::from(page - 1) * i64::from(limit);

        self.with_conn(move |conn| {
            let filter = "WHERE ticket_id = ?1 AND ticket_owner_id = ?2 AND (id LIKE ?3 OR CAST(user_id AS TEXT) LIKE ?3)";

            let total: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM registrants {filter}"),
                    params![ticket_id, owner_id as i64, pattern],
                    |row| row.get(0),
                )
                .map_err(db_err)?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {REGISTRANT_COLUMNS} FROM registrants {filter} ORDER BY created_at DESC LIMIT ?4 OFFSET ?5"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(
                    params![ticket_id, owner_id as i64, pattern, limit, offset],
                    Self::row_to_registrant,
                )
                .map_err(db_err)?;
            let data = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)?;

            Ok(RegistrantPage::new(data, total as u64, page, limit))
        })
        .await
    }
}
