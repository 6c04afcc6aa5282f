//! Sqlite-backed persistence: console settings and the local-storage key/value table.

use std::path::Path;

use anyhow::Context as _;
use catalog_core::{SESSION_KEY, Session, SessionPersistence, Settings, Theme};
use rusqlite::{Connection, OptionalExtension as _};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                api_url TEXT NOT NULL
            );
            INSERT OR IGNORE INTO settings (id, api_url)
            VALUES (1, 'http://localhost:8080/api');

            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
        )?;

        self.add_settings_column("attach_token INTEGER NOT NULL DEFAULT 0")?;
        self.add_settings_column("theme TEXT NOT NULL DEFAULT 'dark'")?;
        Ok(())
    }

    fn add_settings_column(&self, definition: &str) -> anyhow::Result<()> {
        match self
            .conn
            .execute(&format!("ALTER TABLE settings ADD COLUMN {definition}"), [])
        {
            Ok(_) => Ok(()),
            Err(err) if err.to_string().contains("duplicate column name") => Ok(()),
            Err(err) => Err(err).with_context(|| format!("add settings column `{definition}`")),
        }
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT api_url, attach_token, theme FROM settings WHERE id = 1",
                [],
                |row| {
                    let api_url: String = row.get(0)?;
                    let attach_token: i64 = row.get(1)?;
                    let theme: String = row.get(2)?;
                    Ok((api_url, attach_token, theme))
                },
            )
            .optional()?;

        let Some((api_url, attach_token, theme)) = row else {
            return Ok(Settings::default());
        };

        let mut settings = Settings {
            api_url,
            attach_token: attach_token != 0,
            theme: theme.parse::<Theme>().unwrap_or(Theme::Dark),
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET api_url = ?, attach_token = ?, theme = ? WHERE id = 1",
            (
                &settings.api_url,
                i64::from(settings.attach_token),
                settings.theme.as_str(),
            ),
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read local storage key `{key}`"))?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, unixepoch())
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                (key, value),
            )
            .with_context(|| format!("write local storage key `{key}`"))?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?", [key])
            .with_context(|| format!("remove local storage key `{key}`"))?;
        Ok(())
    }
}

impl SessionPersistence for Storage {
    /// A corrupt entry reads as signed out.
    fn load_session(&self) -> anyhow::Result<Option<Session>> {
        let Some(raw) = self.get_item(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable stored session");
                Ok(None)
            }
        }
    }

    fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        let raw = serde_json::to_string(session).context("serialize session")?;
        self.set_item(SESSION_KEY, &raw)
    }

    fn clear_session(&self) -> anyhow::Result<()> {
        self.remove_item(SESSION_KEY)
    }
}
