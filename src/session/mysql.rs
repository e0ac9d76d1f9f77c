use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{SessionData, SessionStore};
use crate::db::Db;
use crate::error::{Error, Result};

/// Session store backed by a MySQL table (`<prefix>sessions` by default).
///
/// Call [`migrate`](MySqlStore::migrate) once at startup to create the table.
#[derive(Clone)]
pub struct MySqlStore {
    db: Db,
    table: String,
}

impl MySqlStore {
    pub fn new(db: Db) -> Self {
        let table = db.table("sessions");
        Self { db, table }
    }

    /// Uses `table` (already prefixed) instead of the default name.
    pub fn with_table(db: Db, table: impl Into<String>) -> Self {
        Self { db, table: table.into() }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn migrate(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS `{}` (\
                `id` VARCHAR(64) NOT NULL PRIMARY KEY, \
                `data` TEXT NOT NULL, \
                `expires_at` DATETIME NOT NULL, \
                KEY `expires_at` (`expires_at`)\
            ) DEFAULT CHARSET=utf8mb4",
            self.table
        );
        self.db.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Deletes expired rows. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let sql = format!("DELETE FROM `{}` WHERE `expires_at` <= UTC_TIMESTAMP()", self.table);
        Ok(self.db.execute(&sql, &[]).await?.rows_affected)
    }
}

#[async_trait]
impl SessionStore for MySqlStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let sql = format!(
            "SELECT `data` FROM `{}` WHERE `id` = ? AND `expires_at` > UTC_TIMESTAMP()",
            self.table
        );
        let rows = self.db.query(&sql, &[Value::from(id)]).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        match row.get("data") {
            Some(Value::String(raw)) => Ok(Some(serde_json::from_str(raw)?)),
            _ => Err(Error::other(format!("session `{id}` has no data column"))),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> Result<()> {
        let sql = format!(
            "INSERT INTO `{}` (`id`, `data`, `expires_at`) \
             VALUES (?, ?, DATE_ADD(UTC_TIMESTAMP(), INTERVAL ? SECOND)) \
             ON DUPLICATE KEY UPDATE `data` = VALUES(`data`), `expires_at` = VALUES(`expires_at`)",
            self.table
        );
        let params = [
            Value::from(id),
            Value::from(serde_json::to_string(data)?),
            Value::from(ttl.as_secs()),
        ];
        self.db.execute(&sql, &params).await?;
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM `{}` WHERE `id` = ?", self.table);
        self.db.execute(&sql, &[Value::from(id)]).await?;
        Ok(())
    }

    async fn touch(&self, id: &str, ttl: Duration) -> Result<()> {
        let sql = format!(
            "UPDATE `{}` SET `expires_at` = DATE_ADD(UTC_TIMESTAMP(), INTERVAL ? SECOND) WHERE `id` = ?",
            self.table
        );
        self.db.execute(&sql, &[Value::from(ttl.as_secs()), Value::from(id)]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;

    #[tokio::test]
    async fn table_uses_the_configured_prefix() {
        let config = DbConfig { table_prefix: "app_".into(), ..DbConfig::default() };
        let db = Db::connect_lazy(&config).unwrap();
        assert_eq!(MySqlStore::new(db.clone()).table(), "app_sessions");
        assert_eq!(MySqlStore::with_table(db, "custom").table(), "custom");
    }
}
