// Conversation title repository for Study-Local
// Stores user-assigned thread names; the backend has no title field

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::models::ConversationTitle;
use super::DatabaseManager;

impl DatabaseManager {
    /// Get the title override for a conversation, if any
    pub fn get_conversation_title(&self, conversation_id: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            get_conversation_title_impl(conn, conversation_id)
        })
    }

    /// Set or replace the title override for a conversation
    pub fn set_conversation_title(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.with_connection(|conn| {
            set_conversation_title_impl(conn, conversation_id, title)
        })
    }

    /// Remove the title override for a conversation
    pub fn delete_conversation_title(&self, conversation_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            delete_conversation_title_impl(conn, conversation_id)
        })
    }

    /// Get all title overrides
    pub fn get_all_conversation_titles(&self) -> Result<Vec<ConversationTitle>> {
        self.with_connection(|conn| {
            get_all_conversation_titles_impl(conn)
        })
    }

    /// Move a title override from one conversation id to another
    /// (used when a placeholder thread id is replaced by a server id)
    pub fn rename_conversation_title_key(&self, from: &str, to: &str) -> Result<()> {
        self.with_connection(|conn| {
            if let Some(title) = get_conversation_title_impl(conn, from)? {
                set_conversation_title_impl(conn, to, &title)?;
                delete_conversation_title_impl(conn, from)?;
            }
            Ok(())
        })
    }
}

fn get_conversation_title_impl(conn: &Connection, conversation_id: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare(
        "SELECT title FROM conversation_titles WHERE conversation_id = ?"
    ).context("Failed to prepare get_conversation_title query")?;

    let result = stmt.query_row(params![conversation_id], |row| row.get(0));

    match result {
        Ok(title) => Ok(Some(title)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("Failed to get conversation title"),
    }
}

fn set_conversation_title_impl(conn: &Connection, conversation_id: &str, title: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO conversation_titles (conversation_id, title, updated_at)
        VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(conversation_id) DO UPDATE SET
            title = excluded.title,
            updated_at = datetime('now')
        "#,
        params![conversation_id, title],
    ).context("Failed to set conversation title")?;

    Ok(())
}

fn delete_conversation_title_impl(conn: &Connection, conversation_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM conversation_titles WHERE conversation_id = ?",
        params![conversation_id],
    ).context("Failed to delete conversation title")?;

    Ok(())
}

fn get_all_conversation_titles_impl(conn: &Connection) -> Result<Vec<ConversationTitle>> {
    let mut stmt = conn.prepare(
        "SELECT conversation_id, title, updated_at FROM conversation_titles"
    ).context("Failed to prepare get_all_conversation_titles query")?;

    let titles = stmt.query_map([], |row| {
        Ok(ConversationTitle {
            conversation_id: row.get(0)?,
            title: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }).context("Failed to query conversation titles")?;

    titles.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect conversation titles")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_db() -> DatabaseManager {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        // Keep the temp dir for the process lifetime so the open SQLite
        // connection's file isn't deleted when this helper returns.
        let _ = dir.keep();
        DatabaseManager::new(db_path).unwrap()
    }

    #[test]
    fn test_set_and_get_title() {
        let db = create_test_db();

        db.set_conversation_title("c1", "Thermodynamics review").unwrap();
        assert_eq!(
            db.get_conversation_title("c1").unwrap(),
            Some("Thermodynamics review".to_string())
        );
        assert_eq!(db.get_conversation_title("c2").unwrap(), None);
    }

    #[test]
    fn test_replace_title() {
        let db = create_test_db();

        db.set_conversation_title("c1", "First").unwrap();
        db.set_conversation_title("c1", "Second").unwrap();
        assert_eq!(db.get_conversation_title("c1").unwrap(), Some("Second".to_string()));

        let all = db.get_all_conversation_titles().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_rename_key_moves_title() {
        let db = create_test_db();

        db.set_conversation_title("temp-1700000000000", "My notes").unwrap();
        db.rename_conversation_title_key("temp-1700000000000", "c9").unwrap();

        assert_eq!(db.get_conversation_title("temp-1700000000000").unwrap(), None);
        assert_eq!(db.get_conversation_title("c9").unwrap(), Some("My notes".to_string()));

        // Renaming a key with no override is a no-op
        db.rename_conversation_title_key("missing", "c10").unwrap();
        assert_eq!(db.get_conversation_title("c10").unwrap(), None);
    }
}
