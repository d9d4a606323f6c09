use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use super::{parse_datetime, status_from_str, to_i64, Database};
use crate::models::{CookingSession, Cursor, Phase};

fn row_to_session(row: &Row) -> Result<CookingSession> {
    let phase: String = row.get("phase")?;
    let step_index: i64 = row.get("step_index")?;
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(CookingSession {
        id: row.get("id")?,
        recipe_id: row.get("recipe_id")?,
        cursor: Cursor::new(Phase::from_str(&phase)?, usize::try_from(step_index)?),
        status: status_from_str(&status)?,
        started_at: parse_datetime(&started_at)?,
        completed_at: completed_at.map(|s| parse_datetime(&s)).transpose()?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &CookingSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO cooking_sessions (id, recipe_id, phase, step_index, status, started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.recipe_id,
                    record.cursor.phase.as_str(),
                    to_i64(record.cursor.index as u64)?,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.completed_at.as_ref().map(|dt| dt.to_rfc3339()),
                ],
            )
            .with_context(|| "failed to insert cooking session")?;
            Ok(())
        })
        .await
    }

    /// Write back every mutable field of the session in one statement, so a
    /// caller that bailed out mid-operation can never leave a half-updated row.
    pub async fn update_session(&self, session: &CookingSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE cooking_sessions
                 SET recipe_id = ?1,
                     phase = ?2,
                     step_index = ?3,
                     status = ?4,
                     completed_at = ?5
                 WHERE id = ?6",
                params![
                    record.recipe_id,
                    record.cursor.phase.as_str(),
                    to_i64(record.cursor.index as u64)?,
                    record.status.as_str(),
                    record.completed_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.id,
                ],
            )
            .with_context(|| "failed to update cooking session")?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<CookingSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipe_id, phase, step_index, status, started_at, completed_at
                 FROM cooking_sessions
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn log_voice_command(&self, session_id: &str, command: &str) -> Result<()> {
        let session_id = session_id.to_string();
        let command = command.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO voice_commands (session_id, command, recorded_at)
                 VALUES (?1, ?2, ?3)",
                params![session_id, command, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to log voice command")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::{
        CookStep, CookingSession, Cursor, Phase, PrepStep, Recipe, RecipeDraft, SessionStatus,
    };

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("preppad.sqlite3")).expect("open db");
        (dir, db)
    }

    fn sample_recipe() -> Recipe {
        let draft = RecipeDraft {
            title: "Scrambled Eggs".into(),
            ingredients: vec![],
            prep_phase: vec![PrepStep {
                instruction: "Crack eggs into a bowl".into(),
                time_estimate: Some(1),
                category: Some("preparation".into()),
            }],
            cook_phase: vec![CookStep {
                step_number: 1,
                instruction: "Pour eggs into the hot pan".into(),
                time_estimate: Some(1),
                parallel_tasks: vec![],
            }],
            total_time: Some(12),
            prep_time: Some(6),
            cook_time: Some(6),
            servings: Some(1),
            difficulty: Some("easy".into()),
        };
        Recipe::from_draft(draft.validated().unwrap(), "test://recipe".into())
    }

    #[tokio::test]
    async fn recipe_roundtrip() {
        let (_dir, db) = test_db();
        let recipe = sample_recipe();

        db.insert_recipe(&recipe).await.unwrap();
        let loaded = db.get_recipe(&recipe.id).await.unwrap().unwrap();
        assert_eq!(loaded, recipe);

        assert!(db.get_recipe("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_update_rewrites_cursor_and_status() {
        let (_dir, db) = test_db();
        let recipe = sample_recipe();
        db.insert_recipe(&recipe).await.unwrap();

        let mut session =
            CookingSession::new(recipe.id.clone(), Cursor::new(Phase::Prep, 0));
        db.insert_session(&session).await.unwrap();

        session.cursor = Cursor::new(Phase::Cook, 0);
        session.status = SessionStatus::Completed;
        session.completed_at = Some(chrono::Utc::now());
        db.update_session(&session).await.unwrap();

        let loaded = db.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.cursor, Cursor::new(Phase::Cook, 0));
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn favorites_add_and_remove() {
        let (_dir, db) = test_db();
        let recipe = sample_recipe();
        db.insert_recipe(&recipe).await.unwrap();

        db.add_favorite(&recipe.id).await.unwrap();
        db.add_favorite(&recipe.id).await.unwrap();
        assert_eq!(db.list_favorites().await.unwrap(), vec![recipe.id.clone()]);

        db.remove_favorite(&recipe.id).await.unwrap();
        assert!(db.list_favorites().await.unwrap().is_empty());
    }
}
