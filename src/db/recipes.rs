use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use super::{parse_datetime, to_u32, Database};
use crate::models::{CookStep, Ingredient, PrepStep, Recipe};

fn row_to_recipe(row: &Row) -> Result<Recipe> {
    let ingredients: String = row.get("ingredients")?;
    let prep_phase: String = row.get("prep_phase")?;
    let cook_phase: String = row.get("cook_phase")?;
    let created_at: String = row.get("created_at")?;

    let optional_u32 = |column: &str, value: Option<i64>| -> Result<Option<u32>> {
        value.map(|v| to_u32(v, column)).transpose()
    };

    Ok(Recipe {
        id: row.get("id")?,
        title: row.get("title")?,
        source_url: row.get("source_url")?,
        ingredients: serde_json::from_str::<Vec<Ingredient>>(&ingredients)
            .context("failed to decode ingredients column")?,
        prep_phase: serde_json::from_str::<Vec<PrepStep>>(&prep_phase)
            .context("failed to decode prep_phase column")?,
        cook_phase: serde_json::from_str::<Vec<CookStep>>(&cook_phase)
            .context("failed to decode cook_phase column")?,
        total_time: optional_u32("total_time", row.get("total_time")?)?,
        prep_time: optional_u32("prep_time", row.get("prep_time")?)?,
        cook_time: optional_u32("cook_time", row.get("cook_time")?)?,
        servings: optional_u32("servings", row.get("servings")?)?,
        difficulty: row.get("difficulty")?,
        created_at: parse_datetime(&created_at)?,
    })
}

impl Database {
    pub async fn insert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let record = recipe.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO recipes (id, title, source_url, ingredients, prep_phase, cook_phase,
                                      total_time, prep_time, cook_time, servings, difficulty, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.id,
                    record.title,
                    record.source_url,
                    serde_json::to_string(&record.ingredients)?,
                    serde_json::to_string(&record.prep_phase)?,
                    serde_json::to_string(&record.cook_phase)?,
                    record.total_time.map(i64::from),
                    record.prep_time.map(i64::from),
                    record.cook_time.map(i64::from),
                    record.servings.map(i64::from),
                    record.difficulty,
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert recipe")?;
            Ok(())
        })
        .await
    }

    pub async fn get_recipe(&self, recipe_id: &str) -> Result<Option<Recipe>> {
        let recipe_id = recipe_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, source_url, ingredients, prep_phase, cook_phase,
                        total_time, prep_time, cook_time, servings, difficulty, created_at
                 FROM recipes
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![recipe_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_recipe(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, source_url, ingredients, prep_phase, cook_phase,
                        total_time, prep_time, cook_time, servings, difficulty, created_at
                 FROM recipes
                 ORDER BY created_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut recipes = Vec::new();
            while let Some(row) = rows.next()? {
                recipes.push(row_to_recipe(row)?);
            }

            Ok(recipes)
        })
        .await
    }

    pub async fn add_favorite(&self, recipe_id: &str) -> Result<()> {
        let recipe_id = recipe_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO favorites (recipe_id, added_at) VALUES (?1, ?2)",
                params![recipe_id, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to add favorite")?;
            Ok(())
        })
        .await
    }

    pub async fn remove_favorite(&self, recipe_id: &str) -> Result<()> {
        let recipe_id = recipe_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM favorites WHERE recipe_id = ?1",
                params![recipe_id],
            )
            .with_context(|| "failed to remove favorite")?;
            Ok(())
        })
        .await
    }

    pub async fn list_favorites(&self) -> Result<Vec<String>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT recipe_id FROM favorites ORDER BY added_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get::<_, String>(0)?);
            }

            Ok(ids)
        })
        .await
    }
}
