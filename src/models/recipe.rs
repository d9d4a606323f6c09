use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Ingredient {
    /// Render the ingredient the way it is read aloud, e.g. "2 large eggs".
    pub fn spoken(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(amount) = self.amount.as_deref() {
            parts.push(amount);
        }
        if let Some(unit) = self.unit.as_deref() {
            parts.push(unit);
        }
        parts.push(&self.name);
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrepStep {
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CookStep {
    pub step_number: u32,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<u32>,
    #[serde(default)]
    pub parallel_tasks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prep,
    Cook,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prep => "prep",
            Phase::Cook => "cook",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "prep" => Ok(Phase::Prep),
            "cook" => Ok(Phase::Cook),
            other => bail!("unknown phase '{other}'"),
        }
    }
}

/// A recipe as produced by the optimizer, before it has been assigned an
/// identity and persisted. This is also the shape the language model is asked
/// to emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub prep_phase: Vec<PrepStep>,
    #[serde(default)]
    pub cook_phase: Vec<CookStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl RecipeDraft {
    /// Reject structurally incomplete drafts and re-number cook steps so
    /// `step_number` is a dense 1-based index matching position.
    pub fn validated(mut self) -> Result<Self> {
        if self.title.trim().is_empty() {
            bail!("recipe draft has no title");
        }
        if self.prep_phase.is_empty() && self.cook_phase.is_empty() {
            bail!("recipe draft has no prep or cook steps");
        }
        for (i, step) in self.cook_phase.iter_mut().enumerate() {
            step.step_number = (i + 1) as u32;
        }
        Ok(self)
    }
}

/// A persisted recipe. Immutable once created; dietary and scaling transforms
/// produce a new `Recipe` under a fresh id rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub ingredients: Vec<Ingredient>,
    pub prep_phase: Vec<PrepStep>,
    pub cook_phase: Vec<CookStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn from_draft(draft: RecipeDraft, source_url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            source_url,
            ingredients: draft.ingredients,
            prep_phase: draft.prep_phase,
            cook_phase: draft.cook_phase,
            total_time: draft.total_time,
            prep_time: draft.prep_time,
            cook_time: draft.cook_time,
            servings: draft.servings,
            difficulty: draft.difficulty,
            created_at: Utc::now(),
        }
    }

    pub fn step_at(&self, phase: Phase, index: usize) -> Option<&str> {
        match phase {
            Phase::Prep => self.prep_phase.get(index).map(|s| s.instruction.as_str()),
            Phase::Cook => self.cook_phase.get(index).map(|s| s.instruction.as_str()),
        }
    }

    pub fn phase_len(&self, phase: Phase) -> usize {
        match phase {
            Phase::Prep => self.prep_phase.len(),
            Phase::Cook => self.cook_phase.len(),
        }
    }

    /// True when (phase, index) is the final step of the whole recipe. The
    /// last prep step qualifies only when the cook phase is empty.
    pub fn is_last_overall(&self, phase: Phase, index: usize) -> bool {
        match phase {
            Phase::Prep => {
                self.cook_phase.is_empty()
                    && !self.prep_phase.is_empty()
                    && index + 1 == self.prep_phase.len()
            }
            Phase::Cook => !self.cook_phase.is_empty() && index + 1 == self.cook_phase.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_with(prep: usize, cook: usize) -> RecipeDraft {
        RecipeDraft {
            title: "Test".into(),
            ingredients: vec![],
            prep_phase: (0..prep)
                .map(|i| PrepStep {
                    instruction: format!("prep {i}"),
                    time_estimate: None,
                    category: None,
                })
                .collect(),
            cook_phase: (0..cook)
                .map(|i| CookStep {
                    step_number: 0,
                    instruction: format!("cook {i}"),
                    time_estimate: None,
                    parallel_tasks: vec![],
                })
                .collect(),
            total_time: None,
            prep_time: None,
            cook_time: None,
            servings: None,
            difficulty: None,
        }
    }

    #[test]
    fn validated_renumbers_cook_steps() {
        let draft = draft_with(1, 3).validated().unwrap();
        let numbers: Vec<u32> = draft.cook_phase.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn validated_rejects_empty_phases() {
        assert!(draft_with(0, 0).validated().is_err());
        assert!(draft_with(1, 0).validated().is_ok());
    }

    #[test]
    fn last_overall_only_at_end_of_cook() {
        let recipe = Recipe::from_draft(draft_with(2, 3).validated().unwrap(), "test".into());
        assert!(!recipe.is_last_overall(Phase::Prep, 1));
        assert!(!recipe.is_last_overall(Phase::Cook, 1));
        assert!(recipe.is_last_overall(Phase::Cook, 2));
    }

    #[test]
    fn last_prep_step_is_terminal_when_no_cook_phase() {
        let recipe = Recipe::from_draft(draft_with(2, 0).validated().unwrap(), "test".into());
        assert!(!recipe.is_last_overall(Phase::Prep, 0));
        assert!(recipe.is_last_overall(Phase::Prep, 1));
    }

    #[test]
    fn ingredient_spoken_skips_missing_fields() {
        let ing = Ingredient {
            name: "eggs".into(),
            amount: Some("2".into()),
            unit: Some("large".into()),
            notes: None,
        };
        assert_eq!(ing.spoken(), "2 large eggs");

        let bare = Ingredient {
            name: "salt".into(),
            amount: None,
            unit: None,
            notes: None,
        };
        assert_eq!(bare.spoken(), "salt");
    }
}
