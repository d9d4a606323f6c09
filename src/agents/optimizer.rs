use std::time::Duration;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::RecipeDraft;
use crate::scraper::ScrapedRecipe;
use crate::settings::OptimizerSettings;

use super::directive::TransformDirective;

/// Language-model collaborator that rewrites recipes. `rewrite` turns raw
/// scraped text into a two-phase workflow; `transform` re-derives an existing
/// recipe under a dietary or scaling directive. Implementations never mutate
/// their input.
#[async_trait]
pub trait RecipeOptimizer: Send + Sync {
    async fn rewrite(&self, scraped: &ScrapedRecipe) -> Result<RecipeDraft, CoreError>;

    async fn transform(
        &self,
        recipe: &crate::models::Recipe,
        directive: &TransformDirective,
    ) -> Result<RecipeDraft, CoreError>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

const DRAFT_SCHEMA: &str = r#"{
    "title": "Recipe Title",
    "ingredients": [
        {"name": "ingredient name", "amount": "quantity", "unit": "unit", "notes": "prep notes"}
    ],
    "prepPhase": [
        {"instruction": "prep task", "timeEstimate": minutes, "category": "chopping/measuring/preheating/etc"}
    ],
    "cookPhase": [
        {"stepNumber": 1, "instruction": "cooking step", "timeEstimate": minutes, "parallelTasks": ["task1", "task2"]}
    ],
    "totalTime": total_minutes,
    "prepTime": prep_minutes,
    "cookTime": cook_minutes,
    "servings": number_of_servings,
    "difficulty": "easy/medium/hard"
}"#;

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiOptimizer {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiOptimizer {
    pub fn from_settings(settings: &OptimizerSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: std::env::var(&settings.api_key_env).ok(),
            model: settings.model.clone(),
        }
    }

    async fn complete(&self, prompt: String, temperature: f32) -> Result<RecipeDraft, CoreError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CoreError::Upstream("optimizer API key is not configured".into()))?;

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| CoreError::Upstream(format!("optimizer request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Upstream(format!(
                "optimizer returned HTTP {status}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Upstream(format!("optimizer response unreadable: {err}")))?;

        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| CoreError::Upstream("optimizer returned no choices".into()))?;

        parse_draft(content)
    }
}

/// Parse the model's reply into a validated draft, tolerating markdown code
/// fences around the JSON body.
fn parse_draft(content: &str) -> Result<RecipeDraft, CoreError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    let draft: RecipeDraft = serde_json::from_str(body.trim())
        .map_err(|err| CoreError::Upstream(format!("optimizer returned invalid JSON: {err}")))?;

    draft
        .validated()
        .map_err(|err| CoreError::Upstream(format!("optimizer returned incomplete recipe: {err}")))
}

#[async_trait]
impl RecipeOptimizer for OpenAiOptimizer {
    async fn rewrite(&self, scraped: &ScrapedRecipe) -> Result<RecipeDraft, CoreError> {
        info!("Rewriting scraped recipe '{}'", scraped.title);
        let prompt = format!(
            "You are a professional chef and cooking workflow expert. Transform this recipe \
             into a mise-en-place optimized workflow.\n\n\
             Original Recipe:\n\
             Title: {title}\n\
             Ingredients:\n{ingredients}\n\
             Instructions:\n{instructions}\n\
             Servings: {servings}\n\n\
             Create a \"prep phase\" with all preparation tasks that can be done ahead of time, \
             and a \"cook phase\" with ordered cooking steps, identifying tasks that can run in \
             parallel. Estimate timing for each step.\n\n\
             Return only a JSON object with this exact structure:\n{schema}",
            title = scraped.title,
            ingredients = bullet_list(&scraped.ingredients),
            instructions = bullet_list(&scraped.instructions),
            servings = scraped.recipe_yield.as_deref().unwrap_or("unknown"),
            schema = DRAFT_SCHEMA,
        );

        self.complete(prompt, 0.1).await
    }

    async fn transform(
        &self,
        recipe: &crate::models::Recipe,
        directive: &TransformDirective,
    ) -> Result<RecipeDraft, CoreError> {
        info!(
            "Transforming recipe '{}' into {}",
            recipe.title,
            directive.describe()
        );

        let requirement = match directive {
            TransformDirective::Diet(target) => format!(
                "Convert the recipe to be fully {}. Substitute any non-compliant ingredients \
                 and adjust prep and cook steps to match the substitutions.",
                target.as_str()
            ),
            TransformDirective::Scale(factor) => format!(
                "Scale every ingredient amount by a factor of {factor} and adjust serving \
                 count and timing estimates accordingly. Keep the cooking method unchanged."
            ),
        };

        let prompt = format!(
            "You are a professional chef and recipe modification expert. Modify this recipe.\n\n\
             ORIGINAL RECIPE (JSON):\n{recipe_json}\n\n\
             MODIFICATION REQUIRED:\n{requirement}\n\n\
             Preserve the recipe's core flavor profile. Update the title to reflect the change.\n\
             Return only a JSON object with this exact structure:\n{schema}",
            recipe_json = serde_json::to_string_pretty(recipe)
                .map_err(|err| CoreError::Upstream(format!("recipe not serializable: {err}")))?,
            requirement = requirement,
            schema = DRAFT_SCHEMA,
        );

        self.complete(prompt, 0.3).await
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
