use std::sync::OnceLock;
use std::time::Duration;

use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Raw recipe text pulled from a web page, before optimization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedRecipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_yield: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
    pub source_url: String,
}

pub struct RecipeScraper {
    client: reqwest::Client,
}

impl RecipeScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<ScrapedRecipe, CoreError> {
        info!("Scraping recipe from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| CoreError::Upstream(format!("failed to fetch {url}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Upstream(format!(
                "{url} returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| CoreError::Upstream(format!("failed to read {url}: {err}")))?;

        parse_recipe_document(&body, url)
    }
}

impl Default for RecipeScraper {
    fn default() -> Self {
        Self::new()
    }
}

fn json_ld_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .expect("json-ld pattern is valid")
    })
}

/// Extract a schema.org/Recipe object from the page's JSON-LD blocks.
pub fn parse_recipe_document(html: &str, url: &str) -> Result<ScrapedRecipe, CoreError> {
    for captures in json_ld_pattern().captures_iter(html) {
        let raw = captures[1].trim();
        let Ok(data) = serde_json::from_str::<Value>(raw) else {
            continue;
        };

        if let Some(recipe) = find_recipe_node(&data) {
            return Ok(scraped_from_node(recipe, url));
        }
    }

    Err(CoreError::Upstream(format!(
        "no structured recipe data found at {url}"
    )))
}

/// Recipe nodes can appear at the top level, inside an array, or inside an
/// `@graph` collection.
fn find_recipe_node(data: &Value) -> Option<&Value> {
    match data {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(data);
            }
            map.get("@graph").and_then(find_recipe_node)
        }
        _ => None,
    }
}

fn is_recipe_type(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn scraped_from_node(node: &Value, url: &str) -> ScrapedRecipe {
    ScrapedRecipe {
        title: string_field(node, "name").unwrap_or_else(|| "Untitled Recipe".into()),
        description: string_field(node, "description").unwrap_or_default(),
        ingredients: string_list(node.get("recipeIngredient")),
        instructions: instruction_list(node.get("recipeInstructions")),
        recipe_yield: yield_field(node.get("recipeYield")),
        prep_time: string_field(node, "prepTime"),
        cook_time: string_field(node, "cookTime"),
        total_time: string_field(node, "totalTime"),
        source_url: url.to_string(),
    }
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Instructions are either plain strings or HowToStep objects with a `text`
/// field.
fn instruction_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Object(map) => map
                        .get("text")
                        .and_then(Value::as_str)
                        .map(|s| s.trim().to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn yield_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Array(items)) => items.first().and_then(|v| yield_field(Some(v))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"
        <html><head>
        <script type="application/ld+json">
        {
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebSite", "name": "Cooking Site"},
                {
                    "@type": "Recipe",
                    "name": "Garlic Butter Pasta",
                    "description": "Quick weeknight pasta.",
                    "recipeIngredient": ["200g spaghetti", "3 cloves garlic", "2 tbsp butter"],
                    "recipeInstructions": [
                        {"@type": "HowToStep", "text": "Boil the spaghetti."},
                        {"@type": "HowToStep", "text": "Melt butter and fry garlic."}
                    ],
                    "recipeYield": "2",
                    "cookTime": "PT15M"
                }
            ]
        }
        </script>
        </head><body></body></html>
    "#;

    #[test]
    fn extracts_recipe_from_graph() {
        let scraped = parse_recipe_document(SAMPLE_PAGE, "https://example.com/pasta").unwrap();
        assert_eq!(scraped.title, "Garlic Butter Pasta");
        assert_eq!(scraped.ingredients.len(), 3);
        assert_eq!(scraped.instructions[1], "Melt butter and fry garlic.");
        assert_eq!(scraped.recipe_yield.as_deref(), Some("2"));
        assert_eq!(scraped.cook_time.as_deref(), Some("PT15M"));
    }

    #[test]
    fn extracts_top_level_recipe_with_string_instructions() {
        let page = r#"<script type="application/ld+json">
            {"@type": "Recipe", "name": "Toast",
             "recipeIngredient": ["bread"],
             "recipeInstructions": ["Toast the bread."]}
        </script>"#;
        let scraped = parse_recipe_document(page, "https://example.com/toast").unwrap();
        assert_eq!(scraped.instructions, vec!["Toast the bread."]);
    }

    #[test]
    fn errors_when_no_recipe_markup() {
        let err = parse_recipe_document("<html><body>hi</body></html>", "https://example.com");
        assert!(matches!(err, Err(CoreError::Upstream(_))));
    }
}
