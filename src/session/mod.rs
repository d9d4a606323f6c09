pub mod controller;

pub use controller::SessionController;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCommandRequest {
    pub command: String,
    pub session_id: String,
}

/// The closed response schema every consumer of a voice command sees.
///
/// The `should_*` flags are advisory signals telling the presentation layer
/// which client-local timer action to mirror; the core never waits on them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_start_timer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_pause_timer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_resume_timer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_recipe_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_recipe_title: Option<String>,
}

impl VoiceResponse {
    pub fn spoken(text: impl Into<String>) -> Self {
        Self {
            response: text.into(),
            ..Self::default()
        }
    }
}
