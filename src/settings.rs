use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub api_base: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            model: "gpt-4".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub wake_word: String,
    pub silence_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            wake_word: "hey prep".into(),
            silence_timeout_secs: 4,
            settle_delay_ms: 500,
            cooldown_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    #[serde(default)]
    optimizer: OptimizerSettings,
    #[serde(default)]
    voice: VoiceSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn optimizer(&self) -> OptimizerSettings {
        self.data.read().unwrap().optimizer.clone()
    }

    pub fn voice(&self) -> VoiceSettings {
        self.data.read().unwrap().voice.clone()
    }

    pub fn update_voice(&self, settings: VoiceSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.voice = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
