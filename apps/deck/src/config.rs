use std::collections::HashMap;
use std::fs;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub user_id: String,
    pub project: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_id: "local-user".into(),
            project: "default".into(),
        }
    }
}

/// Layered settings: defaults, then `deck.toml` in the working directory,
/// then environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("deck.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("user_id") {
                settings.user_id = v.clone();
            }
            if let Some(v) = file_cfg.get("project") {
                settings.project = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("DECK__USER_ID") {
        settings.user_id = v;
    }
    if let Ok(v) = std::env::var("DECK__PROJECT") {
        settings.project = v;
    }

    settings
}
