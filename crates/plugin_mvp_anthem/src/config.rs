//! Plugin configuration: templates, playback settings, menu behavior.
//!
//! Loaded once from TOML at plugin startup and shared read-only afterwards.
//! When no user configuration exists a versioned default literal is written
//! to disk so server operators have a file to edit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// A named MVP effect: display text key, sound reference, visibility
/// flags, and a permission gate. Immutable after configuration load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvpTemplate {
    /// Localization key for the template's display name.
    pub display_key: String,
    /// Named engine sound event, or a path to a decodable audio file.
    /// Empty means chat/center-text only.
    #[serde(default)]
    pub sound: String,
    #[serde(default = "default_true")]
    pub allow_preview: bool,
    #[serde(default = "default_true")]
    pub show_chat: bool,
    #[serde(default = "default_true")]
    pub show_center_text: bool,
    /// Ordered gate entries: numeric player identities or named
    /// permissions. Empty means everyone is authorized.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthemSettings {
    /// Soundevent files the host should precache for event-name sounds.
    #[serde(default)]
    pub sound_event_files: Vec<String>,
    /// Chat commands that open the selection menu.
    #[serde(default = "default_commands")]
    pub commands: Vec<String>,
    /// Clear the engine's own MVP presentation before playing ours.
    #[serde(default = "default_true")]
    pub remove_builtin_mvp: bool,
    /// Assign a random accessible template on a player's first connect.
    #[serde(default = "default_true")]
    pub give_random_on_first_join: bool,
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    /// How long the center-text announcement stays up. 0 disables it.
    #[serde(default = "default_center_text_duration")]
    pub center_text_duration_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSettings {
    #[serde(default = "default_true")]
    pub freeze_player: bool,
    #[serde(default = "default_true")]
    pub enable_sounds: bool,
    /// Selectable volume percentages. Invalid or empty lists fall back to
    /// a fixed ladder at menu-build time.
    #[serde(default = "default_volume_steps")]
    pub volume_steps: Vec<u32>,
}

/// Categories of templates, category name → template name → template.
/// Names are unique within a category; the category+name pair is unique
/// across the whole configuration.
pub type TemplateMap = BTreeMap<String, BTreeMap<String, MvpTemplate>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthemConfig {
    #[serde(default)]
    pub settings: AnthemSettings,
    #[serde(default)]
    pub menu: MenuSettings,
    #[serde(default = "default_templates")]
    pub mvps: TemplateMap,
}

fn default_true() -> bool {
    true
}

fn default_commands() -> Vec<String> {
    vec!["mvp".to_string()]
}

fn default_volume() -> f32 {
    0.2
}

fn default_center_text_duration() -> u64 {
    10
}

fn default_volume_steps() -> Vec<u32> {
    vec![0, 10, 20, 40, 60, 80, 100]
}

/// Default template set written when no user configuration exists.
fn default_templates() -> TemplateMap {
    let mut public = BTreeMap::new();
    public.insert(
        "mvp_1".to_string(),
        MvpTemplate {
            display_key: "mvp_1.name".to_string(),
            sound: "flawless.mp3".to_string(),
            allow_preview: true,
            show_chat: true,
            show_center_text: true,
            permissions: vec![],
        },
    );
    public.insert(
        "mvp_2".to_string(),
        MvpTemplate {
            display_key: "mvp_2.name".to_string(),
            sound: "florinsalam.mp3".to_string(),
            allow_preview: true,
            show_chat: true,
            show_center_text: true,
            permissions: vec![],
        },
    );

    let mut mvps = BTreeMap::new();
    mvps.insert("category.public_mvp".to_string(), public);
    mvps
}

impl Default for AnthemSettings {
    fn default() -> Self {
        Self {
            sound_event_files: vec![],
            commands: default_commands(),
            remove_builtin_mvp: true,
            give_random_on_first_join: true,
            default_volume: default_volume(),
            center_text_duration_secs: default_center_text_duration(),
        }
    }
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            freeze_player: true,
            enable_sounds: true,
            volume_steps: default_volume_steps(),
        }
    }
}

impl Default for AnthemConfig {
    fn default() -> Self {
        Self {
            settings: AnthemSettings::default(),
            menu: MenuSettings::default(),
            mvps: default_templates(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AnthemConfig {
    /// Loads configuration from a TOML file, writing the default literal
    /// to `path` first when the file does not exist.
    pub async fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            toml::from_str::<AnthemConfig>(&content)?
        } else {
            let default_config = AnthemConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, toml_content).await?;
            info!("created default anthem configuration: {}", path.display());
            default_config
        };
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Checks structural invariants the rest of the plugin relies on.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.settings.default_volume) {
            return Err(format!(
                "default_volume must be within [0, 1], got {}",
                self.settings.default_volume
            ));
        }
        for (category, templates) in &self.mvps {
            if category.trim().is_empty() {
                return Err("category names cannot be blank".to_string());
            }
            for (name, template) in templates {
                if name.trim().is_empty() {
                    return Err(format!("category {category:?} contains a blank template name"));
                }
                if template.display_key.trim().is_empty() {
                    return Err(format!("template {name:?} has a blank display_key"));
                }
            }
        }
        Ok(())
    }

    /// All templates across all categories, in deterministic
    /// category-then-name order.
    pub fn templates(&self) -> impl Iterator<Item = (&str, &str, &MvpTemplate)> {
        self.mvps.iter().flat_map(|(category, templates)| {
            templates
                .iter()
                .map(move |(name, template)| (category.as_str(), name.as_str(), template))
        })
    }

    /// Looks a template up by name across all categories, first match in
    /// iteration order.
    pub fn find_template(&self, name: &str) -> Option<&MvpTemplate> {
        self.mvps.values().find_map(|templates| templates.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        let config = AnthemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settings.commands, vec!["mvp"]);
        assert_eq!(config.settings.default_volume, 0.2);
        assert_eq!(config.settings.center_text_duration_secs, 10);
        assert_eq!(config.mvps.len(), 1);
        assert_eq!(config.templates().count(), 2);
    }

    #[test]
    fn find_template_searches_across_categories() {
        let config = AnthemConfig::default();
        assert!(config.find_template("mvp_1").is_some());
        assert!(config.find_template("mvp_2").is_some());
        assert!(config.find_template("mvp_99").is_none());
    }

    #[test]
    fn deserializes_with_field_defaults() {
        let toml_content = r#"
[settings]
default_volume = 0.5

[mvps."category.vip"."golden"]
display_key = "golden.name"
sound = "golden.mp3"
permissions = ["vip"]
"#;
        let config: AnthemConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.settings.default_volume, 0.5);
        // Unspecified settings keep their defaults.
        assert_eq!(config.settings.commands, vec!["mvp"]);
        assert!(config.settings.give_random_on_first_join);
        assert!(config.menu.freeze_player);

        let golden = config.find_template("golden").unwrap();
        assert!(golden.allow_preview);
        assert!(golden.show_chat);
        assert!(golden.show_center_text);
        assert_eq!(golden.permissions, vec!["vip"]);
    }

    #[test]
    fn validation_rejects_out_of_range_default_volume() {
        let mut config = AnthemConfig::default();
        config.settings.default_volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_blank_names() {
        let mut config = AnthemConfig::default();
        let templates = config.mvps.remove("category.public_mvp").unwrap();
        config.mvps.insert("  ".to_string(), templates);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anthem.toml");

        let config = AnthemConfig::load_or_create(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.templates().count(), 2);

        // Round-trips through the file it just wrote.
        let reloaded = AnthemConfig::load_or_create(&path).await.unwrap();
        assert_eq!(reloaded.settings.commands, config.settings.commands);
    }

    #[tokio::test]
    async fn load_or_create_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anthem.toml");
        tokio::fs::write(
            &path,
            r#"
[settings]
commands = ["mvp", "anthem"]
give_random_on_first_join = false
"#,
        )
        .await
        .unwrap();

        let config = AnthemConfig::load_or_create(&path).await.unwrap();
        assert_eq!(config.settings.commands, vec!["mvp", "anthem"]);
        assert!(!config.settings.give_random_on_first_join);
        // Templates fall back to the default literal.
        assert_eq!(config.templates().count(), 2);
    }
}
