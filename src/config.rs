use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::dom::Selector;
use crate::scripts::hotkeys::Hotkey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub artifacts: ArtifactIds,
    pub titlebar: TitlebarConfig,
    pub style: StyleConfig,
    pub hotkeys: HotkeyConfig,
    pub logging: LoggingConfig,
}

/// The host page contract. Host class names carry a per-release hash suffix,
/// so the defaults match on the stable prefix.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Origins the injections run on; empty means every page.
    pub origins: Vec<Url>,
    pub layout_wrap: Selector,
    pub content_area: Selector,
    /// Extra CSS selectors that must stay clickable inside the drag region.
    pub drag_exempt: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            origins: Vec::new(),
            layout_wrap: selector(r#"[class*="pageLayout-module__wrap"]"#),
            content_area: selector(r#"[class*="chatroomContent-module__content_area"]"#),
            drag_exempt: vec![r#"[class*="chatroom-module__chatroom"]"#.to_string()],
        }
    }
}

fn selector(source: &str) -> Selector {
    Selector::try_from(source.to_string())
        .unwrap_or_else(|_| unreachable!("built-in selector '{source}' is valid"))
}

impl HostConfig {
    pub fn applies_to(&self, url: &Url) -> bool {
        self.origins.is_empty()
            || self
                .origins
                .iter()
                .any(|origin| origin.origin() == url.origin())
    }
}

/// Element ids marking each injected artifact.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactIds {
    pub font_override: String,
    pub scrollbar_style: String,
    pub sidebar_toggle: String,
    pub titlebar_host: String,
    pub titlebar_global_style: String,
}

impl Default for ArtifactIds {
    fn default() -> Self {
        Self {
            font_override: "shellgraft-font-override".to_string(),
            scrollbar_style: "shellgraft-scrollbar-style".to_string(),
            sidebar_toggle: "shellgraft-sidebar-toggle".to_string(),
            titlebar_host: "shellgraft-titlebar-host".to_string(),
            titlebar_global_style: "shellgraft-titlebar-global-style".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TitlebarConfig {
    pub height: u32,
}

impl Default for TitlebarConfig {
    fn default() -> Self {
        Self { height: 24 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub font_family: String,
    pub scrollbar_size: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: "ui-rounded".to_string(),
            scrollbar_size: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub content_protection: Hotkey,
    pub sidebar: Hotkey,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            content_protection: hotkey("Alt+H"),
            sidebar: hotkey("Alt+L"),
        }
    }
}

fn hotkey(source: &str) -> Hotkey {
    source
        .parse()
        .unwrap_or_else(|_| unreachable!("built-in hotkey '{source}' is valid"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Self::from_yaml(&contents)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// `config.yaml` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "shellgraft", "shellgraft")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }
}
