use std::fmt;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::overlay::menu::MenuItemId;

/// Every command the injected layer sends to the native host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    ToggleContentProtection,
    UpdateNotificationBadge,
    GetIsMaximized,
    GetIsDev,
    GetSettings,
    GetContentProtection,
    MenuAction,
}

impl CommandName {
    pub const ALL: [CommandName; 7] = [
        CommandName::ToggleContentProtection,
        CommandName::UpdateNotificationBadge,
        CommandName::GetIsMaximized,
        CommandName::GetIsDev,
        CommandName::GetSettings,
        CommandName::GetContentProtection,
        CommandName::MenuAction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::ToggleContentProtection => "toggle_content_protection",
            CommandName::UpdateNotificationBadge => "update_notification_badge",
            CommandName::GetIsMaximized => "get_is_maximized",
            CommandName::GetIsDev => "get_is_dev",
            CommandName::GetSettings => "get_settings",
            CommandName::GetContentProtection => "get_content_protection",
            CommandName::MenuAction => "menu_action",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.as_str() == name)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command with a fixed wire name and a typed reply.
pub trait HostCommand {
    const NAME: CommandName;
    type Output: DeserializeOwned;

    fn args(&self) -> Value {
        json!({})
    }
}

/// Settings as reported by `get_settings`. Missing fields fall back to
/// their defaults rather than failing the whole reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostSettings {
    pub auto_start: bool,
    pub start_minimized: bool,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ToggleContentProtection;

impl HostCommand for ToggleContentProtection {
    const NAME: CommandName = CommandName::ToggleContentProtection;
    type Output = IgnoredAny;
}

#[derive(Debug, Clone)]
pub struct UpdateNotificationBadge {
    pub text: Option<String>,
}

impl HostCommand for UpdateNotificationBadge {
    const NAME: CommandName = CommandName::UpdateNotificationBadge;
    type Output = IgnoredAny;

    fn args(&self) -> Value {
        json!({ "text": self.text })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetIsMaximized;

impl HostCommand for GetIsMaximized {
    const NAME: CommandName = CommandName::GetIsMaximized;
    type Output = bool;
}

#[derive(Debug, Clone, Copy)]
pub struct GetIsDev;

impl HostCommand for GetIsDev {
    const NAME: CommandName = CommandName::GetIsDev;
    type Output = bool;
}

#[derive(Debug, Clone, Copy)]
pub struct GetSettings;

impl HostCommand for GetSettings {
    const NAME: CommandName = CommandName::GetSettings;
    type Output = HostSettings;
}

#[derive(Debug, Clone, Copy)]
pub struct GetContentProtection;

impl HostCommand for GetContentProtection {
    const NAME: CommandName = CommandName::GetContentProtection;
    type Output = bool;
}

#[derive(Debug, Clone, Copy)]
pub struct MenuAction {
    pub id: MenuItemId,
}

impl HostCommand for MenuAction {
    const NAME: CommandName = CommandName::MenuAction;
    type Output = IgnoredAny;

    fn args(&self) -> Value {
        json!({ "id": self.id.as_str() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::menu::LogLevel;

    #[test]
    fn wire_names_round_trip() {
        for command in CommandName::ALL {
            assert_eq!(CommandName::parse(command.as_str()), Some(command));
        }
        assert_eq!(CommandName::parse("reset_profile"), None);
    }

    #[test]
    fn menu_action_carries_only_the_item_id() {
        let args = MenuAction {
            id: MenuItemId::Log(LogLevel::Warn),
        }
        .args();
        assert_eq!(args, json!({ "id": "menu.log.warn" }));
    }

    #[test]
    fn badge_text_absent_is_sent_as_null() {
        assert_eq!(
            UpdateNotificationBadge { text: None }.args(),
            json!({ "text": null })
        );
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: HostSettings =
            serde_json::from_value(json!({ "autoStart": true })).unwrap();
        assert!(settings.auto_start);
        assert!(!settings.start_minimized);
        assert_eq!(settings.log_level, None);
    }
}
