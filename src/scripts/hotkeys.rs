use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use keyboard_types::{Key, KeyboardEvent, Modifiers};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bridge::ToggleContentProtection;
use crate::guard::ArtifactKind;
use crate::page::{EventKind, ListenerTarget, Page, Phase};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HotkeyParseError {
    #[error("hotkey is empty")]
    Empty,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("hotkey key must be a single letter or digit, got '{0}'")]
    InvalidKey(String),
    #[error("hotkey '{0}' needs at least one modifier")]
    MissingModifier(String),
}

/// One modified key, written like `Alt+H` or `Ctrl+Shift+1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Hotkey {
    modifiers: Modifiers,
    key: char,
}

impl Hotkey {
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Matches on the produced character or on the physical key, so the
    /// shortcut survives non-Latin keyboard layouts. Extra modifiers are
    /// tolerated.
    pub fn matches(&self, event: &KeyboardEvent) -> bool {
        if !event.modifiers.contains(self.modifiers) {
            return false;
        }
        let by_character = match &event.key {
            Key::Character(text) => {
                let mut chars = text.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c.to_ascii_lowercase() == self.key)
            }
            _ => false,
        };
        by_character || event.code.to_string() == self.code_name()
    }

    fn code_name(&self) -> String {
        if self.key.is_ascii_digit() {
            format!("Digit{}", self.key)
        } else {
            format!("Key{}", self.key.to_ascii_uppercase())
        }
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(HotkeyParseError::Empty);
        }
        let mut parts: Vec<&str> = raw.split('+').map(str::trim).collect();
        let key_part = parts.pop().unwrap_or_default();

        let mut chars = key_part.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => c.to_ascii_lowercase(),
            _ => return Err(HotkeyParseError::InvalidKey(key_part.to_string())),
        };

        let mut modifiers = Modifiers::empty();
        for part in parts {
            let modifier = match part.to_ascii_lowercase().as_str() {
                "alt" | "option" => Modifiers::ALT,
                "ctrl" | "control" => Modifiers::CONTROL,
                "shift" => Modifiers::SHIFT,
                "meta" | "cmd" | "super" => Modifiers::META,
                _ => return Err(HotkeyParseError::UnknownModifier(part.to_string())),
            };
            modifiers.insert(modifier);
        }
        if modifiers.is_empty() {
            return Err(HotkeyParseError::MissingModifier(raw.to_string()));
        }

        Ok(Self { modifiers, key })
    }
}

impl TryFrom<String> for Hotkey {
    type Error = HotkeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::META, "Meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key.to_ascii_uppercase())
    }
}

/// Registers a capturing window listener so host handlers cannot swallow
/// the shortcut. Held-down keys fire once.
pub fn on_hotkey<F>(page: &Page, hotkey: Hotkey, action: F)
where
    F: Fn(&Rc<Page>) + 'static,
{
    page.add_listener(
        ListenerTarget::Window,
        EventKind::KeyDown,
        Phase::Capture,
        move |page, event| {
            let Some(key) = event.key() else {
                return;
            };
            if key.repeat || !hotkey.matches(key) {
                return;
            }
            action(page);
        },
    );
}

/// Installs the content-protection shortcut. Returns `false` when it was
/// already installed.
pub fn install(page: &Rc<Page>, hotkey: Hotkey) -> bool {
    page.install_once(ArtifactKind::Hotkeys, |page| {
        debug!(target = "hotkeys", %hotkey, "binding content protection hotkey");
        on_hotkey(page, hotkey, |page| match page.bridge().try_get_invoke() {
            Some(invoker) => invoker.fire(page, ToggleContentProtection),
            None => warn!(target = "hotkeys", "native invoke not available, hotkey ignored"),
        });
    })
    .is_some()
}

#[cfg(test)]
mod tests {
    use keyboard_types::Code;

    use super::*;

    fn key_event(key: &str, code: Code, modifiers: Modifiers) -> KeyboardEvent {
        KeyboardEvent {
            key: Key::Character(key.to_string()),
            code,
            modifiers,
            ..Default::default()
        }
    }

    #[test]
    fn parses_and_displays_canonically() {
        let hotkey: Hotkey = "shift + alt + h".parse().unwrap();
        assert_eq!(hotkey.to_string(), "Alt+Shift+H");
        assert_eq!("Alt+L".parse::<Hotkey>().unwrap().to_string(), "Alt+L");
    }

    #[test]
    fn rejects_malformed_hotkeys() {
        assert_eq!("".parse::<Hotkey>(), Err(HotkeyParseError::Empty));
        assert_eq!(
            "H".parse::<Hotkey>(),
            Err(HotkeyParseError::MissingModifier("H".to_string()))
        );
        assert_eq!(
            "Hyper+H".parse::<Hotkey>(),
            Err(HotkeyParseError::UnknownModifier("Hyper".to_string()))
        );
        assert_eq!(
            "Alt+F1".parse::<Hotkey>(),
            Err(HotkeyParseError::InvalidKey("F1".to_string()))
        );
    }

    #[test]
    fn matches_character_or_physical_key() {
        let hotkey: Hotkey = "Alt+H".parse().unwrap();
        assert!(hotkey.matches(&key_event("H", Code::KeyH, Modifiers::ALT)));
        assert!(hotkey.matches(&key_event("˙", Code::KeyH, Modifiers::ALT)));
        assert!(hotkey.matches(&key_event("h", Code::KeyJ, Modifiers::ALT | Modifiers::SHIFT)));
        assert!(!hotkey.matches(&key_event("h", Code::KeyH, Modifiers::CONTROL)));
        assert!(!hotkey.matches(&key_event("j", Code::KeyJ, Modifiers::ALT)));
    }
}
