use crate::bridge::HostSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Verbose,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Verbose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
        }
    }

    /// Accepts the native side's spellings, including `warning` and `trace`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "verbose" | "trace" => Some(LogLevel::Verbose),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "Log level: Error",
            LogLevel::Warn => "Log level: Warn",
            LogLevel::Info => "Log level: Info",
            LogLevel::Debug => "Log level: Debug",
            LogLevel::Verbose => "Log level: Verbose",
        }
    }
}

/// Stable identifiers of every menu entry. The string forms are the ids the
/// native `menu_action` command understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MenuItemId {
    ContentProtection,
    Autostart,
    StartMinimized,
    Log(LogLevel),
    CloseWindow,
}

impl MenuItemId {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuItemId::ContentProtection => "menu.content_protection",
            MenuItemId::Autostart => "menu.autostart",
            MenuItemId::StartMinimized => "menu.start_minimized",
            MenuItemId::Log(LogLevel::Error) => "menu.log.error",
            MenuItemId::Log(LogLevel::Warn) => "menu.log.warn",
            MenuItemId::Log(LogLevel::Info) => "menu.log.info",
            MenuItemId::Log(LogLevel::Debug) => "menu.log.debug",
            MenuItemId::Log(LogLevel::Verbose) => "menu.log.verbose",
            MenuItemId::CloseWindow => "window.close",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "menu.content_protection" => Some(MenuItemId::ContentProtection),
            "menu.autostart" => Some(MenuItemId::Autostart),
            "menu.start_minimized" => Some(MenuItemId::StartMinimized),
            "window.close" => Some(MenuItemId::CloseWindow),
            other => other
                .strip_prefix("menu.log.")
                .and_then(|level| LogLevel::ALL.into_iter().find(|l| l.as_str() == level))
                .map(MenuItemId::Log),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Action,
    Check,
    Radio,
    Separator,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Action => "action",
            EntryKind::Check => "check",
            EntryKind::Radio => "radio",
            EntryKind::Separator => "separator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Action {
        id: MenuItemId,
        label: &'static str,
    },
    Check {
        id: MenuItemId,
        label: &'static str,
        shortcut: Option<String>,
    },
    Radio {
        id: MenuItemId,
        label: &'static str,
        value: LogLevel,
    },
    Separator,
}

impl MenuEntry {
    pub fn id(&self) -> Option<MenuItemId> {
        match self {
            MenuEntry::Action { id, .. }
            | MenuEntry::Check { id, .. }
            | MenuEntry::Radio { id, .. } => Some(*id),
            MenuEntry::Separator => None,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            MenuEntry::Action { .. } => EntryKind::Action,
            MenuEntry::Check { .. } => EntryKind::Check,
            MenuEntry::Radio { .. } => EntryKind::Radio,
            MenuEntry::Separator => EntryKind::Separator,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::Action { label, .. }
            | MenuEntry::Check { label, .. }
            | MenuEntry::Radio { label, .. } => *label,
            MenuEntry::Separator => "",
        }
    }

    pub fn shortcut(&self) -> Option<&str> {
        match self {
            MenuEntry::Check { shortcut, .. } => shortcut.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuModel {
    entries: Vec<MenuEntry>,
}

impl MenuModel {
    /// Builds the settings menu. Log-level radios are only offered to
    /// development builds.
    pub fn build(include_log_levels: bool, protection_shortcut: Option<String>) -> Self {
        let mut entries = vec![
            MenuEntry::Check {
                id: MenuItemId::ContentProtection,
                label: "Protect screen",
                shortcut: protection_shortcut,
            },
            MenuEntry::Check {
                id: MenuItemId::Autostart,
                label: "Launch at login",
                shortcut: None,
            },
            MenuEntry::Check {
                id: MenuItemId::StartMinimized,
                label: "Start minimized",
                shortcut: None,
            },
            MenuEntry::Separator,
        ];

        if include_log_levels {
            entries.extend(LogLevel::ALL.into_iter().map(|level| MenuEntry::Radio {
                id: MenuItemId::Log(level),
                label: level.label(),
                value: level,
            }));
            entries.push(MenuEntry::Separator);
        }

        entries.push(MenuEntry::Action {
            id: MenuItemId::CloseWindow,
            label: "Close",
        });

        Self { entries }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn entry(&self, id: MenuItemId) -> Option<&MenuEntry> {
        self.entries.iter().find(|entry| entry.id() == Some(id))
    }
}

/// Check state of every menu entry, derived from one native snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuReflection {
    pub content_protection: bool,
    pub autostart: bool,
    pub start_minimized: bool,
    pub log_level: Option<LogLevel>,
}

impl MenuReflection {
    /// A missing log level reads as `info`; an unrecognised one leaves every
    /// log-level radio unchecked.
    pub fn from_native(settings: &HostSettings, content_protection: bool) -> Self {
        let log_level = match settings.log_level.as_deref() {
            None | Some("") => Some(LogLevel::Info),
            Some(raw) => LogLevel::parse(raw),
        };
        Self {
            content_protection,
            autostart: settings.auto_start,
            start_minimized: settings.start_minimized,
            log_level,
        }
    }

    pub fn is_checked(&self, entry: &MenuEntry) -> bool {
        match entry {
            MenuEntry::Check { id, .. } => match id {
                MenuItemId::ContentProtection => self.content_protection,
                MenuItemId::Autostart => self.autostart,
                MenuItemId::StartMinimized => self.start_minimized,
                _ => false,
            },
            MenuEntry::Radio { value, .. } => self.log_level == Some(*value),
            MenuEntry::Action { .. } | MenuEntry::Separator => false,
        }
    }
}
