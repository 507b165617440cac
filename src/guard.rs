use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    FontOverride,
    ScrollbarStyle,
    SidebarToggle,
    Titlebar,
    Hotkeys,
    BadgeRelay,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::FontOverride => "font-override",
            ArtifactKind::ScrollbarStyle => "scrollbar-style",
            ArtifactKind::SidebarToggle => "sidebar-toggle",
            ArtifactKind::Titlebar => "titlebar",
            ArtifactKind::Hotkeys => "hotkeys",
            ArtifactKind::BadgeRelay => "badge-relay",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install-once bookkeeping for one page lifetime. A full reload builds a
/// new [`crate::page::Page`] and with it a fresh registry.
#[derive(Debug, Default)]
pub struct InstallRegistry {
    installed: BTreeSet<ArtifactKind>,
}

impl InstallRegistry {
    pub fn is_installed(&self, kind: ArtifactKind) -> bool {
        self.installed.contains(&kind)
    }

    /// Returns `false` when `kind` was already marked.
    pub fn mark(&mut self, kind: ArtifactKind) -> bool {
        self.installed.insert(kind)
    }

    pub fn installed(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.installed.iter().copied()
    }
}
