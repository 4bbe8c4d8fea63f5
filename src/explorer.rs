//! Foreground File-Explorer inspection seam.
//!
//! The desktop app uses the foreground Explorer window (current folder,
//! selected items) as drag-and-drop context for the agent. That lookup is
//! Windows shell automation; everything behind this seam is best-effort
//! and a caller must never see a failure — just an empty selection.

use std::path::PathBuf;

/// Folder and selection of the foreground Explorer window, when one exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorerSelection {
    pub folder: Option<PathBuf>,
    pub items: Vec<PathBuf>,
}

impl ExplorerSelection {
    pub fn is_empty(&self) -> bool {
        self.folder.is_none() && self.items.is_empty()
    }
}

/// Snapshot the foreground Explorer window. Returns the empty selection
/// whenever there is no foreground Explorer, the platform has no Explorer,
/// or the shell lookup fails for any reason.
pub fn foreground_selection() -> ExplorerSelection {
    #[cfg(windows)]
    {
        // The COM Shell.Application walk lives out-of-crate; no foreground
        // window information is available here, so report nothing selected.
        ExplorerSelection::default()
    }
    #[cfg(not(windows))]
    {
        ExplorerSelection::default()
    }
}
