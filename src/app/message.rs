pub use crate::services::{ConflictRequest, FetchRequest, FetchResult};

/// Command to be executed by the main loop after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Request a project fetch; `force` bypasses the response cache.
    FetchProject { force: bool },
    CheckConflicts(Vec<ConflictRequest>),
    OpenUrl(String),
}

/// All possible messages/events in the application
#[derive(Debug)]
pub enum Message {
    // Navigation
    NextItem,
    PreviousItem,
    GoToTop,
    GoToBottom,
    ToggleCollapse,

    // Actions
    OpenSelected,
    Refresh,

    // Filters
    CycleAuthor,
    CycleReviewer,
    CycleSprint,
    CycleFixVersion,
    CycleSync,
    ToggleReadyForReviewer,
    ToggleFilterMode,
    ClearFilters,

    // Popups
    ToggleShare,
    ToggleHelp,
    DismissHelp,
    DismissError,

    // Project picker
    OpenProjectPicker,
    ProjectPickerNext,
    ProjectPickerPrevious,
    SelectProject,
    CloseProjectPicker,

    // Terminal focus
    FocusGained,
    FocusLost,

    // Async results
    FetchComplete(FetchResult),

    // System
    Tick,
    Quit,
}
