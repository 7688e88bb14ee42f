//! Icons and glyph constants used throughout the UI.

// Spinner animation frames (braille characters)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// Selection/Navigation indicators
pub const SELECTOR: &str = "▶ ";

// Tree folding
pub const EXPANDED: &str = "▾";
pub const COLLAPSED: &str = "▸";
pub const LEAF: &str = " ";

// Conflict check markers
pub const SYNC_NEEDED: &str = "SYNC";
pub const SYNC_UNKNOWN: &str = "?";
pub const SYNC_INVALID: &str = "!";

// Reviewer approval
// Commit drift against the destination branch
pub const AHEAD: &str = "↑";
pub const BEHIND: &str = "↓";

pub const APPROVED: &str = "✓";
pub const CHANGES_REQUESTED: &str = "✗";
pub const AWAITING_REVIEW: &str = "○";

// Alerts
pub const WARNING: &str = "⚠";

// Checkbox
pub const CHECKED: &str = "[x]";
pub const UNCHECKED: &str = "[ ]";

// List/UI elements
pub const BULLET: &str = "•";
pub const SEPARATOR_CHAR: &str = "─";
