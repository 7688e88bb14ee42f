pub mod filter_bar;
pub mod header;
pub mod popups;
pub mod table;

pub use filter_bar::render_filter_bar;
pub use header::render_header;
pub use popups::{
    centered_rect, render_error_popup, render_help_popup, render_project_picker,
    render_share_popup, truncate_string,
};
pub use table::render_table;
