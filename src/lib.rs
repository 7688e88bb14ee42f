pub mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod icons;
pub mod services;
pub mod view;

pub use app::{update, App, Command, FetchResult, Message};
pub use config::Config;
pub use data::{AggregatedData, FilterSelection, PullRequest};
pub use error::{Error, Result};
pub use view::ui;
