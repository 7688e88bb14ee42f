pub mod message;
pub mod model;
pub mod rows;
pub mod update;

pub use message::{Command, FetchResult, Message};
pub use model::App;
pub use rows::{Row, RowKey, RowTarget};
pub use update::update;
