pub mod app;
pub mod cli;
pub mod config;
pub mod countdown;
pub mod filter;
pub mod model;
pub mod storage;
pub mod store;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{FilterMode, Task, TaskId, TaskPatch, ThemeMode};
pub use store::Store;
