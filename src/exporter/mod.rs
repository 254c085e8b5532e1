pub mod batch;
pub mod config;
pub mod filename;
pub mod identity;
pub mod notify;
pub mod reconcile;
pub mod render;
pub mod sanitize;
pub mod source;
pub mod util;
pub mod watcher;
