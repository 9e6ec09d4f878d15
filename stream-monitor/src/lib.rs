pub mod monitor;
pub mod watcher;

pub use monitor::{MonitorConfig, MonitorState, MonitorStats, StreamMonitor};
pub use watcher::KeywordWatcher;
