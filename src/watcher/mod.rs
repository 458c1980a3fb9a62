mod file_watcher;
mod watch_mode;

pub use file_watcher::FileWatcher;
pub use watch_mode::run_watch_mode;
