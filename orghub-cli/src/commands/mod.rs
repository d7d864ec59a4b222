pub mod config;
pub mod org;
pub mod template;
pub mod watch;
