//! `orghub watch`: keep the configuration loaded with hot reload and log
//! every change until interrupted.

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::broadcast::{self, error::RecvError};

use orghub_config::{ConfigEvent, ConfigManager, ConfigTree};

use crate::GlobalArgs;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Debounce window for file events, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

impl WatchArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        // The watcher binds to the ambient runtime during initialize.
        let _guard = runtime.enter();

        let mut options = global.options().hot_reload(true);
        if let Some(ms) = self.debounce_ms {
            options = options.debounce(std::time::Duration::from_millis(ms));
        }
        let manager = ConfigManager::new(options).context("failed to build configuration manager")?;
        let events = manager.subscribe();
        manager
            .initialize()
            .context("failed to load configuration")?;

        let health = manager.get_health();
        tracing::info!(
            environment = health.environment.as_deref().unwrap_or("-"),
            files = health.watched_files.len(),
            "watching configuration"
        );
        for path in &health.watched_files {
            tracing::debug!(path = %path.display(), "watching file");
        }

        let result = runtime.block_on(watch(manager.clone(), events));
        manager.stop_watching();
        result
    }
}

async fn watch(manager: ConfigManager, mut events: broadcast::Receiver<ConfigEvent>) -> Result<()> {
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("ctrl-c handler failed")?;
                tracing::info!("received ctrl-c, stopping watcher");
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(event) => log_event(&manager, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "configuration events dropped");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

fn log_event(manager: &ConfigManager, event: &ConfigEvent) {
    match event {
        ConfigEvent::Initialized { current } => {
            tracing::info!(sections = %current.sections().join(","), "configuration loaded");
        }
        ConfigEvent::Reloaded { previous, current } => {
            let changed = changed_sections(previous, current);
            tracing::info!(
                changed = %changed.join(","),
                environment = %manager.environment().unwrap_or_default(),
                "configuration reloaded"
            );
        }
        ConfigEvent::ReloadFailed { message } => {
            tracing::error!(%message, "reload failed, keeping previous configuration");
        }
    }
}

/// Top-level sections whose value differs between two trees.
fn changed_sections(previous: &ConfigTree, current: &ConfigTree) -> Vec<String> {
    let mut names = previous.sections();
    for name in current.sections() {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.retain(|name| previous.section(name) != current.section(name));
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changed_sections_reports_added_removed_and_edited() {
        let previous = ConfigTree::from_value(json!({
            "cache": { "ttl": 300 },
            "server": { "port": 3000 },
            "logging": { "level": "info" },
        }));
        let current = ConfigTree::from_value(json!({
            "cache": { "ttl": 60 },
            "server": { "port": 3000 },
            "github": { "perPage": 50 },
        }));
        assert_eq!(
            changed_sections(&previous, &current),
            vec!["cache", "github", "logging"]
        );
    }
}
