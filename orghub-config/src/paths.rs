//! On-disk layout of a configuration directory.
//!
//! ```text
//! <config_dir>/
//!   default.yaml                    required
//!   environments/<environment>.yaml optional
//!   organizations.yaml              optional, replaces the built-in org catalog
//!   project-templates.yaml          optional, replaces the built-in template catalog
//!   validation.yaml                 optional
//!   templates/*.tera                optional project document overrides
//! <env_dir>/
//!   .env  .env.<environment>  .env.local
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Placeholder substituted with the active environment name in file source paths.
pub const ENVIRONMENT_PLACEHOLDER: &str = "{environment}";

pub const DEFAULT_FILE: &str = "default.yaml";
pub const ENVIRONMENTS_DIR: &str = "environments";
pub const ORGANIZATIONS_FILE: &str = "organizations.yaml";
pub const TEMPLATES_FILE: &str = "project-templates.yaml";
pub const VALIDATION_FILE: &str = "validation.yaml";
pub const DOCUMENT_TEMPLATES_DIR: &str = "templates";

pub const ENV_FILE: &str = ".env";
pub const ENV_LOCAL_FILE: &str = ".env.local";

pub fn default_config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(DEFAULT_FILE)
}

/// `<config_dir>/environments/{environment}.yaml`, placeholder left unexpanded.
pub fn environment_config_pattern(config_dir: &Path) -> PathBuf {
    config_dir
        .join(ENVIRONMENTS_DIR)
        .join(format!("{ENVIRONMENT_PLACEHOLDER}.yaml"))
}

pub fn organizations_path(config_dir: &Path) -> PathBuf {
    config_dir.join(ORGANIZATIONS_FILE)
}

pub fn templates_path(config_dir: &Path) -> PathBuf {
    config_dir.join(TEMPLATES_FILE)
}

pub fn validation_path(config_dir: &Path) -> PathBuf {
    config_dir.join(VALIDATION_FILE)
}

pub fn document_templates_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(DOCUMENT_TEMPLATES_DIR)
}

/// Env files in load order; later files override earlier ones key by key.
pub fn env_file_layers(env_dir: &Path, environment: &str) -> [PathBuf; 3] {
    [
        env_dir.join(ENV_FILE),
        env_dir.join(format!("{ENV_FILE}.{environment}")),
        env_dir.join(ENV_LOCAL_FILE),
    ]
}

/// `./config` when it exists, otherwise the per-user config directory
/// (`~/.config/orghub` on Linux).
pub fn discover_config_dir() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_DIR);
    if local.is_dir() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("orghub"))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_layers_are_ordered() {
        let layers = env_file_layers(Path::new("/srv"), "staging");
        assert_eq!(layers[0], PathBuf::from("/srv/.env"));
        assert_eq!(layers[1], PathBuf::from("/srv/.env.staging"));
        assert_eq!(layers[2], PathBuf::from("/srv/.env.local"));
    }

    #[test]
    fn environment_pattern_keeps_placeholder() {
        let pattern = environment_config_pattern(Path::new("cfg"));
        assert_eq!(pattern, PathBuf::from("cfg/environments/{environment}.yaml"));
    }
}
