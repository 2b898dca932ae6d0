//! Read-only configuration.
//!
//! Looked up at `$ZONEWATCH_CONFIG`, else
//! `$XDG_CONFIG_HOME/zonewatch/zonewatch.toml`, else
//! `~/.config/zonewatch/zonewatch.toml`. A missing file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use zonewatch_game_log::{StartAt, TailOptions};
use zonewatch_locator::LocatorConfig;
use zonewatch_locator::paths;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "ZONEWATCH_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Explicit client log path. `ZONEWATCH_CLIENT_LOG` takes precedence.
    #[serde(default)]
    pub client_log: Option<PathBuf>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Emit the whole existing log instead of only new lines.
    #[serde(default)]
    pub replay_from_start: bool,

    #[serde(default = "default_true")]
    pub use_notify: bool,

    #[serde(default = "default_max_read_kib")]
    pub max_read_kib: usize,

    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_max_read_kib() -> usize {
    1024
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_log: None,
            poll_interval_ms: default_poll_interval_ms(),
            replay_from_start: false,
            use_notify: default_true(),
            max_read_kib: default_max_read_kib(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Loads the config from its default location.
    pub fn load() -> anyhow::Result<Self> {
        let home = paths::home_dir();
        let path = config_path(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            home.as_deref(),
        );
        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn tail_options(&self) -> TailOptions {
        TailOptions {
            start_at: if self.replay_from_start {
                StartAt::Beginning
            } else {
                StartAt::End
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(10)),
            max_read_bytes: self.max_read_kib.max(1) * 1024,
            use_notify: self.use_notify,
            ..TailOptions::default()
        }
    }

    /// Applies `client_log` as a fallback override on top of `base`.
    pub fn locator_config(&self, base: LocatorConfig) -> LocatorConfig {
        match &self.client_log {
            Some(path) => {
                let path = paths::expand_tilde(path, base.home.as_deref());
                base.with_fallback_override(path, "config file")
            }
            None => base,
        }
    }
}

fn config_path(
    explicit: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    let base = xdg_config_home
        .filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(".config")))?;
    Some(base.join("zonewatch").join("zonewatch.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.client_log, None);
        assert_eq!(config.poll_interval_ms, 500);
        assert!(!config.replay_from_start);
        assert!(config.use_notify);
        assert_eq!(config.max_read_kib, 1024);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn partial_toml() {
        let config: Config = toml::from_str(r#"replay_from_start = true"#).unwrap();
        assert!(config.replay_from_start);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_from(&tmp.path().join("zonewatch.toml")).unwrap();
        assert_eq!(config, Config::default());
        // Never written back.
        assert!(!tmp.path().join("zonewatch.toml").exists());
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("zonewatch.toml");
        std::fs::write(
            &path,
            "client_log = \"~/poe/logs/Client.txt\"\npoll_interval_ms = 250\nuse_notify = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.client_log, Some(PathBuf::from("~/poe/logs/Client.txt")));
        assert_eq!(config.poll_interval_ms, 250);
        assert!(!config.use_notify);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("zonewatch.toml");
        std::fs::write(&path, "poll_interval_ms = \"fast\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn tail_options_mapping() {
        let config = Config {
            poll_interval_ms: 0,
            replay_from_start: true,
            max_read_kib: 4,
            ..Config::default()
        };
        let opts = config.tail_options();
        assert_eq!(opts.start_at, StartAt::Beginning);
        assert_eq!(opts.poll_interval, Duration::from_millis(10));
        assert_eq!(opts.max_read_bytes, 4096);
    }

    #[test]
    fn client_log_is_fallback_override() {
        let config = Config {
            client_log: Some(PathBuf::from("~/logs/Client.txt")),
            ..Config::default()
        };
        let base = LocatorConfig {
            home: Some(PathBuf::from("/home/exile")),
            ..LocatorConfig::default()
        };
        let lc = config.locator_config(base);
        assert_eq!(
            lc.override_path,
            Some(PathBuf::from("/home/exile/logs/Client.txt"))
        );
        assert_eq!(lc.override_source, "config file");

        let env_wins = LocatorConfig {
            override_path: Some(PathBuf::from("/from/env/Client.txt")),
            ..LocatorConfig::default()
        };
        let lc = config.locator_config(env_wins);
        assert_eq!(lc.override_path, Some(PathBuf::from("/from/env/Client.txt")));
    }

    #[test]
    fn config_path_precedence() {
        let home = Path::new("/home/exile");
        assert_eq!(
            config_path(Some("/etc/zw.toml".into()), None, Some(home)),
            Some(PathBuf::from("/etc/zw.toml"))
        );
        assert_eq!(
            config_path(None, Some("/xdg".into()), Some(home)),
            Some(PathBuf::from("/xdg/zonewatch/zonewatch.toml"))
        );
        assert_eq!(
            config_path(None, Some("relative".into()), Some(home)),
            Some(PathBuf::from("/home/exile/.config/zonewatch/zonewatch.toml"))
        );
        assert_eq!(config_path(None, None, None), None);
    }
}
