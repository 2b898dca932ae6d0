use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::layouts::{
    self, Base, COMPATDATA_DEPTH, GAMES, GameInstall, PROBE_ROOTS, ProbeRoot, RootTemplate,
    STEAM_ROOTS,
};
use crate::probe::{ProbeLimits, probe_root};
use crate::{LocateError, OVERRIDE_ENV, library, paths};

/// Anything that can resolve the client log path.
///
/// `Ok(None)` means nothing was found and the caller should retry later.
pub trait Locate: Send {
    fn resolve(&self) -> Result<Option<PathBuf>, LocateError>;
}

/// Inputs for a [`Locator`].
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Explicit path that bypasses every search.
    pub override_path: Option<PathBuf>,
    /// Where the override came from, for error messages.
    pub override_source: String,
    pub home: Option<PathBuf>,
    pub xdg_data_home: Option<PathBuf>,
    pub games: Vec<GameInstall>,
    pub steam_roots: Vec<RootTemplate>,
    pub probe_roots: Vec<ProbeRoot>,
    /// Entries read per directory during the prefix probe.
    pub max_probe_entries: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            override_path: None,
            override_source: OVERRIDE_ENV.into(),
            home: None,
            xdg_data_home: None,
            games: GAMES.to_vec(),
            steam_roots: STEAM_ROOTS.to_vec(),
            probe_roots: PROBE_ROOTS.to_vec(),
            max_probe_entries: 256,
        }
    }
}

impl LocatorConfig {
    /// Builds a config from `HOME`, `XDG_DATA_HOME` and the override variable.
    pub fn from_env() -> Self {
        let home = paths::home_dir();
        let xdg_data_home = paths::xdg_data_home(home.as_deref());
        let override_path = std::env::var_os(OVERRIDE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Self {
            override_path,
            home,
            xdg_data_home,
            ..Self::default()
        }
    }

    /// Sets an override unless one is already present.
    ///
    /// The environment variable wins over lower-priority sources such as a
    /// config file.
    pub fn with_fallback_override(mut self, path: PathBuf, source: impl Into<String>) -> Self {
        if self.override_path.is_none() {
            self.override_path = Some(path);
            self.override_source = source.into();
        }
        self
    }

    fn base_dir(&self, base: Base) -> Option<&Path> {
        match base {
            Base::Home => self.home.as_deref(),
            Base::XdgData => self.xdg_data_home.as_deref(),
        }
    }
}

/// Finds the client log on disk.
///
/// Stateless: every call re-runs the search against the current filesystem.
#[derive(Debug, Clone)]
pub struct Locator {
    config: LocatorConfig,
}

impl Locator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Creates a locator from the process environment.
    pub fn from_env() -> Self {
        Self::new(LocatorConfig::from_env())
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Validates the explicit override, if any.
    fn check_override(&self, path: &Path) -> Result<PathBuf, LocateError> {
        let invalid = |reason: String| LocateError::InvalidOverride {
            source_name: self.config.override_source.clone(),
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_absolute() {
            return Err(invalid("not an absolute path".into()));
        }
        let meta = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => invalid("does not exist".into()),
            _ => invalid(e.to_string()),
        })?;
        if !meta.is_file() {
            return Err(invalid("not a regular file".into()));
        }
        File::open(path).map_err(|e| invalid(format!("not readable: {e}")))?;

        Ok(path.to_path_buf())
    }

    /// Existing Steam roots, deduplicated by canonical path.
    fn steam_roots(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        self.config
            .steam_roots
            .iter()
            .filter_map(|t| Some(self.config.base_dir(t.base)?.join(t.rel)))
            .filter(|p| p.is_dir())
            .filter(|p| seen.insert(canonical(p)))
            .collect()
    }

    fn search_libraries(&self, roots: &[PathBuf]) -> Option<PathBuf> {
        let mut seen: HashSet<PathBuf> = roots.iter().map(|r| canonical(r)).collect();

        // Fixed roots first, then extra libraries in the order Steam lists them.
        let extra: Vec<PathBuf> = roots
            .iter()
            .flat_map(|r| library::library_paths(r))
            .filter(|p| p.is_absolute() && seen.insert(canonical(p)))
            .collect();

        roots.iter().chain(&extra).find_map(|library| {
            self.config
                .games
                .iter()
                .flat_map(|g| layouts::library_candidates(library, g))
                .find(|p| is_readable_file(p))
        })
    }

    fn probe_prefixes(&self, steam_roots: &[PathBuf]) -> Option<PathBuf> {
        let fixed = self.config.probe_roots.iter().filter_map(|r| {
            let dir = self.config.base_dir(r.base)?.join(r.rel);
            Some((dir, r.depth))
        });
        // Non-Steam shortcuts get their own Proton prefixes too.
        let compat = steam_roots
            .iter()
            .map(|r| (r.join("steamapps").join("compatdata"), COMPATDATA_DEPTH));

        fixed.chain(compat).find_map(|(dir, depth)| {
            let limits = ProbeLimits {
                depth,
                max_entries: self.config.max_probe_entries,
            };
            let hit = probe_root(&dir, &self.config.games, limits, &is_readable_file);
            if hit.is_none() {
                tracing::trace!(root = %dir.display(), "probe found nothing");
            }
            hit
        })
    }
}

impl Locate for Locator {
    fn resolve(&self) -> Result<Option<PathBuf>, LocateError> {
        if let Some(path) = &self.config.override_path {
            return self.check_override(path).map(Some);
        }

        let roots = self.steam_roots();
        let found = self
            .search_libraries(&roots)
            .or_else(|| self.probe_prefixes(&roots));

        match &found {
            Some(path) => tracing::debug!(path = %path.display(), "client log located"),
            None => tracing::trace!("client log not found"),
        }
        Ok(found)
    }
}

/// A fixed path: found when it is a readable file, not found otherwise.
#[derive(Debug, Clone)]
pub struct FixedPath(pub PathBuf);

impl Locate for FixedPath {
    fn resolve(&self) -> Result<Option<PathBuf>, LocateError> {
        Ok(is_readable_file(&self.0).then(|| self.0.clone()))
    }
}

fn is_readable_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file()) && File::open(path).is_ok()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
