//! Project settings.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config`, else `dude/config.toml` in the platform
//!    config directory)
//! 3. `DUDE_*` environment variables
//! 4. command-line flags, applied by the caller
//!
//! Once validated and handed to a controller, settings never change.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::scanner::WalkerConfig;

/// Default number of processed files between progress notifications.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 8;

/// Everything a scan needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Folder to scan for duplicates.
    pub root: PathBuf,
    /// Reference folder of files already filed away.
    pub duplicates_folder: Option<PathBuf>,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip dot-files and dot-directories.
    pub skip_hidden: bool,
    /// Skip zero-length files.
    pub skip_empty: bool,
    /// Ignore files smaller than this many bytes.
    pub min_size: Option<u64>,
    /// Ignore files larger than this many bytes.
    pub max_size: Option<u64>,
    /// Gitignore-style patterns.
    pub ignore_patterns: Vec<String>,
    /// Byte-compare files after a checksum match.
    pub verify_content: bool,
    /// Processed files between progress notifications.
    pub progress_interval: usize,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            duplicates_folder: None,
            follow_symlinks: false,
            skip_hidden: false,
            skip_empty: false,
            min_size: None,
            max_size: None,
            ignore_patterns: Vec::new(),
            verify_content: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl ProjectSettings {
    /// Default settings for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the known-duplicates folder.
    #[must_use]
    pub fn with_duplicates_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.duplicates_folder = Some(folder.into());
        self
    }

    /// Enable byte-for-byte confirmation of checksum matches.
    #[must_use]
    pub fn with_verify_content(mut self, verify: bool) -> Self {
        self.verify_content = verify;
        self
    }

    /// Set how many files are processed between progress notifications.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Add a gitignore-style ignore pattern.
    #[must_use]
    pub fn with_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Enable or disable skipping of empty files.
    #[must_use]
    pub fn with_skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Platform default config file, if a home directory can be located.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dude", "dude").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The figment stack of defaults, config file and environment.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file.map(Path::to_path_buf).or_else(Self::default_path) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("DUDE_"))
    }

    /// Load settings from the layered sources.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly named config file is missing or if any layer
    /// holds a malformed value.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
        }
        let settings: Self = Self::figment(config_file)
            .extract()
            .context("Failed to load settings")?;
        log::debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Render the settings as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Canonicalize folders and clamp the progress interval.
    ///
    /// # Errors
    ///
    /// [`EngineError::RootNotFound`] or [`EngineError::NotADirectory`] for
    /// a bad root or duplicates folder.
    pub fn validate(mut self) -> EngineResult<Self> {
        self.root = canonical_dir(&self.root)?;
        if let Some(folder) = self.duplicates_folder.take() {
            let folder = canonical_dir(&folder)?;
            if folder == self.root {
                log::warn!(
                    "Duplicates folder is the root itself; ignoring {}",
                    folder.display()
                );
            } else {
                self.duplicates_folder = Some(folder);
            }
        }
        self.progress_interval = self.progress_interval.max(1);
        Ok(self)
    }

    /// Walker options for the root folder.
    ///
    /// A duplicates folder nested inside the root is excluded so its files
    /// are only ever discovered once.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        let exclude = self
            .duplicates_folder
            .iter()
            .filter(|folder| folder.starts_with(&self.root))
            .cloned()
            .collect();
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            skip_empty: self.skip_empty,
            min_size: self.min_size,
            max_size: self.max_size,
            ignore_patterns: self.ignore_patterns.clone(),
            exclude,
        }
    }

    /// Walker options for the duplicates folder.
    #[must_use]
    pub fn duplicates_walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            exclude: Vec::new(),
            ..self.walker_config()
        }
    }
}

fn canonical_dir(path: &Path) -> EngineResult<PathBuf> {
    let canonical = fs::canonicalize(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => EngineError::RootNotFound(path.to_path_buf()),
        _ => EngineError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    if !canonical.is_dir() {
        return Err(EngineError::NotADirectory(path.to_path_buf()));
    }
    Ok(canonical)
}
