//! Filesystem, environment, and profile-file collaborators for pathed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use pd_core::{CoreError, CoreResult, Directories, PathEntry, PathRepository, PathStore, Source};

/// Directory name used under the platform config directory.
pub const APP_DIR_NAME: &str = "pathed";

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Directory queries against the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectories;

impl Directories for FsDirectories {
    fn list_children(&self, path: &Path) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true);
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                Ok(_) => {}
                Err(err) if err.depth() == 0 => {
                    return Err(CoreError::Unreadable {
                        path: path.to_path_buf(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => debug!(%err, "skipping unreadable child"),
            }
        }
        Ok(names)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.is_dir())
    }

    fn roots(&self) -> Vec<PathBuf> {
        if cfg!(windows) {
            ('C'..='Z')
                .chain('A'..='B')
                .map(|letter| PathBuf::from(format!("{letter}:\\")))
                .filter(|root| root.is_dir())
                .collect()
        } else {
            vec![PathBuf::from("/")]
        }
    }
}

/// Read an environment variable, treating a missing one as empty.
pub fn read_env_var(name: &str) -> String {
    std::env::var_os(name)
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split a PATH-like value into unsectioned entries, dropping empty segments.
pub fn parse_env_entries(value: &str, separator: char, dirs: &dyn Directories) -> Vec<PathEntry> {
    value
        .split(separator)
        .filter(|segment| !segment.is_empty())
        .map(|segment| PathEntry::new(segment, Source::None, dirs.exists(Path::new(segment))))
        .collect()
}

#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
struct Profile {
    #[serde(default)]
    system: Vec<String>,
    #[serde(default)]
    user: Vec<String>,
}

/// A YAML file holding separate system and user entry lists.
#[derive(Debug, Clone)]
pub struct ProfileFile {
    path: PathBuf,
}

impl ProfileFile {
    /// Profile stored at `path`. Nothing is read until `load`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False when the file exists but is marked read-only.
    pub fn is_writable(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(meta) => !meta.permissions().readonly(),
            Err(_) => true,
        }
    }

    fn read(&self) -> CoreResult<Profile> {
        if !self.path.exists() {
            return Ok(Profile::default());
        }
        let contents =
            fs::read_to_string(&self.path).map_err(|err| CoreError::Storage(err.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|err| CoreError::Storage(err.to_string()))
    }
}

impl PathRepository for ProfileFile {
    fn load(&self, dirs: &dyn Directories) -> CoreResult<Vec<PathEntry>> {
        let profile = self.read()?;
        let section = |paths: Vec<String>, source: Source| {
            paths
                .into_iter()
                .filter(|path| !path.is_empty())
                .map(move |path| {
                    let exists = dirs.exists(Path::new(&path));
                    PathEntry::new(path, source, exists)
                })
        };
        let mut entries: Vec<PathEntry> = section(profile.system, Source::System).collect();
        entries.extend(section(profile.user, Source::User));
        Ok(entries)
    }

    fn persist(&self, store: &PathStore) -> CoreResult<()> {
        let section = |source: Source| -> Vec<String> {
            store
                .section_paths(source)
                .into_iter()
                .map(str::to_owned)
                .collect()
        };
        let profile = Profile {
            system: section(Source::System),
            user: section(Source::User),
        };

        if self.read().ok().as_ref() == Some(&profile) {
            debug!(path = %self.path.display(), "profile unchanged, skipping write");
            return Ok(());
        }

        let contents =
            serde_yaml::to_string(&profile).map_err(|err| CoreError::Storage(err.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| write_error(parent, &err))?;
        }
        fs::write(&self.path, contents).map_err(|err| write_error(&self.path, &err))?;
        info!(path = %self.path.display(), "profile written");
        Ok(())
    }
}

fn write_error(path: &Path, err: &std::io::Error) -> CoreError {
    if err.kind() == ErrorKind::PermissionDenied {
        CoreError::PermissionDenied(format!("cannot write {}", path.display()))
    } else {
        CoreError::Storage(err.to_string())
    }
}

/// Settings read from the optional config file.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathedConfig {
    /// File that receives log output; logging is off without it.
    pub log_file: Option<String>,
    /// Default log filter, such as `debug` or `pd_core=trace`.
    pub log_level: Option<String>,
    /// Overrides the platform's case sensitivity for duplicate detection.
    pub case_sensitive: Option<bool>,
    /// Directory the browser opens in when adding an entry.
    pub add_start: Option<String>,
}

/// Resolve the config file location, honouring `PATHED_CONFIG`.
pub fn config_path() -> CoreResult<PathBuf> {
    if let Ok(value) = std::env::var("PATHED_CONFIG") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::Storage(
        "unable to determine config directory".into(),
    ))
}

/// Load the config from its resolved location.
pub fn load_config() -> CoreResult<PathedConfig> {
    load_config_from(&config_path()?)
}

/// Load the config at `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> CoreResult<PathedConfig> {
    if !path.exists() {
        return Ok(PathedConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| CoreError::Storage(err.to_string()))?;
    if contents.trim().is_empty() {
        return Ok(PathedConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|err| CoreError::Storage(err.to_string()))
}
