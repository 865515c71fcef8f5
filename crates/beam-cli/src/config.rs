// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use fs_err as fs;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

const EXTENSION: &str = "yaml";

pub trait Config: DeserializeOwned {
    fn domain() -> String;

    fn merge(self, other: Self) -> Self;
}

#[derive(Debug, Clone)]
pub struct Manager {
    dir: PathBuf,
}

impl Manager {
    /// Config is loaded from $XDG_CONFIG_HOME/{program}
    pub fn user(program: impl ToString) -> Result<Self, CreateUserError> {
        Ok(Self {
            dir: dirs::config_dir().ok_or(CreateUserError)?.join(program.to_string()),
        })
    }

    /// Config is loaded from `path`
    pub fn custom(path: impl Into<PathBuf>) -> Self {
        Self { dir: path.into() }
    }

    /// Load `{domain}.yaml` followed by every file in `{domain}.d/`, in
    /// name order, each overriding what came before
    pub fn load<T: Config>(&self) -> Option<T> {
        let domain = T::domain();

        let file = self.dir.join(format!("{domain}.{EXTENSION}"));
        let mut paths = vec![];

        if file.exists() {
            paths.push(file);
        }
        paths.extend(enumerate_dir(&self.dir.join(format!("{domain}.d"))));

        paths.into_iter().filter_map(read_config).reduce(T::merge)
    }
}

#[derive(Debug, Error)]
#[error("$HOME or $XDG_CONFIG_HOME env not set")]
pub struct CreateUserError;

fn enumerate_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return vec![];
    };

    let mut paths = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();

            (path.is_file() && extension == EXTENSION).then_some(path)
        })
        .collect::<Vec<_>>();

    paths.sort();
    paths
}

fn read_config<T: Config>(path: PathBuf) -> Option<T> {
    let bytes = fs::read(&path)
        .map_err(|error| warn!("Skipping config: {error}"))
        .ok()?;

    match serde_yaml::from_slice(&bytes) {
        Ok(config) => {
            debug!("Loaded config {path:?}");
            Some(config)
        }
        Err(error) => {
            warn!("Skipping malformed config {path:?}: {error}");
            None
        }
    }
}

/// Settings for the `beam` tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Recorded in the metadata of packed files
    pub host_version: Option<String>,
    /// Allow replacing existing output files
    pub overwrite: Option<bool>,
}

impl Settings {
    pub fn host_version(&self) -> &str {
        self.host_version.as_deref().unwrap_or(env!("CARGO_PKG_VERSION"))
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite.unwrap_or_default()
    }
}

impl Config for Settings {
    fn domain() -> String {
        "beam".into()
    }

    fn merge(self, other: Self) -> Self {
        Self {
            host_version: other.host_version.or(self.host_version),
            overwrite: other.overwrite.or(self.overwrite),
        }
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    fn scratch_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("beam.d")).unwrap();
        dir
    }

    #[test]
    fn merge_order() {
        let dir = scratch_dir();
        let root = dir.path();
        fs::write(root.join("beam.yaml"), "host-version: 1.0.0\noverwrite: true\n").unwrap();
        fs::write(root.join("beam.d/20-version.yaml"), "host-version: 3.0.0\n").unwrap();
        fs::write(root.join("beam.d/10-version.yaml"), "host-version: 2.0.0\n").unwrap();
        fs::write(root.join("beam.d/ignored.txt"), "host-version: 9.9.9\n").unwrap();

        let settings = Manager::custom(root).load::<Settings>().unwrap();
        assert_eq!(settings.host_version(), "3.0.0");
        assert!(settings.overwrite());
    }

    #[test]
    fn malformed_files_are_skipped() {
        let dir = scratch_dir();
        let root = dir.path();
        fs::write(root.join("beam.yaml"), "overwrite: [not, a, bool]\n").unwrap();
        fs::write(root.join("beam.d/local.yaml"), "host-version: 2.1.0\n").unwrap();

        let settings = Manager::custom(root).load::<Settings>().unwrap();
        assert_eq!(settings.host_version(), "2.1.0");
        assert!(!settings.overwrite());
    }

    #[test]
    fn defaults_without_files() {
        let dir = scratch_dir();

        assert_eq!(Manager::custom(dir.path()).load::<Settings>(), None);
        assert_eq!(Settings::default().host_version(), env!("CARGO_PKG_VERSION"));
    }
}
