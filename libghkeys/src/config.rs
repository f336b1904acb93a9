// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.
use crate::error::Error;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_GHKEYS_INIT_LOG_PATH: &str = "/var/log/ghkeys-init.log";

/// Prefix for environment variable overrides, e.g.
/// `GHKEYS_INIT_GITHUB__BASE_URL`.
const ENV_PREFIX: &str = "GHKEYS_INIT_";

#[derive(Default, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum UserProvisioner {
    #[default]
    Useradd,
    #[cfg(test)]
    FakeUseradd,
    #[cfg(test)]
    FailingUseradd,
}

/// Whether one user's failure stops the rest of the batch.
#[derive(Default, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Continue,
    Abort,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Github {
    pub base_url: String,
    pub request_timeout_secs: f64,
}

impl Default for Github {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            request_timeout_secs: 30.0,
        }
    }
}

impl Github {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProvisioners {
    pub backends: Vec<UserProvisioner>,
}

impl Default for UserProvisioners {
    fn default() -> Self {
        Self {
            backends: vec![UserProvisioner::default()],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub create_home: bool,
    pub groups: Vec<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            create_home: true,
            groups: vec![],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ssh {
    pub home_base: PathBuf,
}

impl Default for Ssh {
    fn default() -> Self {
        Self {
            home_base: PathBuf::from("/home"),
        }
    }
}

#[derive(Default, Serialize, Deserialize, Debug, Clone)]
pub struct Provisioning {
    pub failure_policy: FailurePolicy,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Log {
    pub path: PathBuf,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_GHKEYS_INIT_LOG_PATH),
        }
    }
}

#[derive(Default, Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub github: Github,
    pub user_provisioners: UserProvisioners,
    pub user: User,
    pub ssh: Ssh,
    pub provisioning: Provisioning,
    pub log: Log,
}

impl Config {
    /// Load the configuration, layering (from lowest to highest priority)
    /// the built-in defaults, the given file or directory, and
    /// `GHKEYS_INIT_*` environment variables.
    ///
    /// If `path` is a directory, `ghkeys-init.toml` is loaded first, followed
    /// by every `*.toml` file in `ghkeys-init.d/` in lexical order.
    #[instrument(skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Config, Error> {
        let mut figment =
            Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = path {
            for file in Self::config_files(path)? {
                tracing::info!(
                    target: "libghkeys::config::load",
                    "Loading configuration from {}",
                    file.display()
                );
                figment = figment.merge(Toml::file_exact(file));
            }
        }

        // GHKEYS_INIT_LOG and GHKEYS_INIT_CONFIG belong to the binary.
        let config = figment
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["log", "config"])
                    .split("__"),
            )
            .extract()?;

        tracing::info!(
            target: "libghkeys::config::success",
            "Configuration loaded"
        );

        Ok(config)
    }

    fn config_files(path: &Path) -> Result<Vec<PathBuf>, Error> {
        if !path.is_dir() {
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = vec![];
        let base_config_path = path.join("ghkeys-init.toml");
        if base_config_path.exists() {
            files.push(base_config_path);
        }

        let d_dir = path.join("ghkeys-init.d");
        if d_dir.is_dir() {
            let mut toml_files: Vec<_> = fs::read_dir(d_dir)?
                .filter_map(|entry| {
                    let path = entry.ok()?.path();
                    if path.extension()?.to_str()? == "toml" {
                        Some(path)
                    } else {
                        None
                    }
                })
                .collect();

            toml_files.sort();
            files.extend(toml_files);
        }

        Ok(files)
    }
}
