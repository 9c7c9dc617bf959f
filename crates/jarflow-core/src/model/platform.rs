//! ターゲットプラットフォームとビルドコンテキスト

use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// `os/arch[/variant]` 形式のプラットフォーム指定
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn os(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    pub fn arch(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }
}

impl FromStr for Platform {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('/').collect();
        let valid_part = |p: &&str| {
            !p.is_empty()
                && p.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };

        if !(2..=3).contains(&parts.len()) || !parts.iter().all(valid_part) {
            return Err(ProjectError::InvalidPlatform(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Platform {
    type Error = ProjectError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.0
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// イメージビルドのコンテキスト
///
/// タスク起動時に確定し、ビルド中は読み取り専用。
/// `platform` が None の場合はビルダーのデフォルト（ホストのプラットフォーム）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub directory: PathBuf,
    pub platform: Option<Platform>,
}

impl BuildContext {
    pub fn new(directory: PathBuf, platform: Option<Platform>) -> Self {
        Self {
            directory,
            platform,
        }
    }

    pub fn uses_host_platform(&self) -> bool {
        self.platform.is_none()
    }
}
