//! 依存座標 (group:name:version)

use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// アーティファクトを一意に特定する座標
///
/// 文字列表現は `group:name:version[:classifier]`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            classifier: None,
        }
    }

    /// "group:name" 形式のモジュール名
    pub fn module(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }

    /// jar ファイル名
    ///
    /// # Examples
    /// - `org.eclipse.edc:boot:0.7.0` -> `boot-0.7.0.jar`
    /// - `io.netty:netty-transport-native-epoll:4.1.0:linux-x86_64`
    ///   -> `netty-transport-native-epoll-4.1.0-linux-x86_64.jar`
    pub fn jar_file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}-{}.jar", self.name, self.version, classifier),
            None => format!("{}-{}.jar", self.name, self.version),
        }
    }

    /// Maven レイアウトでのリポジトリ内相対パス
    pub fn repository_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.group.split('.') {
            path.push(segment);
        }
        path.push(&self.name);
        path.push(&self.version);
        path.push(self.jar_file_name());
        path
    }

    /// リモートリポジトリ URL 用のパス（区切りは常に `/`）
    pub fn repository_url_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.name,
            self.version,
            self.jar_file_name()
        )
    }
}

impl FromStr for Coordinate {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if !(3..=4).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(ProjectError::InvalidCoordinate(s.to_string()));
        }

        Ok(Self {
            group: parts[0].trim().to_string(),
            name: parts[1].trim().to_string(),
            version: parts[2].trim().to_string(),
            classifier: parts.get(3).map(|c| c.trim().to_string()),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}
