//! 統合ローダー
//!
//! jarflow.kdl のパースとバージョンカタログの読み込みをまとめて行います。

use crate::catalog::VersionCatalog;
use crate::classpath::resolve_declarations;
use crate::error::{ProjectError, Result};
use crate::model::{Classpath, Project};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// 読み込み済みのプロジェクト
///
/// カタログは読み込み後に変更されず、解決ステップへ明示的に渡される。
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub project: Project,
    pub catalog: Option<VersionCatalog>,
    /// 読み込んだ jarflow.kdl のパス
    pub source: PathBuf,
}

impl LoadedProject {
    /// 依存宣言を座標まで解決したクラスパス
    pub fn classpath(&self) -> Result<Classpath> {
        resolve_declarations(&self.project.dependencies, self.catalog.as_ref())
    }
}

/// jarflow.kdl とそこから参照されるカタログを読み込む
#[instrument]
pub fn load_project(path: &Path) -> Result<LoadedProject> {
    if !path.exists() {
        return Err(ProjectError::IoError {
            path: path.to_path_buf(),
            message: "ファイルが存在しません".to_string(),
        });
    }

    debug!("Parsing project file");
    let project = crate::parser::parse_kdl_file(path)?;

    let catalog = match project.catalog_path() {
        Some(catalog_path) => {
            debug!(catalog = %catalog_path.display(), "Loading version catalog");
            Some(VersionCatalog::load(&catalog_path)?)
        }
        None => None,
    };

    info!(
        project = %project.name,
        version = %project.version,
        dependencies = project.dependencies.len(),
        "Project loaded"
    );

    Ok(LoadedProject {
        project,
        catalog,
        source: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_project_with_catalog() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("gradle")).unwrap();
        fs::write(
            temp_dir.path().join("gradle/libs.versions.toml"),
            r#"
[versions]
edc = "0.7.0"

[libraries]
edc-spi-boot = { module = "org.eclipse.edc:boot-spi", version.ref = "edc" }
"#,
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("jarflow.kdl"),
            r#"
project "control-plane" version="1.2.3"
catalog "gradle/libs.versions.toml"
dependencies {
    implementation "libs.edc.spi.boot"
}
"#,
        )
        .unwrap();

        let loaded = load_project(&temp_dir.path().join("jarflow.kdl")).unwrap();
        assert_eq!(loaded.catalog.as_ref().unwrap().len(), 1);

        let classpath = loaded.classpath().unwrap();
        assert_eq!(
            classpath.entries()[0].coordinate.to_string(),
            "org.eclipse.edc:boot-spi:0.7.0"
        );
    }

    #[test]
    fn test_load_project_missing_catalog_file() {
        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("jarflow.kdl"),
            r#"
project "control-plane" version="1.2.3"
catalog "gradle/libs.versions.toml"
"#,
        )
        .unwrap();

        let err = load_project(&temp_dir.path().join("jarflow.kdl")).unwrap_err();
        assert!(matches!(err, ProjectError::CatalogParse { .. }));
    }

    #[test]
    fn test_load_project_missing_file() {
        let temp_dir = tempdir().unwrap();
        let err = load_project(&temp_dir.path().join("jarflow.kdl")).unwrap_err();
        assert!(matches!(err, ProjectError::IoError { .. }));
    }
}
