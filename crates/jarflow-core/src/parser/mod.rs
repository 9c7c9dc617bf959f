//! KDLパーサー
//!
//! jarflow.kdl をパースして Project を生成します。
//! ブロックごとのパース処理はモジュールに分離されています。

mod dependencies;
mod docker;
mod shadow;

use dependencies::parse_dependencies;
use docker::parse_docker;
use shadow::{parse_application, parse_distribution, parse_shadow};

use crate::error::{ProjectError, Result};
use crate::model::{Project, Repository};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};

/// Maven Central の URL（`maven-central` ノード用）
pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2";

/// KDLファイルをパースしてProjectを生成
///
/// プロジェクトルートはファイルの置かれたディレクトリ。
/// `.jarflow/jarflow.kdl` の場合はその親ディレクトリ。
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Project> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if root.file_name().and_then(|n| n.to_str()) == Some(".jarflow")
        && let Some(parent) = root.parent()
    {
        root = parent.to_path_buf();
    }

    parse_kdl_string(&content, root)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str, root: PathBuf) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;

    let project_node = doc
        .nodes()
        .iter()
        .find(|n| n.name().value() == "project")
        .ok_or_else(|| ProjectError::InvalidConfig("project ノードが必要です".to_string()))?;
    let (name, version) = parse_project_node(project_node)?;
    let mut project = Project::new(name, version, root);

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {}
            "catalog" => {
                project.catalog = first_string(node).map(PathBuf::from);
            }
            "variables" => {
                if let Some(vars) = node.children() {
                    for var in vars.nodes() {
                        let key = var.name().value().to_string();
                        let value = first_string(var).unwrap_or_default();
                        project.variables.insert(key, value);
                    }
                }
            }
            "repositories" => {
                project.repositories = parse_repositories(node)?;
            }
            "dependencies" => {
                project.dependencies.extend(parse_dependencies(node)?);
            }
            "application" => {
                project.application = parse_application(node);
            }
            "shadow" => {
                project.shadow = parse_shadow(node)?;
            }
            "distribution" => {
                project.distribution = parse_distribution(node)?;
            }
            "docker" => {
                project.docker = parse_docker(node)?;
            }
            other => {
                tracing::warn!(node = other, "Unknown top-level node in jarflow.kdl, skipping");
            }
        }
    }

    Ok(project)
}

/// `project "name" version="x"` または `project "name" "x"`
fn parse_project_node(node: &KdlNode) -> Result<(String, String)> {
    let args = string_args(node);
    let name = args
        .first()
        .cloned()
        .ok_or_else(|| ProjectError::InvalidConfig("project requires a name".to_string()))?;

    let version = node
        .get("version")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .or_else(|| args.get(1).cloned())
        .or_else(|| {
            node.children()
                .and_then(|c| c.nodes().iter().find(|n| n.name().value() == "version"))
                .and_then(first_string)
        })
        .ok_or_else(|| {
            ProjectError::InvalidConfig(format!("project '{}' に version が必要です", name))
        })?;

    Ok((name, version))
}

fn parse_repositories(node: &KdlNode) -> Result<Vec<Repository>> {
    let mut repositories = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "local" => {
                    let path = first_string(child).ok_or_else(|| {
                        ProjectError::InvalidConfig("local にはパスが必要です".to_string())
                    })?;
                    repositories.push(Repository::Local(PathBuf::from(path)));
                }
                "maven" => {
                    let url = first_string(child).ok_or_else(|| {
                        ProjectError::InvalidConfig("maven には URL が必要です".to_string())
                    })?;
                    repositories.push(Repository::Maven(url.trim_end_matches('/').to_string()));
                }
                "maven-central" => {
                    repositories.push(Repository::Maven(MAVEN_CENTRAL.to_string()));
                }
                other => {
                    return Err(ProjectError::InvalidConfig(format!(
                        "不明なリポジトリ種別: {}",
                        other
                    )));
                }
            }
        }
    }

    Ok(repositories)
}

/// 最初の位置引数（文字列）
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 全ての位置引数（文字列）
pub(crate) fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests;
