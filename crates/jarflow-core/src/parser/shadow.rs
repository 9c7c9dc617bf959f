//! application / shadow / distribution ブロックのパース

use super::{first_string, string_args};
use crate::error::{ProjectError, Result};
use crate::model::{ApplicationConfig, DistributionConfig, DistributionFormat, ShadowConfig};
use kdl::KdlNode;
use std::path::PathBuf;

pub fn parse_application(node: &KdlNode) -> ApplicationConfig {
    let mut application = ApplicationConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "main-class" | "main_class" => {
                    application.main_class = first_string(child);
                }
                "output" | "outputs" => {
                    application
                        .outputs
                        .extend(string_args(child).into_iter().map(PathBuf::from));
                }
                _ => {}
            }
        }
    }

    application
}

pub fn parse_shadow(node: &KdlNode) -> Result<ShadowConfig> {
    let mut shadow = ShadowConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "archive-name" | "archive_name" => {
                    shadow.archive_name = first_string(child);
                }
                "merge-service-files" | "merge_service_files" => {
                    // 引数なしは #true 扱い
                    shadow.merge_service_files = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_bool())
                        .unwrap_or(true);
                }
                "merge" => {
                    let patterns = string_args(child);
                    validate_patterns(&patterns)?;
                    shadow.merge.extend(patterns);
                }
                "exclude" => {
                    let patterns = string_args(child);
                    validate_patterns(&patterns)?;
                    shadow.exclude.extend(patterns);
                }
                "depends-on" | "depends_on" => {
                    shadow
                        .depends_on
                        .get_or_insert_with(Vec::new)
                        .extend(string_args(child));
                }
                _ => {}
            }
        }
    }

    if let Some(name) = &shadow.archive_name
        && (name.contains('/') || name.contains('\\') || name.is_empty())
    {
        return Err(ProjectError::InvalidConfig(format!(
            "archive-name はファイル名で指定してください: '{}'",
            name
        )));
    }

    Ok(shadow)
}

pub fn parse_distribution(node: &KdlNode) -> Result<DistributionConfig> {
    let mut distribution = DistributionConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == "formats" {
                let mut formats = Vec::new();
                for value in string_args(child) {
                    let format = DistributionFormat::parse(&value).ok_or_else(|| {
                        ProjectError::InvalidConfig(format!(
                            "不明な配布形式: {} (tar, zip のいずれか)",
                            value
                        ))
                    })?;
                    if !formats.contains(&format) {
                        formats.push(format);
                    }
                }
                distribution.formats = formats;
            }
        }
    }

    Ok(distribution)
}

fn validate_patterns(patterns: &[String]) -> Result<()> {
    for pattern in patterns {
        glob::Pattern::new(pattern).map_err(|e| {
            ProjectError::InvalidConfig(format!("無効な glob パターン '{}': {}", pattern, e))
        })?;
    }
    Ok(())
}
