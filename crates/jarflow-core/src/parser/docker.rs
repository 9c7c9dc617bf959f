//! docker ブロックのパース

use super::{first_string, string_args};
use crate::error::{ProjectError, Result};
use crate::model::{DockerConfig, Platform};
use kdl::KdlNode;
use std::path::PathBuf;

/// docker ノードをパース
///
/// ```kdl
/// docker {
///     dockerfile "src/main/docker/Dockerfile"
///     context "."
///     image "ghcr.io/acme/control-plane:edge"
///     build-arg "OTEL_VERSION" "1.32.0"
///     build-args {
///         JAVA_OPTS "-Xmx512m"
///     }
///     jar-arg "JAR"
///     platform "linux/amd64"
///     pull #true
/// }
/// ```
pub fn parse_docker(node: &KdlNode) -> Result<DockerConfig> {
    let mut docker = DockerConfig::default();

    let Some(children) = node.children() else {
        return Ok(docker);
    };

    for child in children.nodes() {
        match child.name().value() {
            "dockerfile" => {
                docker.dockerfile = first_string(child).map(PathBuf::from);
            }
            "context" => {
                docker.context = first_string(child).map(PathBuf::from);
            }
            "image" | "images" => {
                docker.images.extend(string_args(child));
            }
            "build-arg" | "build_arg" => {
                let args = string_args(child);
                match args.as_slice() {
                    [key, value] => {
                        docker.build_args.insert(key.clone(), value.clone());
                    }
                    // build-arg "KEY=VALUE"
                    [pair] => {
                        let (key, value) = pair.split_once('=').ok_or_else(|| {
                            ProjectError::InvalidConfig(format!(
                                "build-arg は \"KEY\" \"VALUE\" または \"KEY=VALUE\" で指定してください: {}",
                                pair
                            ))
                        })?;
                        docker
                            .build_args
                            .insert(key.trim().to_string(), value.trim().to_string());
                    }
                    _ => {
                        return Err(ProjectError::InvalidConfig(
                            "build-arg にはキーと値が必要です".to_string(),
                        ));
                    }
                }
            }
            "build-args" | "build_args" => {
                if let Some(args) = child.children() {
                    for arg_node in args.nodes() {
                        let key = arg_node.name().value().to_string();
                        let value = first_string(arg_node).unwrap_or_default();
                        docker.build_args.insert(key, value);
                    }
                }
            }
            "jar-arg" | "jar_arg" => {
                docker.jar_arg = first_string(child);
            }
            "platform" => {
                docker.platform = first_string(child).map(|p| p.parse::<Platform>()).transpose()?;
            }
            "pull" => {
                // 引数なしは #true 扱い
                docker.pull = child
                    .entries()
                    .first()
                    .and_then(|e| e.value().as_bool())
                    .unwrap_or(true);
            }
            _ => {}
        }
    }

    Ok(docker)
}
