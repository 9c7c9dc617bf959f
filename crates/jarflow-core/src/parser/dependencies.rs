//! dependencies ブロックのパース

use super::string_args;
use crate::error::{ProjectError, Result};
use crate::model::{DependencyDeclaration, DependencyNotation, Scope};
use kdl::KdlNode;

/// dependencies ノードをパース
///
/// ```kdl
/// dependencies {
///     runtime-only "libs.edc.bom.controlplane" "org.eclipse.edc:iam-mock:0.7.0"
///     implementation "libs.edc.spi.boot"
/// }
/// ```
pub fn parse_dependencies(node: &KdlNode) -> Result<Vec<DependencyDeclaration>> {
    let mut declarations = Vec::new();

    let Some(children) = node.children() else {
        return Ok(declarations);
    };

    for child in children.nodes() {
        let scope_name = child.name().value();
        let scope = Scope::parse(scope_name).ok_or_else(|| {
            ProjectError::InvalidConfig(format!(
                "不明な依存スコープ: {} (implementation, runtime-only, compile-only のいずれか)",
                scope_name
            ))
        })?;

        let notations = string_args(child);
        if notations.is_empty() {
            return Err(ProjectError::InvalidConfig(format!(
                "{} に依存が指定されていません",
                scope_name
            )));
        }

        for notation in notations {
            declarations.push(DependencyDeclaration {
                notation: DependencyNotation::parse(&notation)?,
                scope,
            });
        }
    }

    Ok(declarations)
}
