//! 依存宣言を座標に解決してクラスパスを組み立てる

use crate::catalog::VersionCatalog;
use crate::error::{ProjectError, Result};
use crate::model::{Classpath, DependencyDeclaration, DependencyNotation, ResolvedDependency};

/// 宣言を座標まで解決
///
/// エイリアスはカタログから引く。一つでも解決できなければ全体をエラーにする。
pub fn resolve_declarations(
    declarations: &[DependencyDeclaration],
    catalog: Option<&VersionCatalog>,
) -> Result<Classpath> {
    let mut resolved = Vec::with_capacity(declarations.len());

    for declaration in declarations {
        let dependency = match &declaration.notation {
            DependencyNotation::Coordinate(coordinate) => ResolvedDependency {
                coordinate: coordinate.clone(),
                scope: declaration.scope,
                alias: None,
            },
            DependencyNotation::Alias(alias) => {
                let catalog =
                    catalog.ok_or_else(|| ProjectError::CatalogMissing(alias.clone()))?;
                ResolvedDependency {
                    coordinate: catalog.resolve(alias)?.clone(),
                    scope: declaration.scope,
                    alias: Some(alias.clone()),
                }
            }
        };
        tracing::debug!(
            coordinate = %dependency.coordinate,
            scope = %dependency.scope,
            "Resolved dependency declaration"
        );
        resolved.push(dependency);
    }

    Ok(Classpath::new(resolved))
}
