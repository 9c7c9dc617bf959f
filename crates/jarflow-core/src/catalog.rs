//! バージョンカタログ
//!
//! Gradle 互換の `libs.versions.toml` を読み込み、シンボリック名から座標を引けるようにします。
//! 読み込み後は不変で、依存解決ステップに明示的に渡されます。

use crate::error::{ProjectError, Result};
use crate::model::Coordinate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// TOML ファイルの構造
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    versions: BTreeMap<String, VersionSpec>,
    #[serde(default)]
    libraries: BTreeMap<String, LibrarySpec>,
}

/// `[versions]` の値
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionSpec {
    Plain(String),
    Rich(RichVersion),
}

/// `{ strictly = "..", require = "..", prefer = ".." }`
#[derive(Debug, Deserialize)]
struct RichVersion {
    strictly: Option<String>,
    require: Option<String>,
    prefer: Option<String>,
}

impl RichVersion {
    fn pick(&self) -> Option<&str> {
        self.strictly
            .as_deref()
            .or(self.require.as_deref())
            .or(self.prefer.as_deref())
    }
}

impl VersionSpec {
    fn pick(&self) -> Option<&str> {
        match self {
            VersionSpec::Plain(v) => Some(v.as_str()),
            VersionSpec::Rich(rich) => rich.pick(),
        }
    }
}

/// `[libraries]` の値
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibrarySpec {
    /// "group:name:version"
    Notation(String),
    Table(LibraryTable),
}

#[derive(Debug, Deserialize)]
struct LibraryTable {
    module: Option<String>,
    group: Option<String>,
    name: Option<String>,
    version: Option<LibraryVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibraryVersion {
    Literal(String),
    Ref {
        #[serde(rename = "ref")]
        reference: String,
    },
    Rich(RichVersion),
}

/// 解決済みのバージョンカタログ
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    /// 正規化済みエイリアス -> 座標
    libraries: BTreeMap<String, Coordinate>,
    source: Option<PathBuf>,
}

impl VersionCatalog {
    /// TOML ファイルを読み込む
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProjectError::CatalogParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut catalog = Self::parse(&content, path)?;
        catalog.source = Some(path.to_path_buf());
        debug!(libraries = catalog.len(), "Version catalog loaded");
        Ok(catalog)
    }

    /// TOML 文字列をパース（`path` はエラーメッセージ用）
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| ProjectError::CatalogParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut libraries = BTreeMap::new();
        for (alias, spec) in &file.libraries {
            let coordinate = match spec {
                LibrarySpec::Notation(notation) => notation.parse::<Coordinate>()?,
                LibrarySpec::Table(table) => table_to_coordinate(alias, table, &file.versions)?,
            };
            libraries.insert(normalize_alias(alias), coordinate);
        }

        Ok(Self {
            libraries,
            source: None,
        })
    }

    /// エイリアスから座標を引く
    ///
    /// `libs.edc.spi.boot`、`edc-spi-boot`、`edc_spi_boot` はすべて同じエントリを指す。
    pub fn resolve(&self, alias: &str) -> Result<&Coordinate> {
        self.libraries
            .get(&normalize_alias(alias))
            .ok_or_else(|| ProjectError::UnknownAlias(alias.to_string()))
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn table_to_coordinate(
    alias: &str,
    table: &LibraryTable,
    versions: &BTreeMap<String, VersionSpec>,
) -> Result<Coordinate> {
    let (group, name) = match (&table.module, &table.group, &table.name) {
        (Some(module), _, _) => module
            .split_once(':')
            .map(|(g, n)| (g.to_string(), n.to_string()))
            .ok_or_else(|| ProjectError::InvalidCoordinate(module.clone()))?,
        (None, Some(group), Some(name)) => (group.clone(), name.clone()),
        _ => {
            return Err(ProjectError::InvalidConfig(format!(
                "ライブラリ '{}' には module または group/name が必要です",
                alias
            )));
        }
    };

    let version = match &table.version {
        Some(LibraryVersion::Literal(v)) => v.clone(),
        Some(LibraryVersion::Ref { reference }) => versions
            .get(reference)
            .and_then(|spec| spec.pick())
            .map(|v| v.to_string())
            .ok_or_else(|| ProjectError::UnresolvedVersionRef {
                alias: alias.to_string(),
                reference: reference.clone(),
            })?,
        Some(LibraryVersion::Rich(rich)) => rich
            .pick()
            .map(|v| v.to_string())
            .ok_or_else(|| {
                ProjectError::InvalidConfig(format!("ライブラリ '{}' のバージョンが空です", alias))
            })?,
        None => {
            return Err(ProjectError::InvalidConfig(format!(
                "ライブラリ '{}' にバージョンが指定されていません",
                alias
            )));
        }
    };

    Ok(Coordinate::new(group, name, version))
}

/// エイリアスを正規化
///
/// `-` `_` `.` は同じ区切りとして扱い、先頭の `libs.` は取り除く。
pub fn normalize_alias(alias: &str) -> String {
    let normalized: String = alias
        .trim()
        .chars()
        .map(|c| match c {
            '-' | '_' => '.',
            c => c.to_ascii_lowercase(),
        })
        .collect();

    normalized
        .strip_prefix("libs.")
        .map(|s| s.to_string())
        .unwrap_or(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[versions]
edc = "0.7.0"
rich = { strictly = "2.0.0" }

[libraries]
edc-bom-controlplane = { module = "org.eclipse.edc:controlplane-base-bom", version.ref = "edc" }
edc-spi-boot = { group = "org.eclipse.edc", name = "boot-spi", version.ref = "edc" }
edc-iam-mock = "org.eclipse.edc:iam-mock:0.7.0"
strict-lib = { module = "com.example:strict", version.ref = "rich" }
literal-lib = { module = "com.example:literal", version = "1.0.0" }
"#;

    fn catalog() -> VersionCatalog {
        VersionCatalog::parse(CATALOG, Path::new("libs.versions.toml")).unwrap()
    }

    #[test]
    fn test_resolve_version_ref() {
        let catalog = catalog();
        let coord = catalog.resolve("libs.edc.bom.controlplane").unwrap();
        assert_eq!(
            coord.to_string(),
            "org.eclipse.edc:controlplane-base-bom:0.7.0"
        );
    }

    #[test]
    fn test_resolve_group_name_table() {
        let coord = catalog().resolve("edc-spi-boot").unwrap().clone();
        assert_eq!(coord, Coordinate::new("org.eclipse.edc", "boot-spi", "0.7.0"));
    }

    #[test]
    fn test_resolve_string_notation_and_rich_version() {
        let catalog = catalog();
        assert_eq!(catalog.resolve("edc_iam_mock").unwrap().name, "iam-mock");
        assert_eq!(catalog.resolve("strict.lib").unwrap().version, "2.0.0");
        assert_eq!(catalog.resolve("literal-lib").unwrap().version, "1.0.0");
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn test_unknown_alias() {
        let err = catalog().resolve("libs.edc.missing").unwrap_err();
        assert!(matches!(err, ProjectError::UnknownAlias(_)));
    }

    #[test]
    fn test_unresolved_version_ref() {
        let content = r#"
[libraries]
broken = { module = "g:a", version.ref = "nope" }
"#;
        let err = VersionCatalog::parse(content, Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ProjectError::UnresolvedVersionRef { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = VersionCatalog::parse("[libraries\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ProjectError::CatalogParse { .. }));
    }

    #[test]
    fn test_normalize_alias() {
        assert_eq!(normalize_alias("libs.edc.spi.boot"), "edc.spi.boot");
        assert_eq!(normalize_alias("edc-spi_boot"), "edc.spi.boot");
    }
}
