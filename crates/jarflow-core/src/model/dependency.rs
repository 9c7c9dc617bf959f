//! 依存宣言とクラスパス

use super::coordinate::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 依存のスコープ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// コンパイル時と実行時の両方
    Implementation,
    /// 実行時のみ（コンパイルクラスパスには載せない）
    RuntimeOnly,
    /// コンパイル時のみ（アーカイブには含めない）
    CompileOnly,
}

impl Scope {
    /// KDL ノード名からパース
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "implementation" => Some(Self::Implementation),
            "runtime-only" | "runtime_only" | "runtimeOnly" => Some(Self::RuntimeOnly),
            "compile-only" | "compile_only" | "compileOnly" => Some(Self::CompileOnly),
            _ => None,
        }
    }

    pub fn on_compile_classpath(&self) -> bool {
        matches!(self, Self::Implementation | Self::CompileOnly)
    }

    pub fn on_runtime_classpath(&self) -> bool {
        matches!(self, Self::Implementation | Self::RuntimeOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::RuntimeOnly => "runtime-only",
            Self::CompileOnly => "compile-only",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 依存の記法
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyNotation {
    /// バージョンカタログのエイリアス（例: `libs.edc.spi.boot`）
    Alias(String),
    /// 直接指定された座標
    Coordinate(Coordinate),
}

impl DependencyNotation {
    /// 文字列から記法を判定
    ///
    /// `:` を含めば座標、含まなければカタログのエイリアスとして扱う
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        if s.contains(':') {
            Ok(Self::Coordinate(s.parse()?))
        } else {
            Ok(Self::Alias(s.trim().to_string()))
        }
    }
}

impl fmt::Display for DependencyNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias(alias) => f.write_str(alias),
            Self::Coordinate(coord) => write!(f, "{}", coord),
        }
    }
}

/// 依存宣言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub notation: DependencyNotation,
    pub scope: Scope,
}

/// 座標まで解決された依存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub coordinate: Coordinate,
    pub scope: Scope,
    /// カタログ経由で解決された場合のエイリアス
    #[serde(default)]
    pub alias: Option<String>,
}

/// 宣言順に並んだ解決済み依存の集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classpath {
    entries: Vec<ResolvedDependency>,
}

impl Classpath {
    /// 同じ座標が複数回宣言された場合は最初の宣言のみ残す
    pub fn new(dependencies: Vec<ResolvedDependency>) -> Self {
        let mut entries: Vec<ResolvedDependency> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if let Some(existing) = entries.iter_mut().find(|e| e.coordinate == dep.coordinate) {
                // runtime-only と compile-only が重なれば implementation と同等
                if existing.scope != dep.scope {
                    existing.scope = Scope::Implementation;
                }
                continue;
            }
            entries.push(dep);
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[ResolvedDependency] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// コンパイルクラスパス
    pub fn compile(&self) -> Vec<&ResolvedDependency> {
        self.entries
            .iter()
            .filter(|d| d.scope.on_compile_classpath())
            .collect()
    }

    /// ランタイムクラスパス（アーカイブに含まれる依存）
    pub fn runtime(&self) -> Vec<&ResolvedDependency> {
        self.entries
            .iter()
            .filter(|d| d.scope.on_runtime_classpath())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(coord: &str, scope: Scope) -> ResolvedDependency {
        ResolvedDependency {
            coordinate: coord.parse().unwrap(),
            scope,
            alias: None,
        }
    }

    #[test]
    fn test_runtime_only_does_not_leak_to_compile_classpath() {
        let classpath = Classpath::new(vec![
            dep("org.eclipse.edc:controlplane-base-bom:0.7.0", Scope::RuntimeOnly),
            dep("org.eclipse.edc:boot-spi:0.7.0", Scope::Implementation),
            dep("org.projectlombok:lombok:1.18.30", Scope::CompileOnly),
        ]);

        let compile: Vec<String> = classpath
            .compile()
            .iter()
            .map(|d| d.coordinate.name.clone())
            .collect();
        assert_eq!(compile, vec!["boot-spi", "lombok"]);

        let runtime: Vec<String> = classpath
            .runtime()
            .iter()
            .map(|d| d.coordinate.name.clone())
            .collect();
        assert_eq!(runtime, vec!["controlplane-base-bom", "boot-spi"]);
    }

    #[test]
    fn test_duplicate_declaration_keeps_first_position() {
        let classpath = Classpath::new(vec![
            dep("g:a:1", Scope::RuntimeOnly),
            dep("g:b:1", Scope::Implementation),
            dep("g:a:1", Scope::CompileOnly),
        ]);

        assert_eq!(classpath.entries().len(), 2);
        assert_eq!(classpath.entries()[0].coordinate.name, "a");
        assert_eq!(classpath.entries()[0].scope, Scope::Implementation);
    }

    #[test]
    fn test_notation_parse() {
        assert_eq!(
            DependencyNotation::parse("libs.edc.spi.boot").unwrap(),
            DependencyNotation::Alias("libs.edc.spi.boot".to_string())
        );
        assert!(matches!(
            DependencyNotation::parse("g:a:1").unwrap(),
            DependencyNotation::Coordinate(_)
        ));
        assert!(DependencyNotation::parse("g:a").is_err());
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(Scope::parse("runtime-only"), Some(Scope::RuntimeOnly));
        assert_eq!(Scope::parse("runtimeOnly"), Some(Scope::RuntimeOnly));
        assert_eq!(Scope::parse("implementation"), Some(Scope::Implementation));
        assert_eq!(Scope::parse("api"), None);
    }
}
