//! META-INF/MANIFEST.MF の生成

/// 1 行の最大バイト数（改行を含まない）
const MAX_LINE_BYTES: usize = 72;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// マニフェストのメイン属性
///
/// 属性は挿入順に出力される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            attributes: vec![("Manifest-Version".to_string(), "1.0".to_string())],
        }
    }
}

impl Manifest {
    /// 実行可能アーカイブ用のマニフェスト
    pub fn for_application(main_class: Option<&str>) -> Self {
        let mut manifest = Self::default();
        if let Some(main_class) = main_class {
            manifest.insert("Main-Class", main_class);
        }
        manifest.insert(
            "Created-By",
            format!("jarflow {}", env!("CARGO_PKG_VERSION")),
        );
        manifest
    }

    /// 属性を設定（既存の値は置き換え）
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// JAR 仕様の形式で出力
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.attributes {
            out.push_str(&wrap_line(&format!("{}: {}", name, value)));
        }
        out.push_str("\r\n");
        out
    }
}

/// 72 バイトを超える行を継続行（先頭に空白 1 つ）に分割
fn wrap_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut rest = line;
    let mut limit = MAX_LINE_BYTES;

    while rest.len() > limit {
        let mut split = limit;
        // マルチバイト文字の途中では切らない
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&rest[..split]);
        out.push_str("\r\n ");
        rest = &rest[split..];
        limit = MAX_LINE_BYTES - 1;
    }

    out.push_str(rest);
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_manifest() {
        let manifest = Manifest::for_application(Some("org.example.Main"));
        let rendered = manifest.render();

        assert!(rendered.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(rendered.contains("Main-Class: org.example.Main\r\n"));
        assert!(rendered.contains("Created-By: jarflow "));
        assert!(rendered.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_manifest_without_main_class() {
        let manifest = Manifest::for_application(None);
        assert_eq!(manifest.get("Main-Class"), None);
        assert_eq!(manifest.get("Manifest-Version"), Some("1.0"));
    }

    #[test]
    fn test_insert_replaces() {
        let mut manifest = Manifest::default();
        manifest.insert("Manifest-Version", "2.0");
        assert_eq!(manifest.get("Manifest-Version"), Some("2.0"));
        assert_eq!(manifest.render(), "Manifest-Version: 2.0\r\n\r\n");
    }

    #[test]
    fn test_long_lines_are_wrapped() {
        let main_class = format!("org.eclipse.edc.{}", "a".repeat(120));
        let manifest = Manifest::for_application(Some(&main_class));
        let rendered = manifest.render();

        for line in rendered.split("\r\n") {
            assert!(line.len() <= 72, "line too long: {line:?}");
        }

        // 継続行を結合すると元の値に戻る
        let joined = rendered.replace("\r\n ", "");
        assert!(joined.contains(&format!("Main-Class: {}\r\n", main_class)));
    }

    #[test]
    fn test_wrap_respects_char_boundary() {
        let line = format!("X-Title: {}", "日本語".repeat(20));
        let wrapped = wrap_line(&line);
        assert_eq!(wrapped.replace("\r\n ", "").trim_end(), line);
    }
}
