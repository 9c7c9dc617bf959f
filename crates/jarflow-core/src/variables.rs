//! `{VAR}` 形式の変数展開

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// テンプレート文字列内の {VAR_NAME} を実際の値に置換
///
/// 優先順位:
/// 1. 渡された変数
/// 2. プロセスの環境変数
///
/// どちらにも無いプレースホルダはそのまま残す。
pub fn expand_variables(template: &str, variables: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            variables
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_else(|| {
                    tracing::debug!(variable = name, "Variable not found, leaving placeholder");
                    caps[0].to_string()
                })
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_variables() {
        let mut variables = HashMap::new();
        variables.insert("NODE_VERSION".to_string(), "20".to_string());
        variables.insert("REGISTRY".to_string(), "ghcr.io/myorg".to_string());

        let result = expand_variables("{REGISTRY}/app:node{NODE_VERSION}", &variables);
        assert_eq!(result, "ghcr.io/myorg/app:node20");
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        let result = expand_variables("{JARFLOW_SURELY_UNDEFINED_VAR}", &HashMap::new());
        assert_eq!(result, "{JARFLOW_SURELY_UNDEFINED_VAR}");
    }

    #[test]
    fn test_non_identifier_braces_are_ignored() {
        let result = expand_variables(r#"{"key": 1}"#, &HashMap::new());
        assert_eq!(result, r#"{"key": 1}"#);
    }
}
