//! ベースイメージ取得用のレジストリ認証
//!
//! Dockerfile の FROM 行に現れるイメージのレジストリについて、
//! Docker の config.json から認証情報を集める。

use crate::error::{BuildError, BuildResult};
use base64::Engine;
use bollard::auth::DockerCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

const DOCKER_HUB: &str = "docker.io";
const DOCKER_HUB_INDEX: &str = "https://index.docker.io/v1/";

/// Docker config.json のうち認証に関わる部分
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    /// credential helper 名 (例: "osxkeychain", "desktop")
    #[serde(default)]
    creds_store: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64 の "username:password"
    auth: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// レジストリ認証を管理
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    config_path: PathBuf,
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryAuth {
    /// $DOCKER_CONFIG/config.json または ~/.docker/config.json を使う
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self { config_path }
    }

    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Dockerfile のベースイメージに必要な認証情報（レジストリ -> 認証情報）
    ///
    /// 認証情報が見つからないレジストリは含まれない。
    pub fn credentials_for_dockerfile(
        &self,
        dockerfile: &str,
    ) -> BuildResult<HashMap<String, DockerCredentials>> {
        let mut credentials = HashMap::new();
        if !self.config_path.exists() {
            tracing::debug!("Docker config.json not found at {:?}", self.config_path);
            return Ok(credentials);
        }

        let config = self.load_config()?;
        for image in base_images(dockerfile) {
            let mut registry = extract_registry(&image);
            if registry == DOCKER_HUB {
                registry = DOCKER_HUB_INDEX.to_string();
            }
            if credentials.contains_key(&registry) {
                continue;
            }
            if let Some(creds) = self.lookup(&config, &registry)? {
                tracing::debug!(registry = %registry, image = %image, "Using registry credentials");
                credentials.insert(registry, creds);
            }
        }
        Ok(credentials)
    }

    fn lookup(
        &self,
        config: &DockerConfigFile,
        registry: &str,
    ) -> BuildResult<Option<DockerCredentials>> {
        // Docker Hub は config.json 上で URL 形式のキーになっていることが多い
        let keys: Vec<String> = if registry == DOCKER_HUB_INDEX {
            vec![DOCKER_HUB_INDEX.to_string(), DOCKER_HUB.to_string()]
        } else {
            vec![registry.to_string(), format!("https://{}", registry)]
        };

        for key in &keys {
            if let Some(entry) = config.auths.get(key)
                && let Some(auth_b64) = &entry.auth
                && let Some(creds) = decode_auth(auth_b64, key)?
            {
                return Ok(Some(creds));
            }
        }

        if let Some(helper) = &config.creds_store {
            match helper_credentials(helper, registry) {
                Ok(found) => return Ok(found),
                Err(e) => tracing::debug!(helper = %helper, error = %e, "Credential helper failed"),
            }
        }

        Ok(None)
    }

    fn load_config(&self) -> BuildResult<DockerConfigFile> {
        let content =
            std::fs::read_to_string(&self.config_path).map_err(|e| BuildError::AuthFailed {
                registry: self.config_path.display().to_string(),
                message: format!("Failed to read config.json: {}", e),
            })?;

        serde_json::from_str(&content).map_err(|e| BuildError::AuthFailed {
            registry: self.config_path.display().to_string(),
            message: format!("Failed to parse config.json: {}", e),
        })
    }
}

/// Dockerfile の FROM 行からベースイメージを取り出す
///
/// ステージ名（`FROM build AS runtime` の `build` など）と `scratch` は除く。
pub fn base_images(dockerfile: &str) -> Vec<String> {
    let mut stages: Vec<String> = Vec::new();
    let mut images = Vec::new();

    for line in dockerfile.lines() {
        let mut words = line.split_whitespace();
        let Some(instruction) = words.next() else {
            continue;
        };
        if !instruction.eq_ignore_ascii_case("FROM") {
            continue;
        }

        let args: Vec<&str> = words.filter(|w| !w.starts_with("--")).collect();
        let Some(image) = args.first() else {
            continue;
        };
        let alias = match args.as_slice() {
            [_, keyword, alias, ..] if keyword.eq_ignore_ascii_case("AS") => {
                Some(alias.to_lowercase())
            }
            _ => None,
        };

        let image = image.to_string();
        let skip = image.eq_ignore_ascii_case("scratch")
            || stages.contains(&image.to_lowercase())
            || image.contains('$')
            || images.contains(&image);
        if let Some(alias) = alias {
            stages.push(alias);
        }
        if skip {
            continue;
        }
        images.push(image);
    }

    images
}

/// イメージ名からレジストリを抽出
///
/// # Examples
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `eclipse-temurin:17-jre` -> `docker.io`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn extract_registry(image: &str) -> String {
    match image.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            first.to_string()
        }
        _ => DOCKER_HUB.to_string(),
    }
}

fn decode_auth(auth_b64: &str, registry: &str) -> BuildResult<Option<DockerCredentials>> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .map_err(|e| BuildError::AuthFailed {
            registry: registry.to_string(),
            message: format!("Failed to decode auth: {}", e),
        })?;

    let auth_str = String::from_utf8(decoded).map_err(|e| BuildError::AuthFailed {
        registry: registry.to_string(),
        message: format!("Invalid UTF-8 in auth: {}", e),
    })?;

    Ok(auth_str
        .split_once(':')
        .map(|(username, password)| DockerCredentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            serveraddress: Some(registry.to_string()),
            ..Default::default()
        }))
}

/// docker-credential-<helper> から認証情報を取得
fn helper_credentials(helper: &str, registry: &str) -> BuildResult<Option<DockerCredentials>> {
    let helper_cmd = format!("docker-credential-{}", helper);
    let auth_error = |message: String| BuildError::AuthFailed {
        registry: registry.to_string(),
        message,
    };

    let mut child = Command::new(&helper_cmd)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| auth_error(format!("Failed to run {}: {}", helper_cmd, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(registry.as_bytes())
            .map_err(|e| auth_error(format!("Failed to write to {}: {}", helper_cmd, e)))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| auth_error(format!("Credential helper failed: {}", e)))?;

    if !output.status.success() {
        tracing::debug!(
            "Credential helper returned error for {}: {}",
            registry,
            String::from_utf8_lossy(&output.stderr)
        );
        return Ok(None);
    }

    let response: HelperResponse = serde_json::from_slice(&output.stdout)
        .map_err(|e| auth_error(format!("Failed to parse credential helper response: {}", e)))?;

    Ok(Some(DockerCredentials {
        username: Some(response.username),
        password: Some(response.secret),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    }))
}
