use chatrelay_ai::llm::DEFAULT_GEMINI_MODEL;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub gemini: GeminiConfig,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    gemini: GeminiSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    static_dir: Option<PathBuf>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default)]
    base_url: Option<String>,
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

impl ServerConfig {
    /// Load from the optional config file, then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let file_config = load_from_file()?.unwrap_or_default();
        Ok(Self::from_sources(file_config, |key| env::var(key).ok()))
    }

    fn from_sources(file_config: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = lookup("HOST").unwrap_or(file_config.server.host);
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(file_config.server.port);
        let static_dir = lookup("CHATRELAY_STATIC_DIR")
            .map(PathBuf::from)
            .or(file_config.server.static_dir);

        let api_key = lookup("GEMINI_API_KEY").or(file_config.gemini.api_key);
        let model = lookup("GEMINI_MODEL").unwrap_or(file_config.gemini.model);
        let base_url = lookup("GEMINI_BASE_URL").or(file_config.gemini.base_url);

        Self {
            host,
            port,
            static_dir,
            gemini: GeminiConfig {
                api_key,
                model,
                base_url,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("CHATRELAY_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("chatrelay.toml").exists() {
        Some("chatrelay.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    parse_file(Path::new(&path)).map(Some)
}

fn parse_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = ServerConfig::from_sources(FileConfig::default(), env_of(&[]));

        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.gemini.model, "gemini-pro");
        assert!(config.gemini.api_key.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 8081\nstatic_dir = \"web\"\n\n[gemini]\napi_key = \"file-key\"\nmodel = \"gemini-1.5-flash\""
        )
        .unwrap();
        let file_config = parse_file(file.path()).unwrap();

        let config = ServerConfig::from_sources(
            file_config,
            env_of(&[("GEMINI_API_KEY", "env-key"), ("PORT", "9000")]),
        );

        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn blank_or_invalid_env_values_are_ignored() {
        let config = ServerConfig::from_sources(
            FileConfig::default(),
            env_of(&[("GEMINI_API_KEY", "  "), ("PORT", "not-a-port"), ("GEMINI_MODEL", "")]),
        );

        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.port, 5000);
        assert_eq!(config.gemini.model, "gemini-pro");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        let err = parse_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = ServerConfig::from_sources(
            FileConfig::default(),
            env_of(&[("GEMINI_API_KEY", "secret-key")]),
        );

        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
