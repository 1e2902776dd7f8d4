use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::providers::{GenerationParams, PromptStyle, ProviderKind};

const DEFAULT_CONFIG_FILE: &str = "eidos.toml";

/**
 * \brief 进程级配置，启动时加载一次，之后只读。
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /** \brief 请求未指定时使用的 Provider。 */
    pub default_provider: String,
    pub research: ResearchConfig,
    pub generation: GenerationParams,
    /** \brief 按 provider id 覆盖端点/模型。 */
    pub providers: HashMap<String, ProviderOverride>,
    pub openrouter: OpenRouterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /** \brief 有凭据时允许 `/research/assistant` 发起一次实时调用。 */
    pub live_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverride {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub prompt_style: Option<PromptStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub referer: String,
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8880".to_string(),
            cors_permissive: true,
        }
    }
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            referer: "http://localhost:8880".to_string(),
            title: "Eidos Research Hub".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            default_provider: ProviderKind::Groq.id().to_string(),
            research: ResearchConfig::default(),
            generation: GenerationParams::default(),
            providers: HashMap::new(),
            openrouter: OpenRouterConfig::default(),
        }
    }
}

impl Config {
    /**
     * \brief 加载配置文件。
     *
     * 显式路径必须存在；否则优先使用工作目录下的 `eidos.toml`，再退回内置默认值。
     */
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(Path::new(p)),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/**
 * \brief 从环境变量读取的 API Key 快照。
 *
 * 所选 Provider 是否有 Key 是实时/演示模式的唯一开关。
 */
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<&'static str, String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /**
     * \brief 通过任意变量查找函数构建快照。
     */
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = HashMap::new();
        for kind in ProviderKind::ALL {
            let found = env_vars_for(kind)
                .iter()
                .filter_map(|var| lookup(var.as_str()))
                .find(|v| !is_placeholder(v));
            if let Some(value) = found {
                keys.insert(kind.id(), value.trim().to_string());
            }
        }
        Self { keys }
    }

    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind.id(), key.into());
        self
    }

    pub fn api_key(&self, provider_id: &str) -> Option<&str> {
        let kind = ProviderKind::from_id(provider_id)?;
        self.keys.get(kind.id()).map(String::as_str)
    }

    pub fn is_configured(&self, provider_id: &str) -> bool {
        self.api_key(provider_id).is_some()
    }

    pub fn any_configured(&self) -> bool {
        !self.keys.is_empty()
    }
}

/**
 * \brief Provider 对应的环境变量，按优先级排列。
 */
pub fn env_vars_for(kind: ProviderKind) -> Vec<String> {
    match kind {
        ProviderKind::Google => vec![
            "GOOGLE_AI_API_KEY".to_string(),
            "GOOGLE_API_KEY".to_string(),
        ],
        other => vec![format!("{}_API_KEY", other.id().to_ascii_uppercase())],
    }
}

fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || (v.starts_with("your_") && v.ends_with("_here"))
}
