use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{EidosError, Result};
use crate::models::{Message, Role};

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const GOOGLE_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

const DEFAULT_PLACEHOLDER: &str = "No response";
const GEMINI_PLACEHOLDER: &str = "No response from Gemini";

/**
 * \brief 支持的 LLM 后端（封闭集合）。
 *
 * 请求格式与响应解析都由各变体自己负责，模块外不按 provider id 分支。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Groq,
    Google,
    OpenRouter,
}

/**
 * \brief 只接受单段文本的 Provider 如何拼接提示词。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    /** \brief 只发送最后一条用户消息。 */
    #[default]
    LastTurn,
    /** \brief 所有轮次加角色标签，空行连接。 */
    Labeled,
}

/**
 * \brief API Key 的传递位置。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPlacement {
    Header,
    QueryParam(&'static str),
}

/**
 * \brief 转发给各 Provider 的采样参数。
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: Option<f64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
            top_p: None,
        }
    }
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Groq,
        ProviderKind::Google,
        ProviderKind::OpenRouter,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Google => "google",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.id().eq_ignore_ascii_case(id))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "Groq Cloud",
            ProviderKind::Google => "Google AI Studio (Gemini)",
            ProviderKind::OpenRouter => "OpenRouter",
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Groq => GROQ_ENDPOINT,
            ProviderKind::Google => GOOGLE_ENDPOINT,
            ProviderKind::OpenRouter => OPENROUTER_ENDPOINT,
        }
    }

    fn default_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Groq => &["llama3-70b-8192", "mixtral-8x7b-32768"],
            ProviderKind::Google => &["gemini-1.5-flash-latest", "gemini-pro"],
            ProviderKind::OpenRouter => &["openai/gpt-3.5-turbo", "google/palm-2-chat-bison"],
        }
    }

    fn key_placement(&self) -> KeyPlacement {
        match self {
            ProviderKind::Google => KeyPlacement::QueryParam("key"),
            _ => KeyPlacement::Header,
        }
    }

    fn build_headers(&self, api_key: &str, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let KeyPlacement::Header = self.key_placement() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key))?,
            );
        }
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| EidosError::Config(format!("header name {}: {}", name, e)))?;
            headers.insert(name, HeaderValue::from_str(value)?);
        }
        Ok(headers)
    }

    fn build_body(
        &self,
        messages: &[Message],
        model: &str,
        params: &GenerationParams,
        style: PromptStyle,
    ) -> Value {
        match self {
            ProviderKind::Groq | ProviderKind::OpenRouter => {
                let mut body = json!({
                    "model": model,
                    "messages": messages,
                    "temperature": params.temperature,
                    "max_tokens": params.max_tokens,
                    "stream": false
                });
                if let Some(top_p) = params.top_p {
                    body["top_p"] = json!(top_p);
                }
                body
            }
            ProviderKind::Google => {
                let text = match style {
                    PromptStyle::LastTurn => last_turn(messages),
                    PromptStyle::Labeled => labeled_prompt(messages),
                };
                let mut generation = json!({
                    "temperature": params.temperature,
                    "maxOutputTokens": params.max_tokens,
                });
                if let Some(top_p) = params.top_p {
                    generation["topP"] = json!(top_p);
                }
                json!({
                    "contents": [{ "parts": [{ "text": text }] }],
                    "generationConfig": generation
                })
            }
        }
    }

    fn parse_response(&self, v: &Value) -> String {
        let text = match self {
            ProviderKind::Google => extract_gemini_content(v),
            _ => extract_openai_content(v),
        };
        match text {
            Some(t) => t.to_string(),
            None => self.placeholder().to_string(),
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            ProviderKind::Google => GEMINI_PLACEHOLDER,
            _ => DEFAULT_PLACEHOLDER,
        }
    }

    fn parse_tokens(&self, v: &Value) -> Option<u64> {
        match self {
            ProviderKind::Google => v
                .get("usageMetadata")
                .and_then(|u| u.get("totalTokenCount"))
                .and_then(|t| t.as_u64()),
            _ => v
                .get("usage")
                .and_then(|u| u.get("total_tokens"))
                .and_then(|t| t.as_u64()),
        }
    }
}

/**
 * \brief 已注册的后端：端点、模型及请求/响应规则。
 */
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub kind: ProviderKind,
    pub id: &'static str,
    pub display_name: &'static str,
    /** \brief 端点 URL，`{model}` 会被替换。 */
    pub endpoint: String,
    /** \brief 支持的模型，第一个为默认。 */
    pub models: Vec<String>,
    pub key_placement: KeyPlacement,
    pub params: GenerationParams,
    pub prompt_style: PromptStyle,
    extra_headers: Vec<(String, String)>,
}

impl ProviderDescriptor {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            id: kind.id(),
            display_name: kind.display_name(),
            endpoint: kind.default_endpoint().to_string(),
            models: kind.default_models().iter().map(|m| m.to_string()).collect(),
            key_placement: kind.key_placement(),
            params: GenerationParams::default(),
            prompt_style: PromptStyle::default(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /**
     * \brief 把 `model` 移到列表首位，不存在则加入。
     */
    pub fn with_default_model(mut self, model: &str) -> Self {
        self.models.retain(|m| m != model);
        self.models.insert(0, model.to_string());
        self
    }

    pub fn default_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or_default()
    }

    pub fn endpoint_for(&self, model: &str) -> String {
        self.endpoint.replace("{model}", model)
    }

    pub fn headers(&self, api_key: &str) -> Result<HeaderMap> {
        self.kind.build_headers(api_key, &self.extra_headers)
    }

    pub fn body(&self, messages: &[Message], model: &str) -> Value {
        self.kind
            .build_body(messages, model, &self.params, self.prompt_style)
    }

    /**
     * \brief 尽力提取文本，不会失败，也不返回空串。
     */
    pub fn extract_text(&self, v: &Value) -> String {
        self.kind.parse_response(v)
    }

    pub fn extract_tokens(&self, v: &Value) -> Option<u64> {
        self.kind.parse_tokens(v)
    }
}

/**
 * \brief Provider 描述表，启动时构建一次。
 */
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    pub fn builtin() -> Self {
        Self::from_config(&Config::default())
    }

    pub fn from_config(config: &Config) -> Self {
        let descriptors = ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                let mut d = ProviderDescriptor::new(kind);
                d.params = config.generation.clone();
                if kind == ProviderKind::OpenRouter {
                    d = d
                        .with_header("HTTP-Referer", config.openrouter.referer.clone())
                        .with_header("X-Title", config.openrouter.title.clone());
                }
                if let Some(ov) = config.providers.get(kind.id()) {
                    if let Some(endpoint) = &ov.endpoint {
                        d = d.with_endpoint(endpoint.clone());
                    }
                    if let Some(model) = &ov.model {
                        d = d.with_default_model(model);
                    }
                    if let Some(style) = ov.prompt_style {
                        d.prompt_style = style;
                    }
                }
                d
            })
            .collect();
        Self { descriptors }
    }

    pub fn lookup(&self, provider_id: &str) -> Result<&ProviderDescriptor> {
        let id = provider_id.trim();
        self.descriptors
            .iter()
            .find(|d| d.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| EidosError::UnknownProvider(provider_id.to_string()))
    }

    pub fn list_provider_ids(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.iter()
    }
}

fn last_turn(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .or_else(|| messages.last())
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

fn labeled_prompt(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => format!("[SYSTEM INSTRUCTION]: {}", m.content),
            Role::User => format!("[QUESTION]: {}", m.content),
            Role::Assistant => format!("[ANSWER]: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn non_empty(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn extract_openai_content(v: &Value) -> Option<&str> {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .and_then(non_empty)
}

fn extract_gemini_content(v: &Value) -> Option<&str> {
    v.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .and_then(non_empty)
        .or_else(|| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .and_then(non_empty)
        })
}
