use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/** \brief 实时回答成功时的置信度（0-1）。 */
pub const LIVE_CONFIDENCE: f32 = 0.85;

/**
 * \brief 消息角色，对齐 OpenAI 聊天格式。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/**
 * \brief 与 Provider 无关的消息，系统消息在用户消息之前。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /** \brief 角色：system/user/assistant */
    pub role: Role,
    /** \brief 内容 */
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/**
 * \brief 模拟流水线阶段的展示记录。
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStep {
    pub agent: String,
    pub action: String,
    pub result: String,
    pub timestamp: String,
}

/**
 * \brief 一次 Provider 调用或演示生成的统一结果。
 *
 * `is_error == true` 时 `confidence == 0.0`，`response_text` 为可读的诊断信息。
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiResult {
    #[serde(rename = "provider")]
    pub provider_name: String,
    #[serde(rename = "response")]
    pub response_text: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "error")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(rename = "demoMode", skip_serializing_if = "is_false")]
    pub demo_mode: bool,
    #[serde(rename = "emergencyMode", skip_serializing_if = "is_false")]
    pub emergency_mode: bool,
    #[serde(rename = "agentSteps", skip_serializing_if = "Vec::is_empty")]
    pub agent_steps: Vec<AgentStep>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl AiResult {
    pub fn success(
        provider_name: impl Into<String>,
        response_text: impl Into<String>,
        model: impl Into<String>,
        tokens: Option<u64>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            response_text: response_text.into(),
            confidence: LIVE_CONFIDENCE,
            model: Some(model.into()),
            is_error: false,
            tokens,
            demo_mode: false,
            emergency_mode: false,
            agent_steps: Vec::new(),
        }
    }

    /**
     * \brief 错误结果：置信度为 0，文本为诊断信息，无模型。
     */
    pub fn failure(provider_name: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            response_text: diagnostic.into(),
            confidence: 0.0,
            model: None,
            is_error: true,
            tokens: None,
            demo_mode: false,
            emergency_mode: false,
            agent_steps: Vec::new(),
        }
    }
}

/**
 * \brief 当前 UTC 时间（RFC 3339）。
 */
pub fn timestamp_now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/**
 * \brief 取 `text` 前 `max_chars` 个字符，按字符边界截断。
 */
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
