use thiserror::Error;

/**
 * \brief 注册表、适配器与处理器共用的错误类型。
 *
 * 这些错误不会越过端点边界：调用失败变为错误结果，处理器故障变为兜底响应。
 */
#[derive(Error, Debug)]
pub enum EidosError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Expert system \"{0}\" not found")]
    UnknownExpertType(String),

    #[error("API key not configured for {0}")]
    MissingApiKey(String),

    #[error("{provider} API error: {status}")]
    ProviderStatus { provider: String, status: String },

    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("handler fault: {0}")]
    HandlerFault(String),
}

pub type Result<T> = std::result::Result<T, EidosError>;

/**
 * \brief reqwest 错误会带上请求 URL，而 Gemini 的 key 就在 URL 里，这里统一剥掉。
 */
impl From<reqwest::Error> for EidosError {
    fn from(err: reqwest::Error) -> Self {
        EidosError::Network(err.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_status_names_provider() {
        let err = EidosError::ProviderStatus {
            provider: "Groq Cloud".to_string(),
            status: "Too Many Requests".to_string(),
        };
        assert_eq!(err.to_string(), "Groq Cloud API error: Too Many Requests");
    }

    #[test]
    fn test_unknown_expert_message() {
        let err = EidosError::UnknownExpertType("astrology".to_string());
        assert_eq!(err.to_string(), "Expert system \"astrology\" not found");
    }
}
