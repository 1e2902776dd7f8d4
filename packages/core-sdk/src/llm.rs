use std::time::Instant;

use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;

use crate::error::{EidosError, Result};
use crate::models::{AiResult, Message};
use crate::providers::{KeyPlacement, ProviderDescriptor};
use crate::telemetry;

/**
 * \brief 构建完成、可直接发送的 Provider 请求。
 */
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: HeaderMap,
    pub body: Value,
}

/**
 * \brief 为一次调用构建 URL、请求头与请求体。
 *
 * Key 放在 URL 中的 Provider 以查询参数传递，并去掉 Authorization 头。
 */
pub fn prepare(
    descriptor: &ProviderDescriptor,
    model: &str,
    messages: &[Message],
    api_key: &str,
) -> Result<PreparedRequest> {
    let mut headers = descriptor.headers(api_key)?;
    let mut query = Vec::new();
    if let KeyPlacement::QueryParam(name) = descriptor.key_placement {
        headers.remove(AUTHORIZATION);
        query.push((name, api_key.to_string()));
    }
    Ok(PreparedRequest {
        url: descriptor.endpoint_for(model),
        query,
        headers,
        body: descriptor.body(messages, model),
    })
}

/**
 * \brief 只发起一次 Provider 调用，且不会失败。
 *
 * 非成功状态、网络故障和无法解析的响应体都会变成带 Provider 名称的错误 `AiResult`。
 */
pub async fn send(
    client: &Client,
    descriptor: &ProviderDescriptor,
    model: &str,
    messages: &[Message],
    api_key: &str,
) -> AiResult {
    let started = Instant::now();
    let result = match call(client, descriptor, model, messages, api_key).await {
        Ok(result) => result,
        Err(e) => AiResult::failure(
            descriptor.display_name,
            format!("Error requesting {}: {}", descriptor.display_name, e),
        ),
    };
    telemetry::record_call(descriptor.id, model, &result, started.elapsed());
    result
}

async fn call(
    client: &Client,
    descriptor: &ProviderDescriptor,
    model: &str,
    messages: &[Message],
    api_key: &str,
) -> Result<AiResult> {
    let prepared = prepare(descriptor, model, messages, api_key)?;

    let mut request = client.post(&prepared.url).headers(prepared.headers);
    if !prepared.query.is_empty() {
        request = request.query(&prepared.query);
    }
    let resp = request.json(&prepared.body).send().await?;

    if !resp.status().is_success() {
        return Err(EidosError::ProviderStatus {
            provider: descriptor.display_name.to_string(),
            status: resp.status().to_string(),
        });
    }
    let raw = resp.text().await?;
    let v: Value = serde_json::from_str(&raw)?;
    Ok(AiResult::success(
        descriptor.display_name,
        descriptor.extract_text(&v),
        model,
        descriptor.extract_tokens(&v),
    ))
}
