use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::{Config, Credentials};
use crate::demo::{self, relabel_steps, AgentMode, DemoGenerator};
use crate::error::EidosError;
use crate::models::{excerpt, timestamp_now, AiResult, Message};
use crate::prompts::{ExpertCatalog, ExpertKind};
use crate::providers::{ProviderDescriptor, ProviderRegistry};
use crate::{llm, telemetry};

const PIPELINE_AGENTS: [&str; 3] = ["Analyst", "Synthesizer", "Validator"];
const CHAT_REQUIRED: &str = "Query and expertType are required";
const CHAT_FALLBACK_HINT: &str = "Using demo mode due to server error";
const RESEARCH_DEMO_INFO: &str = "Running in demo mode. Add API keys to connect to real LLMs.";
const EMERGENCY_WARNING: &str = "⚠️ System error. Emergency demo mode is used.";
const EMERGENCY_INFO: &str = "Service is running in limited demonstration mode.";

/**
 * \brief 所有请求共享的只读状态。
 */
pub struct AppState {
    pub config: Config,
    pub registry: ProviderRegistry,
    pub experts: ExpertCatalog,
    pub demo: DemoGenerator,
    pub credentials: Credentials,
    pub client: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, credentials: Credentials) -> Self {
        let registry = ProviderRegistry::from_config(&config);
        let experts = ExpertCatalog::builtin();
        let demo = DemoGenerator::new(experts.clone());
        Self {
            config,
            registry,
            experts,
            demo,
            credentials,
            client: reqwest::Client::new(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    /**
     * \brief 实时路径使用的 Provider 与 Key，`None` 表示默认 Provider。
     */
    fn live_target(
        &self,
        provider: Option<&str>,
    ) -> Result<(&ProviderDescriptor, &str), EidosError> {
        let id = provider
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.config.default_provider.as_str());
        let descriptor = self.registry.lookup(id)?;
        let key = self
            .credentials
            .api_key(descriptor.id)
            .ok_or_else(|| EidosError::MissingApiKey(descriptor.display_name.to_string()))?;
        Ok((descriptor, key))
    }
}

/**
 * \brief 构建路由：`/chat` 与 `/research/assistant`。
 */
pub fn router(state: SharedState) -> Router {
    let cors = state.config.server.cors_permissive;
    let mut app = Router::new()
        .route(
            "/chat",
            get(chat_status)
                .post(chat)
                .layer(chat_guard()),
        )
        .route(
            "/research/assistant",
            get(research_status)
                .post(research)
                .layer(research_guard()),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if cors {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

fn chat_guard() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(chat_panic as PanicHandler)
}

fn research_guard() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(research_panic as PanicHandler)
}

/**
 * \brief 启动 HTTP 服务。
 * \param addr 监听地址，如 "127.0.0.1:8880"
 */
pub async fn run(state: SharedState, addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    expert_type: Option<String>,
    #[serde(default)]
    provider: Option<String>,
}

/**
 * \brief 校验后的 `/chat` 输入。
 */
#[derive(Debug, Clone)]
pub struct ChatQuery {
    pub query: String,
    pub expert_type: String,
    pub provider: Option<String>,
}

impl ChatQuery {
    /**
     * \brief `query` 与 `expertType` 均不能为空。
     */
    pub fn new(
        query: Option<String>,
        expert_type: Option<String>,
        provider: Option<String>,
    ) -> Result<Self, EidosError> {
        let query = query.filter(|q| !q.trim().is_empty());
        let expert_type = expert_type.filter(|e| !e.trim().is_empty());
        match (query, expert_type) {
            (Some(query), Some(expert_type)) => Ok(Self {
                query,
                expert_type,
                provider,
            }),
            _ => Err(EidosError::BadRequest(CHAT_REQUIRED.to_string())),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatEnvelope {
    pub success: bool,
    pub mode: &'static str,
    pub expert_type: String,
    pub query: String,
    pub response: String,
    pub provider: String,
    pub confidence: f32,
    pub error: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub agents: Vec<&'static str>,
    pub processing_time: String,
}

impl ChatEnvelope {
    fn from_result(q: ChatQuery, mode: &'static str, result: AiResult, started: Instant) -> Self {
        Self {
            success: !result.is_error,
            mode,
            expert_type: q.expert_type,
            query: q.query,
            response: result.response_text,
            provider: result.provider_name,
            confidence: result.confidence,
            error: result.is_error,
            timestamp: timestamp_now(),
            model: result.model,
            agents: PIPELINE_AGENTS.to_vec(),
            processing_time: format!("{:.1}s", started.elapsed().as_secs_f64()),
        }
    }
}

/**
 * \brief `POST /chat` 背后的实时/演示流程，不会失败。
 */
pub async fn answer_chat(state: &AppState, q: ChatQuery) -> ChatEnvelope {
    let started = Instant::now();
    match state.live_target(q.provider.as_deref()) {
        Ok((descriptor, api_key)) => {
            let profile = state.experts.prompt_for(&q.expert_type);
            let messages = vec![
                Message::system(profile.system_prompt),
                Message::user(q.query.clone()),
            ];
            telemetry::log_event(
                "server.chat",
                &format!(
                    "live provider={} expert={} query_len={}",
                    descriptor.id,
                    profile.key(),
                    q.query.len()
                ),
            );
            let result = llm::send(
                &state.client,
                descriptor,
                descriptor.default_model(),
                &messages,
                api_key,
            )
            .await;
            ChatEnvelope::from_result(q, "live", result, started)
        }
        Err(reason) => {
            telemetry::log_event(
                "server.chat",
                &format!(
                    "demo expert={} query_len={} reason={}",
                    q.expert_type,
                    q.query.len(),
                    reason
                ),
            );
            let out = state.demo.generate(&q.expert_type, &q.query, AgentMode::Single);
            ChatEnvelope::from_result(q, "demo", out.result, started)
        }
    }
}

async fn chat(State(state): State<SharedState>, body: Bytes) -> Response {
    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return chat_fault(&EidosError::from(e)),
    };
    let q = match ChatQuery::new(req.query, req.expert_type, req.provider) {
        Ok(q) => q,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response()
        }
    };
    Json(answer_chat(&state, q).await).into_response()
}

fn chat_fault(err: &EidosError) -> Response {
    telemetry::log_error("server.chat", &format!("chat handler fault: {}", err));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": "Internal server error",
            "message": err.to_string(),
            "mode": "error",
            "fallback": CHAT_FALLBACK_HINT
        })),
    )
        .into_response()
}

fn chat_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    chat_fault(&EidosError::HandlerFault(panic_message(err.as_ref())))
}

/**
 * \brief `GET /chat` 的静态目录。
 */
pub fn chat_catalog(state: &AppState) -> Value {
    json!({
        "status": "active",
        "mode": if state.credentials.any_configured() { "live" } else { "demo" },
        "available_providers": state.registry.list_provider_ids(),
        "expert_types": state.experts.labels(),
        "note": "For real requests, set GROQ_API_KEY, GOOGLE_AI_API_KEY or OPENROUTER_API_KEY in the environment"
    })
}

async fn chat_status(State(state): State<SharedState>) -> Json<Value> {
    Json(chat_catalog(&state))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ResearchRequest {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    expert_type: Option<String>,
    #[serde(default)]
    test_mode: Option<bool>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResearchEnvelope {
    pub success: bool,
    pub responses: Vec<AiResult>,
    pub timestamp: String,
    pub mode: String,
    pub demo_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

fn research_rejection(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message, "responses": [] })),
    )
        .into_response()
}

async fn research(State(state): State<SharedState>, body: Bytes) -> Response {
    let req: ResearchRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return research_fault(&EidosError::from(e), "", ExpertKind::MultiDomain.slug()),
    };

    let query = req.query.unwrap_or_default();
    let expert_type = req
        .expert_type
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| ExpertKind::MultiDomain.slug().to_string());
    let test_mode = req.test_mode.unwrap_or(false);
    tracing::info!(
        query = excerpt(&query, 100),
        expert_type = %expert_type,
        test_mode,
        "research assistant called"
    );

    if query.trim().is_empty() {
        return research_rejection("Query is required".to_string());
    }
    let slug = match state.experts.resolve(&expert_type) {
        Some(profile) => profile.key(),
        None => {
            return research_rejection(EidosError::UnknownExpertType(expert_type).to_string())
        }
    };

    let task = {
        let (state, query) = (state.clone(), query.clone());
        tokio::spawn(async move { answer_research(&state, &query, slug, test_mode).await })
    };
    guard_research(task, &query, slug).await
}

/**
 * \brief 等待流水线任务；任务 panic 时仍回显已解析的查询。
 */
async fn guard_research(
    task: JoinHandle<ResearchEnvelope>,
    query: &str,
    expert_type: &str,
) -> Response {
    match task.await {
        Ok(envelope) => Json(envelope).into_response(),
        Err(e) => {
            let detail = if e.is_panic() {
                panic_message(e.into_panic().as_ref())
            } else {
                e.to_string()
            };
            research_fault(&EidosError::HandlerFault(detail), query, expert_type)
        }
    }
}

/**
 * \brief 三步研究流程，`expert_type` 须已能解析。
 *
 * 仅当开启实时研究、未设置 `test_mode` 且默认 Provider 有凭据时才走实时调用，
 * 实时回答会被拆成该专家的三个代理步骤；否则输出演示结果。
 */
pub async fn answer_research(
    state: &AppState,
    query: &str,
    expert_type: &str,
    test_mode: bool,
) -> ResearchEnvelope {
    let profile = state.experts.prompt_for(expert_type);
    let mut warning = None;

    if state.config.research.live_enabled && !test_mode {
        if let Ok((descriptor, api_key)) = state.live_target(None) {
            let system = profile
                .agents
                .first()
                .map(|a| a.prompt)
                .unwrap_or(profile.system_prompt);
            let messages = vec![Message::system(system), Message::user(query)];
            let mut result = llm::send(
                &state.client,
                descriptor,
                descriptor.default_model(),
                &messages,
                api_key,
            )
            .await;
            if !result.is_error {
                result.agent_steps = relabel_steps(
                    profile,
                    profile
                        .agents
                        .iter()
                        .map(|a| (a.name, result.response_text.as_str())),
                );
                return ResearchEnvelope {
                    success: true,
                    responses: vec![result],
                    timestamp: timestamp_now(),
                    mode: profile.key().to_string(),
                    demo_mode: false,
                    info: Some(format!("Live analysis by {}", descriptor.display_name)),
                    warning: None,
                };
            }
            warning = Some(format!("{} Falling back to demo mode.", result.response_text));
        }
    }

    let out = state.demo.generate(expert_type, query, AgentMode::Multi);
    ResearchEnvelope {
        success: true,
        responses: vec![out.result],
        timestamp: timestamp_now(),
        mode: profile.key().to_string(),
        demo_mode: true,
        info: Some(RESEARCH_DEMO_INFO.to_string()),
        warning,
    }
}

fn research_fault(err: &EidosError, query: &str, expert_type: &str) -> Response {
    telemetry::log_error("server.research", &format!("fatal error: {}", err));
    Json(ResearchEnvelope {
        success: true,
        responses: vec![demo::emergency(query)],
        timestamp: timestamp_now(),
        mode: expert_type.to_string(),
        demo_mode: true,
        info: Some(EMERGENCY_INFO.to_string()),
        warning: Some(EMERGENCY_WARNING.to_string()),
    })
    .into_response()
}

fn research_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    research_fault(
        &EidosError::HandlerFault(panic_message(err.as_ref())),
        "",
        ExpertKind::MultiDomain.slug(),
    )
}

/**
 * \brief `GET /research/assistant` 的状态报告。
 */
pub fn research_catalog(state: &AppState) -> Value {
    let mut providers = Map::new();
    for id in state.registry.list_provider_ids() {
        providers.insert(id.to_string(), json!(state.credentials.is_configured(id)));
    }
    let real_mode_available = state.credentials.any_configured();
    let demo_mode = !(state.config.research.live_enabled
        && state.live_target(None).is_ok());
    json!({
        "status": "ok",
        "demoMode": demo_mode,
        "realModeAvailable": real_mode_available,
        "availableProviders": providers,
        "expertSystems": state.experts.slugs(),
        "info": if demo_mode {
            "System operates in demonstration mode without connection to LLMs"
        } else {
            "System forwards research questions to a live LLM provider"
        },
        "timestamp": timestamp_now()
    })
}

async fn research_status(State(state): State<SharedState>) -> Json<Value> {
    Json(research_catalog(&state))
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderOverride;
    use crate::providers::ProviderKind;
    use axum::{
        body::Body,
        extract::{Path, Query},
        http::{HeaderMap, Request},
        routing::post,
    };
    use std::collections::{HashMap, HashSet};
    use tower::ServiceExt;

    fn demo_state() -> SharedState {
        AppState::new(Config::default(), Credentials::none()).shared()
    }

    fn groq_state(endpoint: String, live_research: bool) -> SharedState {
        let mut config = Config::default();
        config.research.live_enabled = live_research;
        config.providers.insert(
            "groq".to_string(),
            ProviderOverride {
                endpoint: Some(endpoint),
                ..Default::default()
            },
        );
        AppState::new(config, Credentials::none().with_key(ProviderKind::Groq, "gsk-test")).shared()
    }

    async fn spawn_upstream() -> String {
        let upstream = Router::new()
            .route(
                "/ok",
                post(|| async {
                    Json(json!({"choices": [{"message": {"content": "Live answer about proteins"}}]}))
                }),
            )
            .route(
                "/fail",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route("/gemini/{model}", post(gemini_echo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, upstream).await;
        });
        format!("http://{}", addr)
    }

    async fn gemini_echo(
        Path(model): Path<String>,
        Query(q): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Json<Value> {
        let text = format!(
            "model={} key={} auth={}",
            model,
            q.get("key").cloned().unwrap_or_default(),
            headers.contains_key("authorization")
        );
        Json(json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}))
    }

    fn google_state(endpoint: String) -> SharedState {
        let mut config = Config::default();
        config.providers.insert(
            "google".to_string(),
            ProviderOverride {
                endpoint: Some(endpoint),
                ..Default::default()
            },
        );
        AppState::new(
            config,
            Credentials::none().with_key(ProviderKind::Google, "SECRET-GOOGLE-KEY"),
        )
        .shared()
    }

    async fn read_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    async fn call_app(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        read_json(app.oneshot(request).await.expect("response")).await
    }

    async fn call(state: SharedState, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        call_app(router(state), method, uri, body).await
    }

    async fn exploding_handler() -> Response {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_chat_panic_renders_fault_response() {
        let app = Router::new().route("/chat", post(exploding_handler).layer(chat_guard()));
        let (status, v) = call_app(app, "POST", "/chat", Some(r#"{"query":"q","expertType":"x"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "Internal server error");
        assert_eq!(v["fallback"], CHAT_FALLBACK_HINT);
        assert!(v["message"].as_str().expect("message").contains("handler exploded"));
    }

    #[tokio::test]
    async fn test_research_panic_renders_emergency_demo() {
        let app = Router::new().route(
            "/research/assistant",
            post(exploding_handler).layer(research_guard()),
        );
        let (status, v) = call_app(app, "POST", "/research/assistant", Some(r#"{"query":"q"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["success"], true);
        assert_eq!(v["warning"], EMERGENCY_WARNING);
        assert_eq!(v["info"], EMERGENCY_INFO);
        assert_eq!(v["responses"][0]["emergencyMode"], true);
        assert_eq!(v["responses"][0]["model"], "emergency-demo");
    }

    async fn exploding_pipeline() -> ResearchEnvelope {
        panic!("pipeline exploded")
    }

    #[tokio::test]
    async fn test_research_pipeline_panic_keeps_query() {
        let task = tokio::spawn(exploding_pipeline());
        let (status, v) = read_json(guard_research(task, "Why is the sky blue?", "life-sciences").await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "life-sciences");
        assert_eq!(v["warning"], EMERGENCY_WARNING);
        let item = &v["responses"][0];
        assert_eq!(item["provider"], "Emergency Demo Mode");
        assert!(item["response"].as_str().expect("text").contains("Why is the sky blue?"));
    }

    #[tokio::test]
    async fn test_chat_live_google_puts_key_in_query() {
        let base = spawn_upstream().await;
        let state = google_state(format!("{}/gemini/{{model}}", base));
        let (status, v) = call(
            state,
            "POST",
            "/chat",
            Some(r#"{"query":"q","expertType":"Knowledge Graph","provider":"google"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "live");
        assert_eq!(v["success"], true);
        assert_eq!(v["provider"], "Google AI Studio (Gemini)");
        assert_eq!(
            v["response"],
            "model=gemini-1.5-flash-latest key=SECRET-GOOGLE-KEY auth=false"
        );
    }

    #[tokio::test]
    async fn test_chat_live_google_failure_hides_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let state = google_state(format!("http://{}/v1beta/models/{{model}}:generateContent", addr));
        let (status, v) = call(
            state,
            "POST",
            "/chat",
            Some(r#"{"query":"q","expertType":"Knowledge Graph","provider":"google"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "live");
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], true);
        let response = v["response"].as_str().expect("text");
        assert!(response.contains("Google AI Studio (Gemini)"));
        assert!(!response.contains("SECRET-GOOGLE-KEY"), "{}", response);
    }

    #[test]
    fn test_live_target_reasons() {
        let state = groq_state("http://127.0.0.1:9/unused".to_string(), false);
        assert_eq!(state.live_target(None).expect("groq").0.id, "groq");
        let missing = state.live_target(Some("google")).expect_err("no google key");
        assert!(matches!(missing, EidosError::MissingApiKey(ref name) if name == "Google AI Studio (Gemini)"));
        let unknown = state.live_target(Some("mistral")).expect_err("unknown");
        assert!(matches!(unknown, EidosError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn test_chat_demo_without_credentials() {
        let (status, v) = call(
            demo_state(),
            "POST",
            "/chat",
            Some(r#"{"query":"test","expertType":"Life Sciences","provider":"groq"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["success"], true);
        assert_eq!(v["mode"], "demo");
        assert_eq!(v["provider"], "Demo Mode");
        assert_eq!(v["error"], false);
        assert_eq!(v["expertType"], "Life Sciences");
        assert_eq!(v["agents"], json!(["Analyst", "Synthesizer", "Validator"]));
        let response = v["response"].as_str().expect("response text");
        assert!(response.contains("test"));
        assert!(response.starts_with("🧬") || response.starts_with("🔍"));
        assert!(v["processingTime"].as_str().expect("time").ends_with('s'));
    }

    #[tokio::test]
    async fn test_chat_missing_query_is_bad_request() {
        let (status, v) = call(demo_state(), "POST", "/chat", Some(r#"{"expertType":"Life Sciences"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v, json!({"error": "Query and expertType are required"}));

        let (status, _) = call(demo_state(), "POST", "/chat", Some(r#"{"query":"hi","expertType":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_malformed_body_is_internal_error_with_hint() {
        let (status, v) = call(demo_state(), "POST", "/chat", Some("{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(v["success"], false);
        assert_eq!(v["mode"], "error");
        assert_eq!(v["fallback"], CHAT_FALLBACK_HINT);
    }

    #[tokio::test]
    async fn test_chat_unknown_expert_still_answers() {
        let (status, v) = call(
            demo_state(),
            "POST",
            "/chat",
            Some(r#"{"query":"black holes","expertType":"Astrophysics"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "demo");
        assert!(v["response"].as_str().expect("text").contains("black holes"));
    }

    #[tokio::test]
    async fn test_chat_live_success() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/ok", base), false);
        let (status, v) = call(
            state,
            "POST",
            "/chat",
            Some(r#"{"query":"proteins","expertType":"Life Sciences"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "live");
        assert_eq!(v["success"], true);
        assert_eq!(v["provider"], "Groq Cloud");
        assert_eq!(v["response"], "Live answer about proteins");
        assert_eq!(v["model"], "llama3-70b-8192");
    }

    #[tokio::test]
    async fn test_chat_provider_failure_is_still_200() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/fail", base), false);
        let (status, v) = call(
            state,
            "POST",
            "/chat",
            Some(r#"{"query":"proteins","expertType":"Life Sciences","provider":"groq"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "live");
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], true);
        assert_eq!(v["confidence"], 0.0);
        assert!(v["response"].as_str().expect("text").contains("Groq Cloud"));
        assert!(v.get("model").is_none());
    }

    #[tokio::test]
    async fn test_chat_unknown_or_unconfigured_provider_goes_demo() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/ok", base), false);
        let (_, v) = call(
            state.clone(),
            "POST",
            "/chat",
            Some(r#"{"query":"q","expertType":"Generative AI","provider":"mistral"}"#),
        )
        .await;
        assert_eq!(v["mode"], "demo");
        let (_, v) = call(
            state,
            "POST",
            "/chat",
            Some(r#"{"query":"q","expertType":"Generative AI","provider":"google"}"#),
        )
        .await;
        assert_eq!(v["mode"], "demo");
    }

    #[tokio::test]
    async fn test_chat_catalog_is_stable() {
        let (status, first) = call(demo_state(), "GET", "/chat", None).await;
        let (_, second) = call(demo_state(), "GET", "/chat", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first["status"], "active");
        assert_eq!(first["mode"], "demo");
        assert_eq!(first["available_providers"], json!(["groq", "google", "openrouter"]));
        assert_eq!(first["expert_types"].as_array().expect("types").len(), 4);
    }

    #[tokio::test]
    async fn test_research_demo_envelope() {
        let (status, v) = call(
            demo_state(),
            "POST",
            "/research/assistant",
            Some(r#"{"query":"How do enzymes fold?","expertType":"life-sciences"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["success"], true);
        assert_eq!(v["demoMode"], true);
        assert_eq!(v["mode"], "life-sciences");
        assert_eq!(v["info"], RESEARCH_DEMO_INFO);
        let item = &v["responses"][0];
        assert_eq!(item["provider"], "Demo Mode (LLMs not available)");
        assert_eq!(item["model"], "demo-model");
        assert_eq!(item["tokens"], 450);
        assert_eq!(item["demoMode"], true);
        assert!(item["response"].as_str().expect("text").contains("How do enzymes fold?"));
        let steps = item["agentSteps"].as_array().expect("steps");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["agent"], "Biomedical Expert");
        assert_eq!(steps[2]["action"], "Adapting complex concepts for interdisciplinary audience");
    }

    #[tokio::test]
    async fn test_research_defaults_to_multi_domain() {
        let (status, v) = call(demo_state(), "POST", "/research/assistant", Some(r#"{"query":"q"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["mode"], "multi-domain");
        assert_eq!(v["responses"][0]["agentSteps"][0]["agent"], "Multi-Expert Analyzer");
    }

    #[tokio::test]
    async fn test_research_validation() {
        let (status, v) = call(demo_state(), "POST", "/research/assistant", Some(r#"{"query":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v, json!({"success": false, "error": "Query is required", "responses": []}));

        let (status, v) = call(
            demo_state(),
            "POST",
            "/research/assistant",
            Some(r#"{"query":"q","expertType":"astrology"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(v["error"], "Expert system \"astrology\" not found");
    }

    #[tokio::test]
    async fn test_research_malformed_body_gets_emergency_demo() {
        let (status, v) = call(demo_state(), "POST", "/research/assistant", Some("[1, 2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["success"], true);
        assert_eq!(v["warning"], EMERGENCY_WARNING);
        assert_eq!(v["responses"][0]["provider"], "Emergency Demo Mode");
        assert_eq!(v["responses"][0]["emergencyMode"], true);
    }

    #[tokio::test]
    async fn test_research_stays_demo_with_credentials_by_default() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/ok", base), false);
        let (_, v) = call(state, "POST", "/research/assistant", Some(r#"{"query":"q"}"#)).await;
        assert_eq!(v["demoMode"], true);
    }

    #[tokio::test]
    async fn test_research_live_relabels_single_answer() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/ok", base), true);
        let (status, v) = call(
            state,
            "POST",
            "/research/assistant",
            Some(r#"{"query":"proteins","expertType":"Life Sciences"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["demoMode"], false);
        let item = &v["responses"][0];
        assert_eq!(item["response"], "Live answer about proteins");
        let steps = item["agentSteps"].as_array().expect("steps");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1]["agent"], "Reviewer and Validator");
        assert_eq!(steps[1]["result"], "Live answer about proteins...");
    }

    #[tokio::test]
    async fn test_research_live_test_mode_forces_demo() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/ok", base), true);
        let (_, v) = call(
            state,
            "POST",
            "/research/assistant",
            Some(r#"{"query":"q","testMode":true}"#),
        )
        .await;
        assert_eq!(v["demoMode"], true);
    }

    #[tokio::test]
    async fn test_research_live_failure_falls_back_with_warning() {
        let base = spawn_upstream().await;
        let state = groq_state(format!("{}/fail", base), true);
        let (status, v) = call(state, "POST", "/research/assistant", Some(r#"{"query":"q"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["demoMode"], true);
        assert!(v["warning"].as_str().expect("warning").contains("Groq Cloud"));
        assert_eq!(v["responses"][0]["agentSteps"].as_array().expect("steps").len(), 3);
    }

    #[tokio::test]
    async fn test_research_catalog() {
        let (status, v) = call(demo_state(), "GET", "/research/assistant", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["status"], "ok");
        assert_eq!(v["demoMode"], true);
        assert_eq!(v["realModeAvailable"], false);
        assert_eq!(v["availableProviders"]["groq"], false);
        assert_eq!(v["availableProviders"]["google"], false);
        let systems: HashSet<String> = v["expertSystems"]
            .as_array()
            .expect("systems")
            .iter()
            .filter_map(|s| s.as_str().map(str::to_string))
            .collect();
        let expected: HashSet<String> = ["multi-domain", "generative-ai", "knowledge-graph", "life-sciences"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(systems, expected);
    }

    #[tokio::test]
    async fn test_research_catalog_is_stable_apart_from_timestamp() {
        let (_, mut first) = call(demo_state(), "GET", "/research/assistant", None).await;
        let (_, mut second) = call(demo_state(), "GET", "/research/assistant", None).await;
        first["timestamp"] = Value::Null;
        second["timestamp"] = Value::Null;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_research_catalog_reports_credentials() {
        let state = groq_state("http://127.0.0.1:9/unused".to_string(), false);
        let v = research_catalog(&state);
        assert_eq!(v["realModeAvailable"], true);
        assert_eq!(v["availableProviders"]["groq"], true);
        assert_eq!(v["availableProviders"]["openrouter"], false);
        assert_eq!(v["demoMode"], true);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
