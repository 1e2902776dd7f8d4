use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use eidos_core_sdk::config::{Config, Credentials};
use eidos_core_sdk::server::{self, AppState, ChatQuery};
use eidos_core_sdk::telemetry;

/**
 * \brief CLI 程序入口：启动服务或在命令行直接提问。
 */
#[derive(Parser, Debug)]
#[command(name = "eidos", version, about = "Eidos Research Hub")]
struct Cli {
    /// TOML config file; defaults to ./eidos.toml when present
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 启动本地 HTTP 服务。
     * \param addr 监听地址，覆盖 `server.addr`
     */
    Serve {
        #[arg(long)]
        addr: Option<String>,
    },

    /**
     * \brief 通过 `/chat` 同一流程提问一次，并打印 JSON 结果。
     */
    Ask {
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "Multi-Domain")]
        expert: String,
        #[arg(long)]
        provider: Option<String>,
    },

    /// 列出 Provider 及其 Key 配置状态。
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.debug);

    let config = Config::load(cli.config.as_deref()).context("load config failed")?;
    let credentials = Credentials::from_env();

    match cli.command {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let state = AppState::new(config, credentials).shared();
            telemetry::log_event(
                "cli.serve",
                &format!("live={} addr={}", state.credentials.any_configured(), addr),
            );
            server::run(state, &addr).await.context("server failed")?;
        }
        Commands::Ask {
            query,
            expert,
            provider,
        } => {
            let state = AppState::new(config, credentials);
            let q = ChatQuery::new(Some(query), Some(expert), provider)
                .context("invalid question")?;
            let envelope = server::answer_chat(&state, q).await;
            let out = serde_json::to_string_pretty(&envelope).context("encode response failed")?;
            println!("{}", out);
        }
        Commands::Providers => {
            let state = AppState::new(config, credentials);
            for d in state.registry.iter() {
                let status = if state.credentials.is_configured(d.id) {
                    "configured"
                } else {
                    "no key"
                };
                println!(
                    "{:<11} {:<26} {:<9} models={}",
                    d.id,
                    d.display_name,
                    status,
                    d.models.join(",")
                );
            }
            if state.config.default_provider.is_empty() {
                tracing::warn!("default_provider is empty, /chat will run in demo mode");
            } else {
                println!("default: {}", state.config.default_provider);
            }
        }
    }

    Ok(())
}
