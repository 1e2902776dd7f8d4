pub mod config;
pub mod demo;
pub mod error;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod telemetry;

/**
 * \brief SDK 预导入集合，方便外部引用常用类型。
 */
pub mod prelude {
    pub use crate::config::{Config, Credentials};
    pub use crate::error::{EidosError, Result};
    pub use crate::models::{AiResult, Message};
    pub use crate::prompts::ExpertCatalog;
    pub use crate::providers::{ProviderKind, ProviderRegistry};
    pub use crate::server::{AppState, SharedState};
}
