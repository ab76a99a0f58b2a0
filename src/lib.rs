pub mod auth;
pub mod config;
pub mod db;
pub mod state;
pub mod telemetry;

pub use auth::{AuthError, AuthResult, AuthWorkflow, BlockingAuthWorkflow};
pub use config::AppConfig;
pub use state::AppState;

/// Loads `.env`, installs logging and wires the application state.
pub async fn bootstrap() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();
    AppState::init().await
}
