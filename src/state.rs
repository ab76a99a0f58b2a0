use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::auth::{AuthWorkflow, PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;

/// Process-wide wiring, built once at start-up and passed down.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthWorkflow>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = db::connect(&config).await?;
        db::migrate(&db).await?;

        let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
        let auth = Arc::new(AuthWorkflow::with_defaults(store, &config.jwt, &config.auth));

        info!(
            issuer = %config.jwt.issuer,
            include_user_id = config.auth.include_user_id,
            call_timeout_ms = config.auth.call_timeout_ms,
            "auth workflow ready"
        );
        Ok(Self { db, config, auth })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, auth: Arc<AuthWorkflow>) -> Self {
        Self { db, config, auth }
    }
}
