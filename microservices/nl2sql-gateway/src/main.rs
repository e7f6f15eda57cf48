//! NL2SQL Gateway
//!
//! Answers natural-language questions against a relational database:
//! - Schema introspection serialized into the generation prompt
//! - Cached text-generator calls with a rule-based fallback
//! - SELECT-only security gate in front of every statement
//! - Query history, table statistics and suggested questions

use std::sync::Arc;
use std::time::Instant;

use tabula_core::{
    DependencyStatus, HealthStatus, MicroserviceRuntime, ReadinessStatus, Result, TabulaError,
    TabulaService,
};
use tabula_sqldb::{PgDatabase, SqlDbPool};
use tracing::{info, warn};

mod api;
mod cache;
mod catalog;
mod client;
mod config;
mod executor;
mod extractor;
mod fallback;
mod history;
mod insights;
mod metrics;
mod pipeline;
mod prompt;
mod store;

#[cfg(test)]
mod fakes;
#[cfg(test)]
mod tests;

use cache::{FileCacheStore, ResponseCache};
use client::{GeminiClient, TextGenerator};
use config::GatewayConfig;
use history::{FileHistoryStore, QueryHistory};
use metrics::PipelineMetrics;
use pipeline::{QueryPipeline, SessionContext};
use prompt::PromptBuilder;

const SERVICE_ID: &str = "nl2sql-gateway";

#[tokio::main]
async fn main() -> Result<()> {
    tabula_telemetry::init(SERVICE_ID).map_err(|e| TabulaError::Config(e.to_string()))?;

    info!("Starting NL2SQL Gateway");

    let service = Arc::new(Nl2SqlGatewayService::new()?);
    MicroserviceRuntime::run(service).await
}

pub struct Nl2SqlGatewayService {
    config: GatewayConfig,
    pool: SqlDbPool,
    ctx: Arc<SessionContext>,
    pipeline: Arc<QueryPipeline>,
    start_time: Instant,
}

impl Nl2SqlGatewayService {
    pub fn new() -> Result<Self> {
        let config = GatewayConfig::from_env()?;

        let pool = SqlDbPool::new(&config.pool)?;
        let db = PgDatabase::new(pool.clone(), config.db_schema.clone())
            .with_query_timeout(config.query_timeout);

        let generator: Option<Arc<dyn TextGenerator>> = match &config.generator {
            Some(gemini) => Some(Arc::new(GeminiClient::new(gemini)?)),
            None => {
                warn!("GEMINI_API_KEY not set, every question will use the fallback rules");
                None
            }
        };

        let history = QueryHistory::new(Arc::new(FileHistoryStore::new(&config.history_path)));
        let ctx = Arc::new(SessionContext::new(Arc::new(db), generator, history));

        let cache = ResponseCache::new(
            Arc::new(FileCacheStore::new(&config.cache_dir)),
            config.cache_ttl,
        );
        let pipeline = Arc::new(QueryPipeline::new(
            PromptBuilder,
            cache,
            PipelineMetrics::new(),
        ));

        Ok(Self {
            config,
            pool,
            ctx,
            pipeline,
            start_time: Instant::now(),
        })
    }
}

#[async_trait::async_trait]
impl TabulaService for Nl2SqlGatewayService {
    fn service_id(&self) -> &'static str {
        SERVICE_ID
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let started = Instant::now();
        let db_healthy = self.pool.is_healthy().await;
        let latency_ms = started.elapsed().as_millis() as u64;

        ReadinessStatus {
            ready: db_healthy && self.ctx.is_connected(),
            dependencies: vec![
                DependencyStatus {
                    name: "postgres".to_string(),
                    available: db_healthy,
                    latency_ms: Some(latency_ms),
                },
                DependencyStatus {
                    name: "text-generator".to_string(),
                    available: self.ctx.generator().is_some(),
                    latency_ms: None,
                },
            ],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        let stats = self.pool.stats();
        info!(
            pool_size = stats.size,
            requests = self.pipeline.metrics().requests.get(),
            "Shutting down NL2SQL Gateway"
        );
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(
            http = %self.config.http_bind,
            generator = self.ctx.generator().map(|g| g.name()).unwrap_or("none"),
            "Starting NL2SQL Gateway"
        );

        // Queries retry the connection lazily, so a down database is not fatal here
        if let Err(e) = self.pipeline.connect(&self.ctx).await {
            warn!(error = %e, "Initial schema introspection failed");
        }

        let app = api::create_router(api::AppState {
            ctx: self.ctx.clone(),
            pipeline: self.pipeline.clone(),
        });

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind)
            .await
            .map_err(|e| TabulaError::Config(format!("bind {}: {}", self.config.http_bind, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| TabulaError::Internal(e.to_string()))?;

        Ok(())
    }
}
