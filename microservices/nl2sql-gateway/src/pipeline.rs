//! Question-to-result orchestration
//!
//! A request moves through: prompt built, cache lookup, generator call (or
//! fallback), extraction, security gate, execution. Generator failures of any
//! kind are absorbed by the rule-based fallback; every other failure ends up
//! in [`QueryOutcome::result`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tabula_core::{ResultSet, Result, SchemaCatalog, TabulaError};
use tabula_sqldb::Database;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::catalog;
use crate::client::TextGenerator;
use crate::executor::QueryExecutor;
use crate::extractor::SqlExtractor;
use crate::fallback::FallbackSynthesizer;
use crate::history::QueryHistory;
use crate::metrics::PipelineMetrics;
use crate::prompt::PromptBuilder;

/// Catalog plus its serialized form, swapped as one unit
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub catalog: SchemaCatalog,
    pub schema_text: String,
    pub connected_at: Option<DateTime<Utc>>,
}

/// Per-deployment session state handed to every pipeline call
pub struct SessionContext {
    db: Arc<dyn Database>,
    executor: QueryExecutor,
    generator: Option<Arc<dyn TextGenerator>>,
    schema: RwLock<Arc<SchemaSnapshot>>,
    history: QueryHistory,
}

impl SessionContext {
    pub fn new(
        db: Arc<dyn Database>,
        generator: Option<Arc<dyn TextGenerator>>,
        history: QueryHistory,
    ) -> Self {
        Self {
            executor: QueryExecutor::new(db.clone()),
            db,
            generator,
            schema: RwLock::new(Arc::new(SchemaSnapshot::default())),
            history,
        }
    }

    /// Test the connection and rebuild the catalog.
    ///
    /// The previous snapshot stays in place if introspection fails.
    pub async fn connect(&self) -> Result<Arc<SchemaSnapshot>> {
        let catalog = catalog::introspect(self.db.as_ref()).await?;
        let snapshot = Arc::new(SchemaSnapshot {
            schema_text: catalog::serialize(&catalog),
            catalog,
            connected_at: Some(Utc::now()),
        });
        *self.schema.write() = snapshot.clone();
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.schema.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.schema.read().connected_at.is_some()
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn generator(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.generator.as_ref()
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub confidential: bool,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, confidential: bool) -> Self {
        Self {
            question: question.into(),
            confidential,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(TabulaError::Validation("question must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Where the executed SQL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlSource {
    Cache,
    Generator,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub request_id: Uuid,
    pub question: String,
    pub sql: String,
    pub source: SqlSource,
    pub result: Result<ResultSet>,
}

pub struct QueryPipeline {
    prompts: PromptBuilder,
    cache: ResponseCache,
    extractor: SqlExtractor,
    fallback: FallbackSynthesizer,
    metrics: PipelineMetrics,
}

impl QueryPipeline {
    pub fn new(prompts: PromptBuilder, cache: ResponseCache, metrics: PipelineMetrics) -> Self {
        Self {
            prompts,
            cache,
            extractor: SqlExtractor::new(),
            fallback: FallbackSynthesizer::new(),
            metrics,
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// (Re)introspect the schema and publish the table count
    pub async fn connect(&self, ctx: &SessionContext) -> Result<Arc<SchemaSnapshot>> {
        let snapshot = ctx.connect().await?;
        self.metrics.catalog_tables.set(snapshot.catalog.len() as u64);
        info!(tables = snapshot.catalog.len(), "Database connected");
        Ok(snapshot)
    }

    pub async fn ensure_connected(&self, ctx: &SessionContext) -> Result<Arc<SchemaSnapshot>> {
        if ctx.is_connected() {
            Ok(ctx.snapshot())
        } else {
            self.connect(ctx).await
        }
    }

    pub async fn run(&self, ctx: &SessionContext, request: QueryRequest) -> QueryOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("query", %request_id, confidential = request.confidential);
        self.run_inner(ctx, request, request_id).instrument(span).await
    }

    async fn run_inner(
        &self,
        ctx: &SessionContext,
        request: QueryRequest,
        request_id: Uuid,
    ) -> QueryOutcome {
        self.metrics.requests.inc();
        let snapshot = ctx.snapshot();

        let (sql, source) = self.candidate_sql(ctx, &snapshot.schema_text, &request).await;
        debug!(?source, %sql, "Candidate SQL ready");

        let result = ctx.executor().execute(&sql).await;
        match &result {
            Ok(rows) => info!(?source, rows = rows.row_count(), "Query succeeded"),
            Err(TabulaError::Security(_)) => {
                self.metrics.security_rejections.inc();
                warn!(?source, "Query rejected at security gate");
            }
            Err(e) => {
                self.metrics.execution_failures.inc();
                warn!(?source, error = %e, "Query failed");
            }
        }

        if let Err(e) = ctx.history().record(&request.question, &sql).await {
            warn!(error = %e, "Failed to record query history");
        }

        QueryOutcome {
            request_id,
            question: request.question,
            sql,
            source,
            result,
        }
    }

    async fn candidate_sql(
        &self,
        ctx: &SessionContext,
        schema_text: &str,
        request: &QueryRequest,
    ) -> (String, SqlSource) {
        let prompt = self
            .prompts
            .build(&request.question, schema_text, request.confidential);

        let key = ResponseCache::key(&request.question, schema_text);
        if let Some(raw) = self.cache.get(&key).await {
            self.metrics.cache_hits.inc();
            return (self.extractor.extract(&raw), SqlSource::Cache);
        }

        let Some(generator) = ctx.generator() else {
            debug!("No text generator configured, using fallback");
            return self.fall_back(request);
        };

        self.metrics.generator_calls.inc();
        let started = Instant::now();
        let reply = generator.generate(&prompt).await;
        self.metrics
            .generator_latency_ms
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match reply {
            Ok(raw) => {
                if let Err(e) = self
                    .cache
                    .put(&key, &request.question, schema_text, &raw)
                    .await
                {
                    warn!(error = %e, "Failed to cache generator reply");
                }
                (self.extractor.extract(&raw), SqlSource::Generator)
            }
            Err(e) => {
                warn!(generator = generator.name(), error = %e, "Generator failed, using fallback");
                self.fall_back(request)
            }
        }
    }

    fn fall_back(&self, request: &QueryRequest) -> (String, SqlSource) {
        self.metrics.fallbacks.inc();
        (
            self.fallback.synthesize(&request.question, request.confidential),
            SqlSource::Fallback,
        )
    }
}
