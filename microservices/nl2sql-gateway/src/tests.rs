//! End-to-end tests for the NL2SQL Gateway

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tabula_core::{ResultSet, TabulaError};
use tabula_sqldb::{PgDatabase, PoolConfig, SqlDbPool};

use crate::api::{self, AppState, HistoryParams};
use crate::cache::{MemoryCacheStore, ResponseCache, DEFAULT_TTL};
use crate::client::{GeneratorError, TextGenerator};
use crate::executor::QueryExecutor;
use crate::fakes::{int, text, FakeDatabase, FakeGenerator};
use crate::fallback::FallbackSynthesizer;
use crate::history::{MemoryHistoryStore, QueryHistory};
use crate::metrics::PipelineMetrics;
use crate::pipeline::{QueryPipeline, QueryRequest, SessionContext, SqlSource};
use crate::prompt::PromptBuilder;

const LOW_STOCK_SQL: &str =
    r#"SELECT "productName", "quantityInStock" FROM products WHERE "quantityInStock" < 100 ORDER BY "quantityInStock""#;
const EMPLOYEE_COUNT_SQL: &str = "SELECT COUNT(*) FROM employees;";

struct Harness {
    db: Arc<FakeDatabase>,
    generator: Option<Arc<FakeGenerator>>,
    cache_store: Arc<MemoryCacheStore>,
    ctx: Arc<SessionContext>,
    pipeline: Arc<QueryPipeline>,
}

impl Harness {
    fn new(db: FakeDatabase, generator: Option<FakeGenerator>) -> Self {
        let db = Arc::new(db);
        let generator = generator.map(Arc::new);
        let cache_store = Arc::new(MemoryCacheStore::new());

        let ctx = Arc::new(SessionContext::new(
            db.clone(),
            generator.clone().map(|g| g as Arc<dyn TextGenerator>),
            QueryHistory::new(Arc::new(MemoryHistoryStore::new())),
        ));
        let pipeline = Arc::new(QueryPipeline::new(
            PromptBuilder::default(),
            ResponseCache::new(cache_store.clone(), DEFAULT_TTL),
            PipelineMetrics::new(),
        ));

        Self {
            db,
            generator,
            cache_store,
            ctx,
            pipeline,
        }
    }

    fn state(&self) -> AppState {
        AppState {
            ctx: self.ctx.clone(),
            pipeline: self.pipeline.clone(),
        }
    }

    fn generator_calls(&self) -> usize {
        self.generator.as_ref().map(|g| g.calls()).unwrap_or(0)
    }

    async fn ask(&self, question: &str, confidential: bool) -> crate::pipeline::QueryOutcome {
        self.pipeline.connect(&self.ctx).await.unwrap();
        self.pipeline
            .run(&self.ctx, QueryRequest::new(question, confidential))
            .await
    }
}

fn low_stock_rows() -> ResultSet {
    ResultSet::new(
        vec!["productName".into(), "quantityInStock".into()],
        vec![
            vec![text("1960 BSA Gold Star DBD34"), int(15)],
            vec![text("1968 Ford Mustang"), int(68)],
            vec![text("1928 Ford Phaeton Deluxe"), int(42)],
        ],
    )
}

fn company_with_low_stock() -> FakeDatabase {
    let mut rows = low_stock_rows();
    rows.rows.sort_by_key(|r| r[1].as_i64());
    FakeDatabase::company().with_result(LOW_STOCK_SQL, rows)
}

#[tokio::test]
async fn test_generator_outage_falls_back_to_low_stock_template() {
    let h = Harness::new(
        company_with_low_stock(),
        Some(FakeGenerator::failing(GeneratorError::Unavailable("timed out after 30s".into()))),
    );

    let outcome = h.ask("low stock products", false).await;

    assert_eq!(outcome.source, SqlSource::Fallback);
    assert_eq!(outcome.sql, LOW_STOCK_SQL);
    let result = outcome.result.unwrap();
    assert_eq!(result.columns, vec!["productName", "quantityInStock"]);
    let quantities: Vec<i64> = result
        .column("quantityInStock")
        .unwrap()
        .into_iter()
        .filter_map(|v| v.as_i64())
        .collect();
    assert!(quantities.windows(2).all(|w| w[0] <= w[1]));
    assert!(quantities.iter().all(|q| *q < 100));

    assert_eq!(h.generator_calls(), 1);
    assert_eq!(h.cache_store.len(), 0, "failed generations are never cached");
    let metrics = h.pipeline.metrics().snapshot();
    assert_eq!(metrics.fallbacks, 1);
    assert_eq!(metrics.generator_calls, 1);
}

#[tokio::test]
async fn test_empty_generator_reply_falls_back() {
    let h = Harness::new(
        company_with_low_stock(),
        Some(FakeGenerator::failing(GeneratorError::Empty)),
    );
    let outcome = h.ask("low stock products", false).await;
    assert_eq!(outcome.source, SqlSource::Fallback);
    assert!(outcome.result.is_ok());
}

#[tokio::test]
async fn test_no_generator_configured_uses_fallback() {
    let h = Harness::new(company_with_low_stock(), None);
    let outcome = h.ask("low stock products", false).await;
    assert_eq!(outcome.source, SqlSource::Fallback);
    assert!(outcome.result.is_ok());
    assert_eq!(h.pipeline.metrics().snapshot().generator_calls, 0);
}

#[tokio::test]
async fn test_generated_sql_is_cached_for_the_same_schema() {
    let h = Harness::new(
        FakeDatabase::company().with_result(
            EMPLOYEE_COUNT_SQL,
            ResultSet::new(vec!["count".into()], vec![vec![int(23)]]),
        ),
        Some(FakeGenerator::replying("```sql\nSELECT COUNT(*) FROM employees\n```")),
    );

    let first = h.ask("How many employees?", false).await;
    assert_eq!(first.source, SqlSource::Generator);
    assert_eq!(first.sql, EMPLOYEE_COUNT_SQL);
    assert_eq!(first.result.unwrap().scalar().and_then(|v| v.as_i64()), Some(23));

    let second = h.ask("How many employees?", false).await;
    assert_eq!(second.source, SqlSource::Cache);
    assert_eq!(second.sql, EMPLOYEE_COUNT_SQL);

    assert_eq!(h.generator_calls(), 1);
    assert_eq!(h.cache_store.len(), 1);
    assert_eq!(h.pipeline.metrics().snapshot().cache_hits, 1);
}

#[tokio::test]
async fn test_destructive_reply_is_rejected_verbatim() {
    let h = Harness::new(
        FakeDatabase::company(),
        Some(FakeGenerator::replying("DROP TABLE customers;")),
    );

    let outcome = h.ask("remove all customers", false).await;

    assert_eq!(outcome.source, SqlSource::Generator);
    assert_eq!(outcome.sql, "DROP TABLE customers;");
    let err = outcome.result.unwrap_err();
    assert_eq!(err, TabulaError::Security("Only SELECT queries are allowed".into()));
    assert_eq!(err.to_string(), "SECURITY_ERROR: Only SELECT queries are allowed");
    assert!(h.db.executed().is_empty());
    assert_eq!(h.pipeline.metrics().snapshot().security_rejections, 1);

    // every attempt is recorded, rejected or not
    let history = h.ctx.history().recent(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sql, "DROP TABLE customers;");
}

#[tokio::test]
async fn test_confidential_fallback_uses_reduced_columns() {
    let sql = r#"SELECT "customerName", country, "creditLimit" FROM customers WHERE country = 'France' LIMIT 50"#;
    let h = Harness::new(
        FakeDatabase::company().with_result(
            sql,
            ResultSet::new(
                vec!["customerName".into(), "country".into(), "creditLimit".into()],
                vec![vec![text("Atelier graphique"), text("France"), int(21000)]],
            ),
        ),
        Some(FakeGenerator::failing(GeneratorError::Unavailable("HTTP 503".into()))),
    );

    let outcome = h.ask("List customers from France", true).await;

    assert_eq!(outcome.sql, sql);
    assert_eq!(outcome.result.unwrap().row_count(), 1);
    let prompt = h.generator.as_ref().and_then(|g| g.last_prompt()).unwrap();
    assert!(prompt.contains("CONFIDENTIALITY NOTE"));
    assert!(prompt.contains("TABLE: customers\nCOLUMNS: customerNumber (integer) 🔑"));
}

#[tokio::test]
async fn test_execution_failure_carries_database_message() {
    let h = Harness::new(
        FakeDatabase::company(),
        Some(FakeGenerator::replying("SELECT missing_column FROM offices")),
    );
    let outcome = h.ask("something odd", false).await;
    assert!(matches!(outcome.result, Err(TabulaError::Execution(ref m)) if m.contains("syntax error")));
    assert_eq!(h.pipeline.metrics().snapshot().execution_failures, 1);
}

#[tokio::test]
async fn test_api_rejects_empty_question() {
    let h = Harness::new(FakeDatabase::company(), None);
    let err = api::run_query(
        State(h.state()),
        Json(QueryRequest::new("  ", false)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0.status_code(), 400);
    assert!(h.db.executed().is_empty());
}

#[tokio::test]
async fn test_api_reports_unreachable_database() {
    let h = Harness::new(FakeDatabase::unreachable(), None);
    let err = api::run_query(
        State(h.state()),
        Json(QueryRequest::new("How many employees are there?", false)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err.0, TabulaError::Connectivity(_)));
    assert_eq!(err.0.status_code(), 503);
}

#[tokio::test]
async fn test_api_query_connects_lazily_and_records_history() {
    let h = Harness::new(company_with_low_stock(), None);
    assert!(!h.ctx.is_connected());

    let (status, Json(body)) = api::run_query(
        State(h.state()),
        Json(QueryRequest::new("low stock products", false)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(h.ctx.is_connected());
    assert_eq!(body.source, SqlSource::Fallback);
    assert_eq!(body.row_count, Some(3));
    assert!(body.error.is_none());

    let Json(history) = api::get_history(State(h.state()), Query(HistoryParams { limit: None }))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "low stock products");

    let status = api::clear_history(State(h.state())).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(h.ctx.history().recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api_security_rejection_status() {
    let h = Harness::new(
        FakeDatabase::company(),
        Some(FakeGenerator::replying(r#"UPDATE products SET "buyPrice" = 0"#)),
    );
    let (status, Json(body)) = api::run_query(
        State(h.state()),
        Json(QueryRequest::new("make everything free", false)),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::FORBIDDEN);
    let error = body.error.unwrap();
    assert_eq!(error.code, "SECURITY_ERROR");
    assert!(body.rows.is_none());
}

#[tokio::test]
async fn test_api_schema_and_suggestions() {
    let h = Harness::new(FakeDatabase::company(), None);

    let Json(schema) = api::get_schema(State(h.state())).await.unwrap();
    assert_eq!(schema.tables.len(), 5);
    assert!(schema.schema_text.contains("TABLE: products"));

    let Json(suggestions) = api::get_suggestions(State(h.state())).await;
    assert!(suggestions
        .table_samples
        .contains(&"Show sample data from offices".to_string()));

    let Json(metrics) = api::get_metrics(State(h.state())).await;
    assert_eq!(metrics.catalog_tables, 5);
}

// Requires a running PostgreSQL; skipped without DATABASE_URL
#[tokio::test]
async fn test_live_low_stock_fallback_keeps_column_case() {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => return,
    };

    // one connection, so the temp table shadows any real products table
    let config = PoolConfig {
        url: Some(url),
        max_size: 1,
        ..PoolConfig::default()
    };
    let pool = SqlDbPool::new(&config).unwrap();
    pool.get()
        .await
        .unwrap()
        .batch_execute(
            r#"CREATE TEMP TABLE products ("productName" text, "quantityInStock" smallint);
               INSERT INTO products VALUES ('1968 Ford Mustang', 68), ('1928 Ford Phaeton Deluxe', 15), ('1952 Alpine Renault 1300', 7305);"#,
        )
        .await
        .unwrap();

    let executor = QueryExecutor::new(Arc::new(PgDatabase::new(pool, "public")));
    let sql = FallbackSynthesizer::new().synthesize("low stock products", false);
    let result = executor.execute(&sql).await.unwrap();

    assert_eq!(result.columns, vec!["productName", "quantityInStock"]);
    let quantities: Vec<i64> = result
        .column("quantityInStock")
        .unwrap()
        .into_iter()
        .filter_map(|v| v.as_i64())
        .collect();
    assert_eq!(quantities, vec![15, 68]);
}
