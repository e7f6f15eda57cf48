//! Table statistics, headline figures and suggested questions
//!
//! Every statement issued here goes through the same security gate as
//! pipeline queries.

use serde::Serialize;
use std::collections::BTreeMap;
use tabula_core::{Result, SchemaCatalog, TabulaError};
use tabula_sqldb::quote_ident;
use tracing::{debug, instrument};

use crate::executor::QueryExecutor;

pub const CONNECT_HINT: &str = "Connect to database to see insights";

const HEADLINES: [(&str, &str); 5] = [
    ("employees", "Total Employees"),
    ("customers", "Total Customers"),
    ("products", "Products in Catalog"),
    ("orders", "Total Orders"),
    ("offices", "Office Locations"),
];

const QUICK_ACTIONS: [&str; 10] = [
    "Count total employees by office",
    "List top 10 customers by credit limit",
    "Products with quantity less than 50",
    "Orders by status this month",
    "Employee distribution by job title",
    "Sales performance by product line",
    "Customer count by country",
    "Average order value",
    "Products never ordered",
    "Monthly sales trend",
];

const ANALYTICS: [(&str, &str); 6] = [
    ("Sales Dashboard", "Show monthly sales trend for the last 6 months with product line breakdown"),
    ("Employee Analytics", "Show employee count by office location and job title with percentages"),
    ("Financial Overview", "Show total payments by customer and credit limit utilization"),
    ("Inventory Analysis", "Show products by vendor with stock levels and reorder recommendations"),
    ("Geographic Analysis", "Show customer distribution by country and average credit limit"),
    ("Operations Metrics", "Show order fulfillment times and status distribution"),
];

async fn count_rows(executor: &QueryExecutor, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    let result = executor.execute(&sql).await?;
    result
        .scalar()
        .and_then(|v| v.as_i64())
        .ok_or_else(|| TabulaError::Execution(format!("no row count for {}", table)))
}

/// Row count per catalog table; any failure yields an empty map
#[instrument(skip_all, fields(tables = catalog.len()))]
pub async fn table_stats(executor: &QueryExecutor, catalog: &SchemaCatalog) -> BTreeMap<String, i64> {
    let mut stats = BTreeMap::new();
    for table in catalog.table_names() {
        match count_rows(executor, table).await {
            Ok(count) => {
                stats.insert(table.to_string(), count);
            }
            Err(e) => {
                debug!(table, error = %e, "Table statistics unavailable");
                return BTreeMap::new();
            }
        }
    }
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub label: &'static str,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickInsights {
    pub figures: Vec<Insight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Headline counts; a single connect hint if any of them fails
#[instrument(skip_all)]
pub async fn quick_insights(executor: &QueryExecutor) -> QuickInsights {
    let mut figures = Vec::with_capacity(HEADLINES.len());
    for (table, label) in HEADLINES {
        match count_rows(executor, table).await {
            Ok(value) => figures.push(Insight { label, value }),
            Err(e) => {
                debug!(table, error = %e, "Quick insights unavailable");
                return QuickInsights {
                    figures: Vec::new(),
                    hint: Some(CONNECT_HINT),
                };
            }
        }
    }
    QuickInsights {
        figures,
        hint: None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsPrompt {
    pub title: &'static str,
    pub question: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub quick_actions: Vec<&'static str>,
    pub analytics: Vec<AnalyticsPrompt>,
    pub table_samples: Vec<String>,
}

pub fn suggestions(catalog: &SchemaCatalog) -> Suggestions {
    Suggestions {
        quick_actions: QUICK_ACTIONS.to_vec(),
        analytics: ANALYTICS
            .iter()
            .map(|&(title, question)| AnalyticsPrompt { title, question })
            .collect(),
        table_samples: catalog
            .table_names()
            .map(|t| format!("Show sample data from {}", t))
            .collect(),
    }
}
