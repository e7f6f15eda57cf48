//! Rule-based SQL synthesis used when the text generator fails
//!
//! Rules are tried in order against the lowercased question and the first
//! match wins. Captured words are restricted to `\w+`, so nothing a caller
//! types can break out of the quoted literal. Mixed-case identifiers are
//! double-quoted since PostgreSQL folds bare identifiers to lower case.

use regex::{Captures, Regex};

const CUSTOMER_COLUMNS_CONFIDENTIAL: &str = r#""customerName", country, "creditLimit""#;
const EMPLOYEE_COLUMNS_CONFIDENTIAL: &str =
    r#""employeeNumber", "firstName", "lastName", "jobTitle", "officeCode""#;

type Render = fn(&Captures<'_>, bool) -> String;

struct Rule {
    pattern: Regex,
    render: Render,
}

pub struct FallbackSynthesizer {
    rules: Vec<Rule>,
}

fn customer_columns(confidential: bool) -> &'static str {
    if confidential {
        CUSTOMER_COLUMNS_CONFIDENTIAL
    } else {
        "*"
    }
}

fn employee_columns(confidential: bool) -> &'static str {
    if confidential {
        EMPLOYEE_COLUMNS_CONFIDENTIAL
    } else {
        "*"
    }
}

/// Map common country spellings, otherwise capitalize the word
fn normalize_word(word: &str) -> String {
    match word.to_lowercase().as_str() {
        "france" | "french" => "France".to_string(),
        "usa" | "us" => "USA".to_string(),
        other => title_case(other),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capture<'a>(caps: &Captures<'a>) -> &'a str {
    caps.get(1).map(|m| m.as_str()).unwrap_or_default()
}

fn customers_by_country(caps: &Captures<'_>, confidential: bool) -> String {
    format!(
        "SELECT {} FROM customers WHERE country = '{}' LIMIT 50",
        customer_columns(confidential),
        normalize_word(capture(caps))
    )
}

impl FallbackSynthesizer {
    pub fn new() -> Self {
        let rule = |pattern: &str, render: Render| Rule {
            pattern: Regex::new(pattern).expect("static regex"),
            render,
        };

        Self {
            rules: vec![
                rule(r"how many.*employee", |_, _| {
                    "SELECT COUNT(*) as total_employees FROM employees".to_string()
                }),
                rule(r"count.*customer", |_, _| {
                    "SELECT COUNT(*) as total_customers FROM customers".to_string()
                }),
                rule(r"list.*customer.*\b(\w+)", customers_by_country),
                rule(r"customer.*from.*\b(\w+)", customers_by_country),
                rule(r"product.*stock.*less than (\d+)", |caps, _| {
                    format!(
                        r#"SELECT "productName", "quantityInStock" FROM products WHERE "quantityInStock" < {}"#,
                        capture(caps)
                    )
                }),
                rule(r"low.*stock", |_, _| {
                    r#"SELECT "productName", "quantityInStock" FROM products WHERE "quantityInStock" < 100 ORDER BY "quantityInStock""#
                        .to_string()
                }),
                rule(r"top.*product.*price", |_, _| {
                    r#"SELECT "productName", "buyPrice" FROM products ORDER BY "buyPrice" DESC LIMIT 10"#.to_string()
                }),
                rule(r"customer.*credit.*high", |_, _| {
                    r#"SELECT "customerName", "creditLimit" FROM customers ORDER BY "creditLimit" DESC LIMIT 10"#
                        .to_string()
                }),
                rule(r"order.*status.*\b(\w+)", |caps, _| {
                    format!(
                        r#"SELECT "orderNumber", "orderDate", status FROM orders WHERE status = '{}'"#,
                        normalize_word(capture(caps))
                    )
                }),
                rule(r"employee.*office", |_, _| {
                    r#"SELECT e."firstName", e."lastName", e."jobTitle", o.city FROM employees e JOIN offices o ON e."officeCode" = o."officeCode""#
                        .to_string()
                }),
            ],
        }
    }

    /// Best-effort SQL for `question`; always returns a SELECT
    pub fn synthesize(&self, question: &str, confidential: bool) -> String {
        let lowered = question.to_lowercase();

        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(&lowered) {
                return (rule.render)(&caps, confidential);
            }
        }

        Self::keyword_default(&lowered, confidential)
    }

    fn keyword_default(lowered: &str, confidential: bool) -> String {
        let mentions = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        if mentions(&["employee", "staff"]) {
            format!("SELECT {} FROM employees LIMIT 20", employee_columns(confidential))
        } else if mentions(&["customer", "client"]) {
            format!("SELECT {} FROM customers LIMIT 20", customer_columns(confidential))
        } else if mentions(&["product"]) {
            r#"SELECT "productName", "productLine", "quantityInStock" FROM products LIMIT 20"#.to_string()
        } else if mentions(&["order"]) {
            r#"SELECT "orderNumber", "orderDate", status FROM orders LIMIT 20"#.to_string()
        } else {
            "SELECT COUNT(*) as count FROM employees".to_string()
        }
    }
}

impl Default for FallbackSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
