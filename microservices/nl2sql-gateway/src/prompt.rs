//! Generation prompt assembly

const CONFIDENTIALITY_NOTE: &str = "\
CONFIDENTIALITY NOTE: Do NOT include sensitive personal information like:
- Email addresses
- Phone numbers
- Full addresses
- Salary information
- Personal identification numbers
Use aggregated data and general information only.";

/// Target dialect named in the header; matches the executing database
const DIALECT: &str = "PostgreSQL";

const RULES: &str = r#"RULES:
- Generate ONLY the SQL query, no explanations
- Wrap every mixed-case table or column name in double quotes, e.g. "productName"
- Use proper JOINs for related tables
- Add WHERE clauses for filtering
- Use ORDER BY when sorting is needed
- Include LIMIT for large tables
- Use aggregate functions (COUNT, SUM, AVG) when appropriate
- Handle dates with CURRENT_DATE and INTERVAL arithmetic
- Use table aliases for readability
- Return only the SQL query, nothing else"#;

const RELATIONSHIPS: &str = r#"TABLE RELATIONSHIPS:
- employees."officeCode" → offices."officeCode"
- customers."salesRepEmployeeNumber" → employees."employeeNumber"
- orders."customerNumber" → customers."customerNumber"
- orderdetails."orderNumber" → orders."orderNumber"
- orderdetails."productCode" → products."productCode"
- products."productLine" → productlines."productLine""#;

const EXAMPLES: &str = r#"EXAMPLES:
Question: "How many customers from France?"
SQL: SELECT COUNT(*) as customer_count FROM customers WHERE country = 'France'

Question: "Top 5 products by profit margin"
SQL: SELECT "productName", ("MSRP" - "buyPrice") as profit_margin FROM products ORDER BY profit_margin DESC LIMIT 5"#;

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Deterministic: identical inputs give byte-identical prompts
    pub fn build(&self, question: &str, schema_text: &str, confidential: bool) -> String {
        let mut prompt = format!(
            "You are an expert SQL query generator for {dialect}. Given this database schema and question, \
             generate ONLY a {dialect} SELECT query.\n\n\
             DATABASE SCHEMA:\n{schema}\n\n\
             QUESTION: {question}\n\n",
            dialect = DIALECT,
            schema = schema_text,
            question = question,
        );

        if confidential {
            prompt.push_str(CONFIDENTIALITY_NOTE);
            prompt.push_str("\n\n");
        }

        for block in [RULES, RELATIONSHIPS, EXAMPLES] {
            prompt.push_str(block);
            prompt.push_str("\n\n");
        }

        prompt.push_str("Now generate the SQL for: ");
        prompt.push_str(question);
        prompt.push('\n');
        prompt
    }
}
