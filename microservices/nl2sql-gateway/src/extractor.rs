//! Pull a single SELECT statement out of free-form generator text

use regex::Regex;

pub struct SqlExtractor {
    fence: Regex,
    select: Regex,
}

impl SqlExtractor {
    pub fn new() -> Self {
        Self {
            fence: Regex::new(r"(?i)```(?:sql)?").expect("static regex"),
            select: Regex::new(r"(?is)\bSELECT\s[^;]*").expect("static regex"),
        }
    }

    /// First SELECT statement in `raw`, terminated with `;`.
    ///
    /// Text without a SELECT comes back trimmed and otherwise untouched so
    /// the security gate can reject it.
    pub fn extract(&self, raw: &str) -> String {
        let unfenced = self.fence.replace_all(raw, "");

        match self.select.find(&unfenced) {
            Some(m) => {
                let mut sql = m.as_str().trim().to_string();
                if !sql.ends_with(';') {
                    sql.push(';');
                }
                sql
            }
            None => unfenced.trim().to_string(),
        }
    }
}

impl Default for SqlExtractor {
    fn default() -> Self {
        Self::new()
    }
}
