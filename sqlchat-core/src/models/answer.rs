use super::entry::TableRows;

/// Structured answer to one question, as produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAnswer {
    pub sql_query: String,
    pub explanation: String,
    pub result_rows: TableRows,
    /// Column names, when the service reports them.
    pub columns: Option<Vec<String>>,
}

impl RemoteAnswer {
    pub fn new(
        sql_query: impl Into<String>,
        explanation: impl Into<String>,
        result_rows: TableRows,
    ) -> Self {
        Self {
            sql_query: sql_query.into(),
            explanation: explanation.into(),
            result_rows,
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}
