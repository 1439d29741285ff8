//! Business mutations: the caller's unit of work that commits together with
//! its audit record.

use std::future::Future;

use crate::error::WriteError;

/// A business-side change applied inside the append transaction.
///
/// `apply` runs after `BEGIN IMMEDIATE` and before the audit row is written.
/// Returning an error, or the surrounding future being dropped, rolls back
/// both the mutation and the audit record.
///
/// ```no_run
/// use ledger_store::{BusinessMutation, WriteError};
///
/// struct MarkPaid { invoice: String }
///
/// impl BusinessMutation for MarkPaid {
///     async fn apply(self, tx: &libsql::Transaction) -> Result<(), WriteError> {
///         let n = tx
///             .execute("UPDATE invoices SET status = 'paid' WHERE id = ?1", [self.invoice])
///             .await?;
///         if n == 0 {
///             return Err(WriteError::mutation("invoice not found"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait BusinessMutation: Send {
    fn apply(self, tx: &libsql::Transaction)
    -> impl Future<Output = Result<(), WriteError>> + Send;
}

/// No business change: the append writes only the audit record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMutation;

impl BusinessMutation for NoMutation {
    async fn apply(self, _tx: &libsql::Transaction) -> Result<(), WriteError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Statement {
    sql: String,
    params: Vec<libsql::Value>,
    expected_rows: Option<u64>,
}

/// One or more parameterized statements run in order.
///
/// Each statement may declare how many rows it must affect; a mismatch
/// rejects the whole unit.
#[derive(Debug, Clone, Default)]
pub struct SqlMutation {
    statements: Vec<Statement>,
}

impl SqlMutation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement.
    #[must_use]
    pub fn statement(mut self, sql: impl Into<String>, params: Vec<libsql::Value>) -> Self {
        self.statements.push(Statement {
            sql: sql.into(),
            params,
            expected_rows: None,
        });
        self
    }

    /// Require the most recently added statement to affect exactly `n` rows.
    #[must_use]
    pub fn expect_rows(mut self, n: u64) -> Self {
        if let Some(last) = self.statements.last_mut() {
            last.expected_rows = Some(n);
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl BusinessMutation for SqlMutation {
    async fn apply(self, tx: &libsql::Transaction) -> Result<(), WriteError> {
        for (i, stmt) in self.statements.into_iter().enumerate() {
            let affected = tx
                .execute(&stmt.sql, libsql::params_from_iter(stmt.params))
                .await?;
            if let Some(expected) = stmt.expected_rows {
                if affected != expected {
                    return Err(WriteError::mutation(format!(
                        "statement {i} affected {affected} rows, expected {expected}"
                    )));
                }
            }
        }
        Ok(())
    }
}
