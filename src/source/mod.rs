//! Process snapshot sources
//!
//! A source yields the statement text of every session that is executing
//! something at the moment of the call. The sampling loop only sees
//! [`ProcessSource`], so tests drive it with scripted snapshots and the
//! binary drives it with [`MySqlProcessList`].

mod mysql;

pub use mysql::{MySqlProcessList, PROCESSLIST_QUERY};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while taking a snapshot
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: mysql_async::Error,
    },

    #[error("process list query failed: {0}")]
    Query(#[from] mysql_async::Error),

    #[error("unknown process list columns: {0:?}")]
    UnexpectedColumns(Vec<String>),

    #[error("source already closed")]
    Closed,
}

impl SourceError {
    /// Transient errors cost one round; everything else stops the profiler.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Query(_))
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Something that can list the statements currently in flight.
#[async_trait]
pub trait ProcessSource: Send {
    /// Take one snapshot of in-flight statement texts, in server order.
    async fn snapshot(&mut self) -> SourceResult<Vec<String>>;

    /// Release the underlying connection. Default does nothing.
    async fn close(&mut self) -> SourceResult<()> {
        Ok(())
    }
}

/// Keep the statements worth counting.
///
/// Sessions with no statement, an empty one, or the snapshot query itself
/// are dropped. Order is preserved.
pub fn select_statements<I>(infos: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    infos
        .into_iter()
        .flatten()
        .filter(|info| !info.is_empty() && info != PROCESSLIST_QUERY)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_drops_null_empty_and_self() {
        let infos = vec![
            Some("SELECT 1".to_string()),
            None,
            Some(String::new()),
            Some(PROCESSLIST_QUERY.to_string()),
            Some("UPDATE t SET a = 2".to_string()),
        ];
        assert_eq!(
            select_statements(infos),
            vec!["SELECT 1".to_string(), "UPDATE t SET a = 2".to_string()]
        );
    }

    #[test]
    fn test_select_keeps_duplicates_in_order() {
        let infos = vec![
            Some("B".to_string()),
            Some("A".to_string()),
            Some("B".to_string()),
        ];
        assert_eq!(select_statements(infos), vec!["B", "A", "B"]);
    }

    #[test]
    fn test_error_classification() {
        let schema = SourceError::UnexpectedColumns(vec!["Id".into()]);
        assert!(!schema.is_transient());
        assert!(schema.to_string().contains("Id"));
    }
}
