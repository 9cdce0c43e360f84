//! Submission collaborator.

use crate::query::Query;

/// Receives the accumulated query when the final step is confirmed.
///
/// Called exactly once per completed procedure, before the tree is reset,
/// with a copy the submitter may keep.
pub trait Submitter: Send + Sync {
    /// Hand the finished query to the creation service.
    fn submit(&self, query: Query);
}

impl<F> Submitter for F
where
    F: Fn(Query) + Send + Sync,
{
    fn submit(&self, query: Query) {
        self(query)
    }
}
