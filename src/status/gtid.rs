//! GTID set comparison
//!
//! Containment is evaluated by the server with `GTID_SUBSET()` so the
//! result always matches the engine's own replication semantics.

use async_trait::async_trait;
use tracing::debug;

use crate::protocol::quote_literal;

use super::access::QueryExecutor;
use super::error::QueryError;

/// How GTID set `a` relates to GTID set `b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtidRelation {
    Equal,
    /// `a` is a strict subset of `b`
    Subset,
    /// `a` is a strict superset of `b`
    Superset,
    /// Neither contains the other: the histories diverged
    Incomparable,
}

impl GtidRelation {
    pub fn is_comparable(self) -> bool {
        self != GtidRelation::Incomparable
    }

    fn from_containment(a_in_b: bool, b_in_a: bool) -> Self {
        match (a_in_b, b_in_a) {
            (true, true) => GtidRelation::Equal,
            (true, false) => GtidRelation::Subset,
            (false, true) => GtidRelation::Superset,
            (false, false) => GtidRelation::Incomparable,
        }
    }
}

/// Capability to compare two GTID sets
#[async_trait]
pub trait GtidComparator: Send {
    async fn compare_gtid_sets(&mut self, a: &str, b: &str) -> Result<GtidRelation, QueryError>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> GtidComparator for E {
    async fn compare_gtid_sets(&mut self, a: &str, b: &str) -> Result<GtidRelation, QueryError> {
        if let Some(relation) = compare_trivially(a, b) {
            return Ok(relation);
        }

        let sql = format!(
            "SELECT GTID_SUBSET({a}, {b}), GTID_SUBSET({b}, {a})",
            a = quote_literal(a),
            b = quote_literal(b),
        );
        let result = self.query(&sql).await?;
        let row = result
            .first_row()
            .ok_or_else(|| QueryError::Unexpected("GTID_SUBSET returned no rows".into()))?;

        let a_in_b = parse_flag(row.get(0))?;
        let b_in_a = parse_flag(row.get(1))?;
        let relation = GtidRelation::from_containment(a_in_b, b_in_a);

        debug!(a = %a, b = %b, relation = ?relation, "Compared GTID sets");
        Ok(relation)
    }
}

/// Relations that need no server round trip. Only the empty set qualifies;
/// any non-empty set is validated by the engine.
fn compare_trivially(a: &str, b: &str) -> Option<GtidRelation> {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (true, true) => Some(GtidRelation::Equal),
        (true, false) => Some(GtidRelation::Subset),
        (false, true) => Some(GtidRelation::Superset),
        (false, false) => None,
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool, QueryError> {
    match value {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        Some(other) => Err(QueryError::Unexpected(format!(
            "GTID_SUBSET returned {:?}",
            other
        ))),
        None => Err(QueryError::Unexpected("GTID_SUBSET returned NULL".into())),
    }
}
