//! Selection of the most advanced instance

use tracing::{debug, warn};

use super::error::StatusError;
use super::gtid::{GtidComparator, GtidRelation};
use super::types::InstanceStatus;

/// Ordinal of the instance whose executed GTID set contains all others.
///
/// Every instance must have a primary status and every pair of GTID sets
/// must be comparable; otherwise the result is `cannot compare gtids`.
/// Equal sets resolve to the lowest ordinal.
pub async fn latest_instance<C>(
    comparator: &mut C,
    statuses: &[InstanceStatus],
) -> Result<usize, StatusError>
where
    C: GtidComparator + ?Sized,
{
    let mut gtids = Vec::with_capacity(statuses.len());
    for (ordinal, status) in statuses.iter().enumerate() {
        match status.executed_gtid_set() {
            Some(gtid) => gtids.push(gtid),
            None => {
                warn!(ordinal = ordinal, "Instance has no primary status");
                return Err(StatusError::CannotCompareGtids);
            }
        }
    }

    if gtids.is_empty() {
        return Err(StatusError::CannotCompareGtids);
    }

    let mut latest = 0;
    for (ordinal, gtid) in gtids.iter().enumerate().skip(1) {
        let relation = comparator
            .compare_gtid_sets(gtids[latest], gtid)
            .await
            .map_err(|source| StatusError::GtidComparison { source })?;

        match relation {
            GtidRelation::Equal | GtidRelation::Superset => {}
            GtidRelation::Subset => latest = ordinal,
            GtidRelation::Incomparable => {
                warn!(
                    latest = latest,
                    ordinal = ordinal,
                    latest_gtid = %gtids[latest],
                    gtid = %gtid,
                    "GTID sets diverged"
                );
                return Err(StatusError::CannotCompareGtids);
            }
        }
    }

    debug!(latest = latest, "Resolved latest instance");
    Ok(latest)
}
