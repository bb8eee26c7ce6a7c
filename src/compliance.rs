//! Helmet compliance per rider.
//!
//! A rider is compliant when the top-left corner of at least one helmet box
//! lies strictly inside the rider box. Only that single point is tested; box
//! overlap is not considered.

use serde::{Deserialize, Serialize};

use crate::detect::Detection;
use crate::geometry::contains;

/// Verdict for the rider at `rider_index` in the rider sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub rider_index: usize,
    pub has_helmet: bool,
}

/// True when some helmet's top-left corner is strictly inside the rider box.
pub fn rider_has_helmet(rider: &Detection, helmets: &[Detection]) -> bool {
    helmets.iter().any(|helmet| {
        let (hx, hy) = helmet.bbox.top_left();
        contains(&rider.bbox, hx, hy)
    })
}

/// One verdict per rider, in rider order.
pub fn evaluate(riders: &[Detection], helmets: &[Detection]) -> Vec<ComplianceVerdict> {
    riders
        .iter()
        .enumerate()
        .map(|(rider_index, rider)| {
            let has_helmet = rider_has_helmet(rider, helmets);
            log::debug!("rider {} has_helmet={}", rider_index, has_helmet);
            ComplianceVerdict {
                rider_index,
                has_helmet,
            }
        })
        .collect()
}
