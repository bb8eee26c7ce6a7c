//! Nearest-plate association for riders without a helmet.
//!
//! Plates are never consumed: several riders may map to the same plate.

use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceVerdict;
use crate::detect::Detection;
use crate::geometry::{centroid, distance};

/// Plate chosen for a non-compliant rider, by index into the plate sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub rider_index: usize,
    pub plate_index: Option<usize>,
}

/// Index of the plate whose centroid is closest to the rider's centroid.
///
/// Ties keep the earliest plate. `None` iff `plates` is empty.
pub fn nearest_plate(rider: &Detection, plates: &[Detection]) -> Option<usize> {
    let origin = centroid(&rider.bbox);
    let mut best: Option<(usize, f64)> = None;
    for (idx, plate) in plates.iter().enumerate() {
        let d = distance(origin, centroid(&plate.bbox));
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((idx, d)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Associations for every non-compliant rider, in rider order.
pub fn associate(
    riders: &[Detection],
    verdicts: &[ComplianceVerdict],
    plates: &[Detection],
) -> Vec<Association> {
    verdicts
        .iter()
        .filter(|v| !v.has_helmet)
        .filter_map(|v| {
            let rider = riders.get(v.rider_index)?;
            Some(Association {
                rider_index: v.rider_index,
                plate_index: nearest_plate(rider, plates),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::evaluate;
    use crate::detect::ObjectClass;
    use crate::geometry::BoundingBox;

    fn det(class: ObjectClass, x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            class,
            confidence: 0.8,
        }
    }

    #[test]
    fn picks_the_centroid_nearest_plate() {
        // Rider centroid (50, 100); plate A centroid (60, 110); plate B (500, 500).
        let rider = det(ObjectClass::Rider, 0, 0, 100, 200);
        let plate_b = det(ObjectClass::Plate, 490, 490, 510, 510);
        let plate_a = det(ObjectClass::Plate, 50, 100, 70, 120);
        assert_eq!(nearest_plate(&rider, &[plate_b, plate_a]), Some(1));
        assert_eq!(nearest_plate(&rider, &[plate_a, plate_b]), Some(0));
    }

    #[test]
    fn ties_keep_the_first_plate() {
        let rider = det(ObjectClass::Rider, 0, 0, 100, 100);
        // Both centroids are 50 px from (50, 50).
        let left = det(ObjectClass::Plate, -10, 40, 10, 60);
        let right = det(ObjectClass::Plate, 90, 40, 110, 60);
        assert_eq!(nearest_plate(&rider, &[left, right]), Some(0));
        assert_eq!(nearest_plate(&rider, &[right, left]), Some(0));
    }

    #[test]
    fn no_plates_means_no_association() {
        let rider = det(ObjectClass::Rider, 0, 0, 100, 100);
        assert_eq!(nearest_plate(&rider, &[]), None);
    }

    #[test]
    fn plates_are_shared_between_riders() {
        let riders = [
            det(ObjectClass::Rider, 0, 0, 100, 200),
            det(ObjectClass::Rider, 20, 0, 120, 200),
            det(ObjectClass::Rider, 1000, 0, 1100, 200),
        ];
        let helmets = [det(ObjectClass::Helmet, 1010, 10, 1030, 30)];
        let plates = [det(ObjectClass::Plate, 60, 180, 90, 200)];
        let verdicts = evaluate(&riders, &helmets);
        let assoc = associate(&riders, &verdicts, &plates);
        assert_eq!(
            assoc,
            vec![
                Association {
                    rider_index: 0,
                    plate_index: Some(0)
                },
                Association {
                    rider_index: 1,
                    plate_index: Some(0)
                },
            ]
        );
    }
}
