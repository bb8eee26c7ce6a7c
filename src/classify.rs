//! Box classifier: splits a flat detector output into per-class sequences.

use serde::{Deserialize, Serialize};

use crate::detect::{Detection, ObjectClass, RawDetection};

/// Detections of one image, partitioned by class.
///
/// Each sequence keeps detector emission order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    pub riders: Vec<Detection>,
    pub helmets: Vec<Detection>,
    pub plates: Vec<Detection>,
}

impl DetectionSet {
    /// Partitions raw detections. Unknown labels are dropped.
    pub fn classify<I>(detections: I) -> Self
    where
        I: IntoIterator<Item = RawDetection>,
    {
        let mut set = Self::default();
        for raw in detections {
            let Some(class) = ObjectClass::from_label(&raw.label) else {
                log::debug!("dropping detection with unknown label '{}'", raw.label);
                continue;
            };
            set.push(Detection {
                bbox: raw.bbox,
                class,
                confidence: raw.confidence,
            });
        }
        set
    }

    pub fn push(&mut self, detection: Detection) {
        match detection.class {
            ObjectClass::Rider => self.riders.push(detection),
            ObjectClass::Helmet => self.helmets.push(detection),
            ObjectClass::Plate => self.plates.push(detection),
        }
    }

    pub fn len(&self) -> usize {
        self.riders.len() + self.helmets.len() + self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All detections in overlay drawing order: riders, helmets, plates.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.riders
            .iter()
            .chain(self.helmets.iter())
            .chain(self.plates.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn raw(x: i32, label: &str) -> RawDetection {
        RawDetection::new(BoundingBox::new(x, 0, x + 10, 10), label, 0.5)
    }

    #[test]
    fn partitions_preserving_relative_order() {
        let set = DetectionSet::classify(vec![
            raw(0, "rider"),
            raw(1, "plate"),
            raw(2, "helmet"),
            raw(3, "rider"),
            raw(4, "plate"),
        ]);
        let xs = |v: &[Detection]| v.iter().map(|d| d.bbox.x1()).collect::<Vec<_>>();
        assert_eq!(xs(&set.riders), vec![0, 3]);
        assert_eq!(xs(&set.helmets), vec![2]);
        assert_eq!(xs(&set.plates), vec![1, 4]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn unknown_labels_are_dropped_silently() {
        let set = DetectionSet::classify(vec![raw(0, "car"), raw(1, "class_7"), raw(2, "rider")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.riders[0].class, ObjectClass::Rider);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let set = DetectionSet::classify(Vec::new());
        assert!(set.is_empty());
    }

    #[test]
    fn iter_follows_drawing_order() {
        let set = DetectionSet::classify(vec![raw(0, "plate"), raw(1, "helmet"), raw(2, "rider")]);
        let classes: Vec<ObjectClass> = set.iter().map(|d| d.class).collect();
        assert_eq!(
            classes,
            vec![ObjectClass::Rider, ObjectClass::Helmet, ObjectClass::Plate]
        );
    }
}
