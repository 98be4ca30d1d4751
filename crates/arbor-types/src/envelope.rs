//! Axis-aligned bounding extents.
//!
//! Extents are computed outside the core (by a bounds provider) and carried
//! on nodes. Trees only ever union them.

use serde::{Deserialize, Serialize};

/// A 2D axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    /// Build an envelope from two corners in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// A degenerate envelope covering a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Smallest envelope containing both `self` and `other`.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn expand_to_include(&mut self, other: &Envelope) {
        *self = self.union(other);
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Union of optional extents; `None` inputs are skipped.
    pub fn union_all<'a, I>(extents: I) -> Option<Envelope>
    where
        I: IntoIterator<Item = Option<&'a Envelope>>,
    {
        extents
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<Envelope>, e| match acc {
                Some(a) => Some(a.union(e)),
                None => Some(*e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_corners() {
        let e = Envelope::new(5.0, 4.0, 1.0, 2.0);
        assert_eq!(e.min_x, 1.0);
        assert_eq!(e.max_y, 4.0);
        assert_eq!(e.width(), 4.0);
        assert_eq!(e.height(), 2.0);
    }

    #[test]
    fn union_covers_both() {
        let a = Envelope::new(0.0, 0.0, 1.0, 1.0);
        let b = Envelope::new(2.0, -1.0, 3.0, 0.5);
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert_eq!(u, Envelope::new(0.0, -1.0, 3.0, 1.0));
    }

    #[test]
    fn intersection() {
        let a = Envelope::new(0.0, 0.0, 2.0, 2.0);
        assert!(a.intersects(&Envelope::point(1.0, 1.0)));
        assert!(a.intersects(&Envelope::point(2.0, 2.0)));
        assert!(!a.intersects(&Envelope::point(3.0, 1.0)));
    }

    #[test]
    fn union_all_skips_missing() {
        let a = Envelope::point(1.0, 1.0);
        let b = Envelope::point(-1.0, 3.0);
        assert_eq!(Envelope::union_all([None, None]), None);
        assert_eq!(
            Envelope::union_all([Some(&a), None, Some(&b)]),
            Some(Envelope::new(-1.0, 1.0, 1.0, 3.0))
        );
    }
}
