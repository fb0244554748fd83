//! Superset compatibility gate

use std::collections::HashSet;

use tracing::debug;

use super::activation::ActivationModel;
use crate::catalog::Catalog;

/// Slack on the overlap threshold; overlap equal to the threshold passes
pub const OVERLAP_EPSILON: f64 = 1e-9;

/// Whether exercises `a` and `b` may form a superset on a `category` day.
///
/// Requires overlap within the threshold (inclusive), no shared equipment
/// and both exercises legal in the category.
pub fn compatible(catalog: &Catalog, activation: &ActivationModel, a: usize, b: usize, category: &str) -> bool {
    let (first, second) = (&catalog.exercises[a], &catalog.exercises[b]);
    activation.overlap(a, b) <= catalog.tuning.overlap_threshold + OVERLAP_EPSILON
        && !first.shares_equipment(second)
        && first.allowed_in(category)
        && second.allowed_in(category)
}

/// Allowed `(i, j)` pairs with `i <= j`, precomputed per category
#[derive(Debug, Clone)]
pub struct CompatibilityGate {
    pairs: Vec<Vec<(usize, usize)>>,
    lookup: Vec<HashSet<(usize, usize)>>,
}

impl CompatibilityGate {
    pub fn new(catalog: &Catalog, activation: &ActivationModel) -> Self {
        let count = catalog.exercises.len();
        let mut pairs = Vec::with_capacity(catalog.categories.len());

        for category in &catalog.categories {
            let allowed: Vec<(usize, usize)> = (0..count)
                .flat_map(|i| (i..count).map(move |j| (i, j)))
                .filter(|&(i, j)| compatible(catalog, activation, i, j, &category.id))
                .collect();
            debug!(category = %category.id, pairs = allowed.len(), "Compatible supersets");
            pairs.push(allowed);
        }

        let lookup = pairs
            .iter()
            .map(|allowed| allowed.iter().copied().collect())
            .collect();
        Self { pairs, lookup }
    }

    /// Allowed pairs of the category at `category` index, in index order
    pub fn pairs(&self, category: usize) -> &[(usize, usize)] {
        &self.pairs[category]
    }

    /// Order-insensitive membership test
    pub fn allowed(&self, a: usize, b: usize, category: usize) -> bool {
        self.lookup[category].contains(&(a.min(b), a.max(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::catalog::{Muscle, Tuning};

    fn catalog(threshold: f64) -> Catalog {
        Catalog {
            muscles: vec![
                Muscle { id: "chest".to_string(), target: 10.0 },
                Muscle { id: "back".to_string(), target: 10.0 },
                Muscle { id: "legs".to_string(), target: 10.0 },
            ],
            equipment: vec!["cable".to_string()],
            categories: vec![category("upper", 1, 1), category("lower", 1, 1)],
            exercises: vec![
                // 0.5 · 0.4 = 0.2 overlap with `row`
                exercise("press", &["upper"], &[("chest", 1.0), ("back", 0.5)], &[]),
                exercise("row", &["upper"], &[("back", 0.4)], &[]),
                exercise("fly", &["upper"], &[("chest", 0.3)], &["cable"]),
                exercise("pulldown", &["upper"], &[("back", 0.3)], &["cable"]),
                exercise("squat", &["lower"], &[("legs", 1.0)], &[]),
                exercise("shrug", &["upper", "lower"], &[("back", 0.2)], &[]),
            ],
            tuning: Tuning {
                overlap_threshold: threshold,
                ..Tuning::default()
            },
        }
    }

    fn gate(catalog: &Catalog) -> CompatibilityGate {
        CompatibilityGate::new(catalog, &ActivationModel::new(catalog))
    }

    #[test]
    fn test_overlap_equal_to_threshold_is_allowed() {
        let catalog = catalog(0.2);
        let gate = gate(&catalog);
        assert!(gate.allowed(0, 1, 0));
        assert!(gate.allowed(1, 0, 0));
    }

    #[test]
    fn test_overlap_above_threshold_is_rejected() {
        let catalog = catalog(0.2 - 1e-6);
        let gate = gate(&catalog);
        assert!(!gate.allowed(0, 1, 0));
    }

    #[test]
    fn test_shared_equipment_never_pairs() {
        let catalog = catalog(10.0);
        let gate = gate(&catalog);
        assert!(!gate.allowed(2, 3, 0));
        // equipment conflicts with itself
        assert!(!gate.allowed(2, 2, 0));
        assert!(gate.allowed(0, 2, 0));
    }

    #[test]
    fn test_category_legality() {
        let catalog = catalog(10.0);
        let gate = gate(&catalog);
        assert!(!gate.allowed(0, 4, 0));
        assert!(!gate.allowed(0, 4, 1));
        assert!(gate.allowed(4, 5, 1));
        assert!(gate.allowed(0, 5, 0));
        assert!(!gate.allowed(0, 5, 1));
    }

    #[test]
    fn test_self_pair_needs_low_self_overlap() {
        let catalog = catalog(0.2);
        let gate = gate(&catalog);
        // 0.2² = 0.04
        assert!(gate.allowed(5, 5, 0));
        // 0.4² = 0.16
        assert!(gate.allowed(1, 1, 0));
        // 1.0² + 0.5²
        assert!(!gate.allowed(0, 0, 0));
    }

    #[test]
    fn test_pairs_are_ordered_and_match_predicate() {
        let catalog = catalog(0.2);
        let activation = ActivationModel::new(&catalog);
        let gate = CompatibilityGate::new(&catalog, &activation);
        for (c, category) in catalog.categories.iter().enumerate() {
            for &(i, j) in gate.pairs(c) {
                assert!(i <= j);
                assert!(compatible(&catalog, &activation, i, j, &category.id));
            }
        }
        assert!(gate.pairs(1).contains(&(4, 5)));
    }
}
