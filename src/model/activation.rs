//! Dense muscle activation vectors and exercise overlap

use ndarray::{Array1, Array2, ArrayView1};

use crate::catalog::Catalog;

/// Activation matrix (exercises × muscles) and its Gram matrix.
///
/// Built once per solve from a validated catalog.
#[derive(Debug, Clone)]
pub struct ActivationModel {
    vectors: Array2<f64>,
    overlap: Array2<f64>,
}

impl ActivationModel {
    /// Coefficients below the catalog's activation floor are dropped
    pub fn new(catalog: &Catalog) -> Self {
        let floor = catalog.tuning.activation_floor;
        let mut vectors = Array2::<f64>::zeros((catalog.exercises.len(), catalog.muscles.len()));

        for (e, exercise) in catalog.exercises.iter().enumerate() {
            for (muscle, &value) in &exercise.activation {
                if value < floor {
                    continue;
                }
                if let Some(m) = catalog.muscle_index(muscle) {
                    vectors[[e, m]] = value;
                }
            }
        }

        let overlap = vectors.dot(&vectors.t());
        Self { vectors, overlap }
    }

    pub fn exercise_count(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn muscle_count(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn activation(&self, exercise: usize, muscle: usize) -> f64 {
        self.vectors[[exercise, muscle]]
    }

    pub fn vector(&self, exercise: usize) -> ArrayView1<'_, f64> {
        self.vectors.row(exercise)
    }

    /// Dot product of two exercises' activation vectors
    pub fn overlap(&self, a: usize, b: usize) -> f64 {
        self.overlap[[a, b]]
    }

    /// Combined stimulus of a superset
    pub fn pair_vector(&self, pair: (usize, usize)) -> Array1<f64> {
        &self.vector(pair.0) + &self.vector(pair.1)
    }

    /// Muscular overlap of two supersets trained on the same day
    pub fn pair_overlap(&self, p: (usize, usize), q: (usize, usize)) -> f64 {
        self.pair_vector(p).dot(&self.pair_vector(q))
    }

    /// Per-muscle volume of `volume[e]` sets of each exercise
    pub fn coverage(&self, volume: &Array1<f64>) -> Array1<f64> {
        self.vectors.t().dot(volume)
    }
}
