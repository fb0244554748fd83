//! Solved weekly plan - the serializable result of one pipeline run

use anyhow::{Context, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::model::schedule::DaySchedule;
use crate::model::selection::Selection;
use crate::model::{Planner, SolveStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseCount {
    pub exercise: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superset {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTable {
    pub days: Vec<Vec<Superset>>,
    pub penalty: f64,
    pub conflicts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPlan {
    pub id: String,
    pub sets_per_instance: f64,
    /// Non-zero counts, largest first
    pub counts: Vec<ExerciseCount>,
    /// One entry per superset instance
    pub pairs: Vec<Superset>,
    pub schedule: DayTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleCoverage {
    pub muscle: String,
    pub target: f64,
    pub covered: f64,
}

impl MuscleCoverage {
    /// Signed gap, positive when over target
    pub fn deviation(&self) -> f64 {
        self.covered - self.target
    }

    pub fn shortfall(&self) -> f64 {
        (self.target - self.covered).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub status: SolveStatus,
    pub objective_kind: String,
    pub objective: f64,
    pub categories: Vec<CategoryPlan>,
    pub coverage: Vec<MuscleCoverage>,
}

/// Day label: category plus A, B, C...
pub fn day_label(category: &str, day: usize) -> String {
    let letter = u8::try_from(day)
        .ok()
        .and_then(|d| b'A'.checked_add(d))
        .filter(u8::is_ascii_uppercase)
        .map(char::from);
    match letter {
        Some(letter) => format!("{category} {letter}"),
        None => format!("{category} {}", day + 1),
    }
}

impl Plan {
    /// Name the solver output after the catalog entries it indexes
    pub fn assemble(
        planner: &Planner<'_>,
        objective_kind: &str,
        status: SolveStatus,
        selection: &Selection,
        schedules: &[DaySchedule],
    ) -> Self {
        let catalog = planner.catalog();
        let name = |e: usize| catalog.exercises[e].name.clone();
        let superset = |(i, j): (usize, usize)| Superset {
            first: name(i),
            second: name(j),
        };

        let mut volume = Array1::<f64>::zeros(catalog.exercises.len());
        let mut categories = Vec::with_capacity(catalog.categories.len());
        for (c, (category, schedule)) in catalog.categories.iter().zip(schedules).enumerate() {
            let mut counts: Vec<ExerciseCount> = Vec::new();
            for (e, &count) in selection.counts[c].iter().enumerate() {
                volume[e] += f64::from(count) * category.sets_per_instance;
                if count > 0 {
                    counts.push(ExerciseCount {
                        exercise: name(e),
                        count,
                    });
                }
            }
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.exercise.cmp(&b.exercise)));

            categories.push(CategoryPlan {
                id: category.id.clone(),
                sets_per_instance: category.sets_per_instance,
                counts,
                pairs: selection.expanded_pairs(c).into_iter().map(superset).collect(),
                schedule: DayTable {
                    days: schedule
                        .days
                        .iter()
                        .map(|day| day.iter().copied().map(superset).collect())
                        .collect(),
                    penalty: schedule.penalty,
                    conflicts: schedule.conflicts,
                },
            });
        }

        let covered = planner.activation().coverage(&volume);
        let coverage = catalog
            .muscles
            .iter()
            .zip(covered.iter())
            .map(|(muscle, &covered)| MuscleCoverage {
                muscle: muscle.id.clone(),
                target: muscle.target,
                covered,
            })
            .collect();

        Self {
            status,
            objective_kind: objective_kind.to_string(),
            objective: selection.objective,
            categories,
            coverage,
        }
    }

    pub fn total_shortfall(&self) -> f64 {
        self.coverage.iter().map(MuscleCoverage::shortfall).sum()
    }

    pub fn total_conflicts(&self) -> usize {
        self.categories.iter().map(|c| c.schedule.conflicts).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize plan")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse stored plan")
    }
}
