//! Optimization pipeline: activation model, compatibility gate, exercise
//! selection and day assignment.

pub mod activation;
pub mod gate;
pub mod linear;
pub mod objective;
pub mod schedule;
pub mod selection;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{Catalog, Quota};
use crate::error::ConfigError;
use crate::plan::Plan;
use activation::ActivationModel;
use gate::CompatibilityGate;
use objective::ObjectiveBuilder;
use schedule::{DayAssigner, DaySchedule};
use selection::{Selection, SelectionSolver};

/// Solver verdict, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// Feasible but not proven optimal
    Feasible,
    Infeasible,
    Error,
}

impl SolveStatus {
    pub fn is_solved(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Error => "error",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of one solver call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Optimal(T),
    Feasible(T),
    Infeasible,
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn status(&self) -> SolveStatus {
        match self {
            Outcome::Optimal(_) => SolveStatus::Optimal,
            Outcome::Feasible(_) => SolveStatus::Feasible,
            Outcome::Infeasible => SolveStatus::Infeasible,
            Outcome::Failed(_) => SolveStatus::Error,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Optimal(value) | Outcome::Feasible(value) => Some(value),
            Outcome::Infeasible | Outcome::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Optimal(value) | Outcome::Feasible(value) => Some(value),
            Outcome::Infeasible | Outcome::Failed(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Optimal(value) => Outcome::Optimal(f(value)),
            Outcome::Feasible(value) => Outcome::Feasible(f(value)),
            Outcome::Infeasible => Outcome::Infeasible,
            Outcome::Failed(message) => Outcome::Failed(message),
        }
    }
}

/// Validated catalog plus the derived read-only models shared by both
/// solver stages.
pub struct Planner<'a> {
    catalog: &'a Catalog,
    quotas: Vec<Quota>,
    activation: ActivationModel,
    gate: CompatibilityGate,
}

impl<'a> Planner<'a> {
    /// Validates the catalog; configuration errors surface here, before any
    /// solver runs.
    pub fn new(catalog: &'a Catalog) -> Result<Self, ConfigError> {
        let quotas = catalog.validate()?;
        let activation = ActivationModel::new(catalog);
        let gate = CompatibilityGate::new(catalog, &activation);
        info!(
            muscles = catalog.muscles.len(),
            exercises = catalog.exercises.len(),
            categories = catalog.categories.len(),
            "Catalog loaded"
        );
        Ok(Self {
            catalog,
            quotas,
            activation,
            gate,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn quotas(&self) -> &[Quota] {
        &self.quotas
    }

    pub fn activation(&self) -> &ActivationModel {
        &self.activation
    }

    pub fn gate(&self) -> &CompatibilityGate {
        &self.gate
    }

    pub fn select(&self, objective: &dyn ObjectiveBuilder) -> Outcome<Selection> {
        SelectionSolver::new(self.catalog, &self.quotas, &self.activation, &self.gate).solve(objective)
    }

    /// One day assignment per category, in category order
    pub fn schedule(&self, selection: &Selection) -> Result<Vec<Outcome<DaySchedule>>, ConfigError> {
        let assigner = DayAssigner::new(&self.activation, self.catalog.tuning.schedule);
        let jobs: Vec<(&str, Vec<(usize, usize)>, &Quota)> = self
            .catalog
            .categories
            .iter()
            .zip(&self.quotas)
            .enumerate()
            .map(|(c, (category, quota))| (category.id.as_str(), selection.expanded_pairs(c), quota))
            .collect();

        if !self.catalog.tuning.parallel_days {
            return jobs
                .iter()
                .map(|(category, pairs, quota)| assigner.assign(category, pairs, quota))
                .collect();
        }

        let assigner = &assigner;
        std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|(category, pairs, quota)| scope.spawn(move || assigner.assign(category, pairs, quota)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Ok(Outcome::Failed("day assignment thread panicked".to_string())))
                })
                .collect()
        })
    }

    /// Full pipeline with the catalog's configured objective
    pub fn plan(&self) -> Result<Outcome<Plan>, ConfigError> {
        let builder = self.catalog.tuning.objective.builder();
        self.plan_with(builder.as_ref())
    }

    /// Selection, then day assignment. Day assignment only runs on a solved
    /// selection; the plan carries the worst status of all solver calls.
    pub fn plan_with(&self, objective: &dyn ObjectiveBuilder) -> Result<Outcome<Plan>, ConfigError> {
        let selection = self.select(objective);
        let chosen = match &selection {
            Outcome::Optimal(chosen) | Outcome::Feasible(chosen) => chosen,
            Outcome::Infeasible => {
                warn!("Selection infeasible, skipping day assignment");
                return Ok(Outcome::Infeasible);
            }
            Outcome::Failed(message) => {
                warn!(%message, "Selection failed, skipping day assignment");
                return Ok(Outcome::Failed(message.clone()));
            }
        };

        let mut status = selection.status();
        let mut schedules = Vec::with_capacity(self.quotas.len());
        for (category, outcome) in self.catalog.categories.iter().zip(self.schedule(chosen)?) {
            status = status.max(outcome.status());
            match outcome.into_value() {
                Some(schedule) => schedules.push(schedule),
                None => {
                    warn!(category = %category.id, %status, "Day assignment not solved");
                    return Ok(match status {
                        SolveStatus::Infeasible => Outcome::Infeasible,
                        _ => Outcome::Failed(format!("day assignment failed for \"{}\"", category.id)),
                    });
                }
            }
        }

        let plan = Plan::assemble(self, objective.name(), status, chosen, &schedules);
        info!(
            %status,
            objective = plan.objective,
            shortfall = plan.total_shortfall(),
            "Plan ready"
        );
        Ok(match status {
            SolveStatus::Optimal => Outcome::Optimal(plan),
            _ => Outcome::Feasible(plan),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::catalog::{self, LOWER, Muscle, UPPER};
    use crate::model::objective::{Minimax, SumShortfall};
    use crate::model::schedule::ScheduleStrategy;

    /// Two days of two supersets over four single-muscle exercises
    fn weekly_catalog() -> Catalog {
        let mut catalog = two_muscle_catalog();
        catalog.muscles.push(Muscle { id: "c".to_string(), target: 2.0 });
        catalog.categories = vec![category("full", 2, 2)];
        catalog.exercises = vec![
            exercise("ex1", &["full"], &[("a", 1.0)], &[]),
            exercise("ex2", &["full"], &[("b", 1.0)], &[]),
            exercise("ex3", &["full"], &[("c", 1.0)], &[]),
            exercise("ex4", &["full"], &[("a", 0.5), ("c", 0.5)], &[]),
        ];
        catalog
    }

    #[test]
    fn test_pipeline_respects_every_hard_constraint() {
        let catalog = weekly_catalog();
        let planner = Planner::new(&catalog).unwrap();
        let selection = planner.select(&SumShortfall).into_value().unwrap();
        let schedules = planner.schedule(&selection).unwrap();
        assert_eq!(schedules.len(), 1);

        let schedule = schedules[0].value().unwrap();
        let quota = planner.quotas()[0];
        assert_eq!(schedule.days.len(), quota.days as usize);
        for day in &schedule.days {
            assert_eq!(day.len(), quota.pairs_per_day as usize);
            for &(i, j) in day {
                assert!(planner.gate().allowed(i, j, 0));
            }
        }
        let mut scheduled: Vec<_> = schedule.days.iter().flatten().copied().collect();
        let mut selected = selection.expanded_pairs(0);
        scheduled.sort();
        selected.sort();
        assert_eq!(scheduled, selected);
    }

    #[test]
    fn test_plan_reports_optimal_status() {
        let catalog = weekly_catalog();
        let planner = Planner::new(&catalog).unwrap();
        let Outcome::Optimal(plan) = planner.plan_with(&Minimax { tie_break: 0.01 }).unwrap() else {
            panic!("expected an optimal plan");
        };
        assert_eq!(plan.status, SolveStatus::Optimal);
        assert_eq!(plan.objective_kind, "minimax");
        assert_eq!(plan.categories.len(), 1);
        assert_eq!(plan.coverage.len(), 3);
    }

    #[test]
    fn test_parallel_days_match_sequential() {
        let mut catalog = weekly_catalog();
        catalog.categories.push(category("extra", 1, 2));
        for exercise in &mut catalog.exercises {
            exercise.categories.push("extra".to_string());
            exercise.max_per_category = Some(2);
        }
        catalog.tuning.schedule = ScheduleStrategy::Overlap;

        let selection = Planner::new(&catalog)
            .unwrap()
            .select(&SumShortfall)
            .into_value()
            .unwrap();
        let penalties = |catalog: &Catalog| -> Vec<f64> {
            Planner::new(catalog)
                .unwrap()
                .schedule(&selection)
                .unwrap()
                .into_iter()
                .map(|outcome| outcome.into_value().unwrap().penalty)
                .collect()
        };

        let sequential = penalties(&catalog);
        catalog.tuning.parallel_days = true;
        let parallel = penalties(&catalog);

        assert_eq!(sequential.len(), 2);
        for (a, b) in sequential.iter().zip(&parallel) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_indivisible_total_fails_before_solving() {
        let mut catalog = two_muscle_catalog();
        catalog.categories[0].pairs_per_day = None;
        catalog.categories[0].required_instances = Some(5);
        assert!(matches!(
            Planner::new(&catalog),
            Err(ConfigError::IndivisibleInstances { instances: 5, days: 1, .. })
        ));
    }

    #[test]
    fn test_infeasible_selection_skips_day_assignment() {
        let mut catalog = two_muscle_catalog();
        catalog.exercises[1].activation.insert("a".to_string(), 1.0);
        let planner = Planner::new(&catalog).unwrap();
        let outcome = planner.plan_with(&SumShortfall).unwrap();
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_builtin_catalog_offers_pairs_per_category() {
        let catalog = catalog::builtin();
        let planner = Planner::new(&catalog).unwrap();
        for (c, category) in catalog.categories.iter().enumerate() {
            assert!(!planner.gate().pairs(c).is_empty(), "{} has no supersets", category.id);
        }
        let ids: Vec<_> = catalog.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![UPPER, LOWER]);
    }

    #[test]
    fn test_builtin_catalog_end_to_end() {
        let catalog = catalog::builtin();
        let planner = Planner::new(&catalog).unwrap();
        let Outcome::Optimal(selection) = planner.select(&SumShortfall) else {
            panic!("built-in catalog has no optimal selection");
        };
        let schedules = planner.schedule(&selection).unwrap();

        for (c, quota) in planner.quotas().iter().enumerate() {
            assert_eq!(selection.counts[c].iter().sum::<u32>(), quota.instances);
            let pairs: u32 = selection.pairs[c].iter().map(|&(_, times)| times).sum();
            assert_eq!(pairs, quota.pairs);
            for (e, &count) in selection.counts[c].iter().enumerate() {
                assert_eq!(count, selection.paired_instances(c, e));
                assert!(count <= catalog.exercises[e].usage_cap(quota));
            }
            for &((i, j), _) in &selection.pairs[c] {
                assert!(planner.gate().allowed(i, j, c));
            }

            let schedule = schedules[c].value().unwrap();
            assert_eq!(schedule.days.len(), quota.days as usize);
            for day in &schedule.days {
                assert_eq!(day.len(), quota.pairs_per_day as usize);
            }
            let mut scheduled: Vec<_> = schedule.days.iter().flatten().copied().collect();
            let mut selected = selection.expanded_pairs(c);
            scheduled.sort();
            selected.sort();
            assert_eq!(scheduled, selected);
            assert_eq!(schedule.conflicts, schedule::count_conflicts(&schedule.days));
        }
    }

    #[test]
    fn test_status_order_and_outcome_helpers() {
        assert!(SolveStatus::Optimal < SolveStatus::Feasible);
        assert!(SolveStatus::Feasible.is_solved());
        assert!(!SolveStatus::Infeasible.is_solved());
        let outcome: Outcome<u32> = Outcome::Feasible(2);
        assert_eq!(outcome.status(), SolveStatus::Feasible);
        assert_eq!(outcome.map(|v| v * 2), Outcome::Feasible(4));
        assert_eq!(Outcome::<u32>::Failed("x".to_string()).into_value(), None);
    }
}
