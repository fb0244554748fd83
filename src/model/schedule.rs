//! Day assignment - spread a category's supersets over its training days

use std::fmt;
use std::str::FromStr;

use good_lp::{ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint, default_solver, variable};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Outcome;
use super::activation::ActivationModel;
use super::linear::{LinearExpr, conjunction};
use crate::catalog::Quota;
use crate::error::ConfigError;

/// What the day assignment tries to keep apart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStrategy {
    /// Penalize supersets sharing an exercise on the same day
    #[default]
    ConflictSlack,
    /// Penalize muscular overlap between supersets on the same day
    Overlap,
}

impl ScheduleStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ScheduleStrategy::ConflictSlack => "conflict-slack",
            ScheduleStrategy::Overlap => "overlap",
        }
    }
}

impl fmt::Display for ScheduleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScheduleStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conflict-slack" | "conflict" => Ok(ScheduleStrategy::ConflictSlack),
            "overlap" => Ok(ScheduleStrategy::Overlap),
            other => Err(format!(
                "unknown schedule strategy \"{other}\" (expected conflict-slack or overlap)"
            )),
        }
    }
}

/// Supersets per training day
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub days: Vec<Vec<(usize, usize)>>,
    /// Optimal value of the strategy's penalty
    pub penalty: f64,
    /// Same-day superset pairs that repeat an exercise
    pub conflicts: usize,
}

pub fn shares_exercise(p: (usize, usize), q: (usize, usize)) -> bool {
    p.0 == q.0 || p.0 == q.1 || p.1 == q.0 || p.1 == q.1
}

pub fn count_conflicts(days: &[Vec<(usize, usize)>]) -> usize {
    days.iter()
        .map(|day| {
            day.iter()
                .enumerate()
                .flat_map(|(i, &p)| day[i + 1..].iter().map(move |&q| (p, q)))
                .filter(|&(p, q)| shares_exercise(p, q))
                .count()
        })
        .sum()
}

pub struct DayAssigner<'a> {
    activation: &'a ActivationModel,
    strategy: ScheduleStrategy,
}

impl<'a> DayAssigner<'a> {
    pub fn new(activation: &'a ActivationModel, strategy: ScheduleStrategy) -> Self {
        Self {
            activation,
            strategy,
        }
    }

    /// Assign every superset to exactly one day, `pairs_per_day` per day.
    ///
    /// Fails before solving when the superset count does not fill the days
    /// exactly.
    pub fn assign(
        &self,
        category: &str,
        pairs: &[(usize, usize)],
        quota: &Quota,
    ) -> Result<Outcome<DaySchedule>, ConfigError> {
        let days = quota.days as usize;
        if pairs.len() != days * quota.pairs_per_day as usize {
            return Err(ConfigError::PairCountMismatch {
                category: category.to_string(),
                pairs: pairs.len(),
                days: quota.days,
                pairs_per_day: quota.pairs_per_day,
            });
        }

        let mut vars = ProblemVariables::new();
        let assign: Vec<Vec<Variable>> = pairs
            .iter()
            .map(|_| (0..days).map(|_| vars.add(variable().binary())).collect())
            .collect();

        let mut penalty = LinearExpr::new();
        let mut constraints = Vec::new();
        for p in 0..pairs.len() {
            for q in p + 1..pairs.len() {
                match self.strategy {
                    ScheduleStrategy::ConflictSlack => {
                        if !shares_exercise(pairs[p], pairs[q]) {
                            continue;
                        }
                        for d in 0..days {
                            let slack = vars.add(variable().min(0));
                            constraints.push(constraint!(assign[p][d] + assign[q][d] - slack <= 1));
                            penalty.add_term(slack, 1.0);
                        }
                    }
                    ScheduleStrategy::Overlap => {
                        let overlap = self.activation.pair_overlap(pairs[p], pairs[q]);
                        if overlap <= 0.0 {
                            continue;
                        }
                        for d in 0..days {
                            let (both, linking) = conjunction(&mut vars, assign[p][d], assign[q][d]);
                            constraints.extend(linking);
                            penalty.add_term(both, overlap);
                        }
                    }
                }
            }
        }
        debug!(
            category,
            strategy = %self.strategy,
            pairs = pairs.len(),
            linking_constraints = constraints.len(),
            "Day assignment model"
        );

        let mut problem = vars.minimise(penalty.to_expression()).using(default_solver);
        for row in &assign {
            let mut once = LinearExpr::new();
            for &x in row {
                once.add_term(x, 1.0);
            }
            problem = problem.with(constraint!(once.to_expression() == 1));
        }
        for d in 0..days {
            let mut capacity = LinearExpr::new();
            for row in &assign {
                capacity.add_term(row[d], 1.0);
            }
            problem = problem.with(constraint!(capacity.to_expression() == f64::from(quota.pairs_per_day)));
        }
        for c in constraints {
            problem = problem.with(c);
        }

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                warn!(category, "Day assignment is infeasible");
                return Ok(Outcome::Infeasible);
            }
            Err(error) => {
                warn!(category, %error, "Day assignment failed");
                return Ok(Outcome::Failed(error.to_string()));
            }
        };

        let mut schedule = vec![Vec::with_capacity(quota.pairs_per_day as usize); days];
        for (p, row) in assign.iter().enumerate() {
            if let Some(d) = row.iter().position(|&x| solution.value(x) > 0.5) {
                schedule[d].push(pairs[p]);
            }
        }

        let conflicts = count_conflicts(&schedule);
        let schedule = DaySchedule {
            days: schedule,
            penalty: penalty.evaluate(&solution),
            conflicts,
        };
        if conflicts > 0 {
            warn!(category, conflicts, "Schedule repeats exercises within a day");
        } else {
            info!(category, penalty = schedule.penalty, "Conflict-free schedule");
        }
        Ok(Outcome::Optimal(schedule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::catalog::{Catalog, Muscle, Tuning};

    fn catalog() -> Catalog {
        Catalog {
            muscles: vec![
                Muscle { id: "chest".to_string(), target: 10.0 },
                Muscle { id: "back".to_string(), target: 10.0 },
                Muscle { id: "legs".to_string(), target: 10.0 },
            ],
            equipment: vec![],
            categories: vec![category("full", 2, 2)],
            exercises: vec![
                exercise("press", &["full"], &[("chest", 1.0)], &[]),
                exercise("row", &["full"], &[("back", 1.0)], &[]),
                exercise("squat", &["full"], &[("legs", 1.0)], &[]),
                exercise("fly", &["full"], &[("chest", 0.8)], &[]),
            ],
            tuning: Tuning::default(),
        }
    }

    fn quota(days: u32, pairs_per_day: u32) -> Quota {
        Quota {
            instances: 2 * days * pairs_per_day,
            pairs: days * pairs_per_day,
            days,
            pairs_per_day,
        }
    }

    fn check_capacity(schedule: &DaySchedule, pairs: &[(usize, usize)], quota: &Quota) {
        assert_eq!(schedule.days.len(), quota.days as usize);
        for day in &schedule.days {
            assert_eq!(day.len(), quota.pairs_per_day as usize);
        }
        let mut scheduled: Vec<_> = schedule.days.iter().flatten().copied().collect();
        let mut expected = pairs.to_vec();
        scheduled.sort();
        expected.sort();
        assert_eq!(scheduled, expected);
    }

    #[test]
    fn test_unavoidable_conflict_is_minimized() {
        let catalog = catalog();
        let activation = ActivationModel::new(&catalog);
        let assigner = DayAssigner::new(&activation, ScheduleStrategy::ConflictSlack);
        let pairs = [(0, 1), (0, 2), (1, 2), (2, 3)];
        let quota = quota(2, 2);

        let Outcome::Optimal(schedule) = assigner.assign("full", &pairs, &quota).unwrap() else {
            panic!("expected a schedule");
        };
        check_capacity(&schedule, &pairs, &quota);
        // no split of these four is conflict-free; (0, 1) + (2, 3) leaves one
        assert_eq!(schedule.conflicts, count_conflicts(&schedule.days));
        assert!((schedule.penalty - schedule.conflicts as f64).abs() < 1e-6);
        assert_eq!(schedule.conflicts, 1);
        assert!(schedule.days.iter().any(|day| day.contains(&(0, 1)) && day.contains(&(2, 3))));
    }

    #[test]
    fn test_conflict_free_when_possible() {
        let catalog = catalog();
        let activation = ActivationModel::new(&catalog);
        let assigner = DayAssigner::new(&activation, ScheduleStrategy::ConflictSlack);
        let pairs = [(0, 1), (0, 2), (2, 3), (1, 3)];
        let quota = quota(2, 2);

        let Outcome::Optimal(schedule) = assigner.assign("full", &pairs, &quota).unwrap() else {
            panic!("expected a schedule");
        };
        check_capacity(&schedule, &pairs, &quota);
        assert_eq!(schedule.conflicts, 0);
        assert!(schedule.penalty.abs() < 1e-6);
    }

    #[test]
    fn test_overlap_strategy_separates_similar_supersets() {
        let catalog = catalog();
        let activation = ActivationModel::new(&catalog);
        let assigner = DayAssigner::new(&activation, ScheduleStrategy::Overlap);
        // two chest-heavy and two chest-free supersets
        let pairs = [(0, 2), (2, 3), (1, 2), (1, 1)];
        let quota = quota(2, 2);

        let Outcome::Optimal(schedule) = assigner.assign("full", &pairs, &quota).unwrap() else {
            panic!("expected a schedule");
        };
        check_capacity(&schedule, &pairs, &quota);
        for day in &schedule.days {
            let chest_heavy = day.iter().filter(|p| **p == (0, 2) || **p == (2, 3)).count();
            assert_eq!(chest_heavy, 1, "chest supersets share a day: {day:?}");
        }
    }

    #[test]
    fn test_pair_count_mismatch_fails_before_solving() {
        let catalog = catalog();
        let activation = ActivationModel::new(&catalog);
        let assigner = DayAssigner::new(&activation, ScheduleStrategy::ConflictSlack);
        let result = assigner.assign("full", &[(0, 1), (2, 3), (1, 2)], &quota(2, 2));
        assert_eq!(
            result,
            Err(ConfigError::PairCountMismatch {
                category: "full".to_string(),
                pairs: 3,
                days: 2,
                pairs_per_day: 2,
            })
        );
    }

    #[test]
    fn test_count_conflicts() {
        let days = vec![vec![(0, 1), (1, 2), (1, 3)], vec![(4, 5), (6, 6)]];
        assert_eq!(count_conflicts(&days), 3);
        assert!(shares_exercise((0, 1), (1, 0)));
        assert!(!shares_exercise((0, 1), (2, 3)));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("overlap".parse::<ScheduleStrategy>(), Ok(ScheduleStrategy::Overlap));
        assert_eq!("conflict".parse::<ScheduleStrategy>(), Ok(ScheduleStrategy::ConflictSlack));
        assert!("random".parse::<ScheduleStrategy>().is_err());
    }
}
