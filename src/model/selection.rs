//! Exercise selection - weekly instance counts and supersets per category
//! that best cover the muscle targets.

use good_lp::{ProblemVariables, ResolutionError, Solution, SolverModel, Variable, constraint, default_solver, variable};
use tracing::{debug, info, warn};

use super::Outcome;
use super::activation::ActivationModel;
use super::gate::CompatibilityGate;
use super::linear::{LinearExpr, integral};
use super::objective::{CoverageTerm, ObjectiveBuilder};
use crate::catalog::{Catalog, Quota};

/// Solved selection, indexed by category then exercise
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub counts: Vec<Vec<u32>>,
    /// Supersets with non-zero multiplicity, `(i, j)` with `i <= j`
    pub pairs: Vec<Vec<((usize, usize), u32)>>,
    pub objective: f64,
}

impl Selection {
    /// One entry per superset instance, in pair order
    pub fn expanded_pairs(&self, category: usize) -> Vec<(usize, usize)> {
        self.pairs[category]
            .iter()
            .flat_map(|&(pair, times)| std::iter::repeat_n(pair, times as usize))
            .collect()
    }

    /// Instances of `exercise` realized by the category's supersets
    pub fn paired_instances(&self, category: usize, exercise: usize) -> u32 {
        self.pairs[category]
            .iter()
            .map(|&((i, j), times)| match (i == exercise, j == exercise) {
                (true, true) => 2 * times,
                (true, false) | (false, true) => times,
                (false, false) => 0,
            })
            .sum()
    }
}

/// Integer program over instance counts and superset multiplicities
pub struct SelectionSolver<'a> {
    catalog: &'a Catalog,
    quotas: &'a [Quota],
    activation: &'a ActivationModel,
    gate: &'a CompatibilityGate,
}

impl<'a> SelectionSolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        quotas: &'a [Quota],
        activation: &'a ActivationModel,
        gate: &'a CompatibilityGate,
    ) -> Self {
        Self {
            catalog,
            quotas,
            activation,
            gate,
        }
    }

    pub fn solve(&self, objective: &dyn ObjectiveBuilder) -> Outcome<Selection> {
        let exercises = &self.catalog.exercises;
        let mut vars = ProblemVariables::new();
        let mut counts: Vec<Vec<Option<Variable>>> = Vec::with_capacity(self.quotas.len());
        let mut pairs: Vec<Vec<((usize, usize), Variable)>> = Vec::with_capacity(self.quotas.len());

        for (c, (category, quota)) in self.catalog.categories.iter().zip(self.quotas).enumerate() {
            let caps: Vec<u32> = exercises.iter().map(|e| e.usage_cap(quota)).collect();

            let category_counts: Vec<Option<Variable>> = exercises
                .iter()
                .enumerate()
                .map(|(e, exercise)| {
                    exercise
                        .allowed_in(&category.id)
                        .then(|| vars.add(variable().integer().min(0).max(caps[e])))
                })
                .collect();

            let mut category_pairs = Vec::new();
            for &(i, j) in self.gate.pairs(c) {
                let bound = if i == j { caps[i] / 2 } else { caps[i].min(caps[j]) }.min(quota.pairs);
                if bound == 0 {
                    continue;
                }
                let var = vars.add(variable().integer().min(0).max(bound));
                category_pairs.push(((i, j), var));
            }

            if category_pairs.is_empty() {
                warn!(category = %category.id, "No compatible supersets, selection is infeasible");
                return Outcome::Infeasible;
            }
            debug!(
                category = %category.id,
                exercises = category_counts.iter().flatten().count(),
                pairs = category_pairs.len(),
                "Selection variables"
            );

            counts.push(category_counts);
            pairs.push(category_pairs);
        }

        let terms = self.coverage_terms(&counts);
        let model = objective.build(&mut vars, &terms);
        let mut problem = vars
            .minimise(model.objective.to_expression())
            .using(default_solver);

        for (c, quota) in self.quotas.iter().enumerate() {
            let mut total = LinearExpr::new();
            for count in counts[c].iter().flatten() {
                total.add_term(*count, 1.0);
            }
            problem = problem.with(constraint!(total.to_expression() == f64::from(quota.instances)));

            // Every instance sits in exactly one superset
            for (e, count) in counts[c].iter().enumerate() {
                let mut linked = LinearExpr::new();
                for &((i, j), var) in &pairs[c] {
                    match (i == e, j == e) {
                        (true, true) => linked.add_term(var, 2.0),
                        (true, false) | (false, true) => linked.add_term(var, 1.0),
                        (false, false) => {}
                    }
                }
                if let Some(count) = count {
                    problem = problem.with(constraint!(*count == linked.to_expression()));
                }
            }

            let mut pair_total = LinearExpr::new();
            for &(_, var) in &pairs[c] {
                pair_total.add_term(var, 1.0);
            }
            problem = problem.with(constraint!(pair_total.to_expression() == f64::from(quota.pairs)));
        }

        for c in model.constraints {
            problem = problem.with(c);
        }

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                warn!("Selection model is infeasible");
                return Outcome::Infeasible;
            }
            Err(error) => {
                warn!(%error, "Selection solve failed");
                return Outcome::Failed(error.to_string());
            }
        };

        let selection = Selection {
            counts: counts
                .iter()
                .map(|category| {
                    category
                        .iter()
                        .map(|count| count.map_or(0, |v| integral(solution.value(v))))
                        .collect()
                })
                .collect(),
            pairs: pairs
                .iter()
                .map(|category| {
                    category
                        .iter()
                        .map(|&(pair, v)| (pair, integral(solution.value(v))))
                        .filter(|&(_, times)| times > 0)
                        .collect()
                })
                .collect(),
            objective: model.objective.evaluate(&solution),
        };

        info!(
            objective = objective.name(),
            value = selection.objective,
            "Selection solved"
        );
        Outcome::Optimal(selection)
    }

    /// Weekly volume of every tracked muscle as a function of the counts
    fn coverage_terms(&self, counts: &[Vec<Option<Variable>>]) -> Vec<CoverageTerm> {
        self.catalog
            .muscles
            .iter()
            .enumerate()
            .filter(|(_, muscle)| muscle.target > 0.0)
            .map(|(m, muscle)| {
                let mut coverage = LinearExpr::new();
                for (category, category_counts) in self.catalog.categories.iter().zip(counts) {
                    for (e, count) in category_counts.iter().enumerate() {
                        if let Some(count) = count {
                            coverage.add_term(*count, category.sets_per_instance * self.activation.activation(e, m));
                        }
                    }
                }
                CoverageTerm {
                    muscle: m,
                    target: muscle.target,
                    coverage,
                }
            })
            .collect()
    }
}
