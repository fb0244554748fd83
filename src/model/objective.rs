//! Coverage objectives - pluggable ways to score the gap between weekly
//! muscle volume and its target.
//!
//! Every builder receives the realized coverage of each tracked muscle as a
//! linear expression over the selection variables and returns a linear
//! objective plus whatever auxiliary constraints it needs.

use std::fmt;
use std::str::FromStr;

use good_lp::{Constraint, ProblemVariables, Variable, constraint, variable};
use serde::{Deserialize, Serialize};

use super::linear::LinearExpr;
use crate::error::ConfigError;

pub const DEFAULT_TIE_BREAK: f64 = 0.01;
pub const DEFAULT_WEIGHT: f64 = 0.1;
pub const DEFAULT_UNDER_WEIGHT: f64 = 2.0;

/// Realized weekly volume of one tracked muscle
#[derive(Debug, Clone)]
pub struct CoverageTerm {
    pub muscle: usize,
    pub target: f64,
    pub coverage: LinearExpr,
}

/// Objective expression plus the auxiliary constraints defining it
#[derive(Default)]
pub struct ObjectiveModel {
    pub objective: LinearExpr,
    pub constraints: Vec<Constraint>,
}

pub trait ObjectiveBuilder {
    fn name(&self) -> &'static str;

    fn build(&self, vars: &mut ProblemVariables, terms: &[CoverageTerm]) -> ObjectiveModel;
}

/// Minimize Σ max(0, target − coverage). Overshoot is free.
pub struct SumShortfall;

impl ObjectiveBuilder for SumShortfall {
    fn name(&self) -> &'static str {
        "sum-shortfall"
    }

    fn build(&self, vars: &mut ProblemVariables, terms: &[CoverageTerm]) -> ObjectiveModel {
        let mut model = ObjectiveModel::default();
        for term in terms {
            let shortfall = shortfall(vars, term, &mut model.constraints);
            model.objective.add_term(shortfall, 1.0);
        }
        model
    }
}

/// Minimize the largest shortfall, with a small sum-of-shortfalls tie-break
pub struct Minimax {
    pub tie_break: f64,
}

impl ObjectiveBuilder for Minimax {
    fn name(&self) -> &'static str {
        "minimax"
    }

    fn build(&self, vars: &mut ProblemVariables, terms: &[CoverageTerm]) -> ObjectiveModel {
        let mut model = ObjectiveModel::default();
        let worst = vars.add(variable().min(0));
        model.objective.add_term(worst, 1.0);

        for term in terms {
            let shortfall = shortfall(vars, term, &mut model.constraints);
            model.constraints.push(constraint!(worst >= shortfall));
            model.objective.add_term(shortfall, self.tie_break);
        }
        model
    }
}

/// Weighted over/undershoot with undershoot penalized `under_weight` times
/// harder: `weight·(Σo + uw·Σu) + (max o + uw·max u)`.
pub struct Asymmetric {
    pub weight: f64,
    pub under_weight: f64,
}

impl ObjectiveBuilder for Asymmetric {
    fn name(&self) -> &'static str {
        "asymmetric"
    }

    fn build(&self, vars: &mut ProblemVariables, terms: &[CoverageTerm]) -> ObjectiveModel {
        deviation_model(vars, terms, self.weight, self.under_weight, |_| 1.0)
    }
}

/// Like [`Asymmetric`], with deviations measured in percent of each
/// muscle's own target so small targets are not drowned out.
pub struct Percentage {
    pub weight: f64,
    pub under_weight: f64,
}

impl ObjectiveBuilder for Percentage {
    fn name(&self) -> &'static str {
        "percentage"
    }

    fn build(&self, vars: &mut ProblemVariables, terms: &[CoverageTerm]) -> ObjectiveModel {
        deviation_model(vars, terms, self.weight, self.under_weight, |target| target / 100.0)
    }
}

/// `s >= 0`, `s >= target − coverage`
fn shortfall(vars: &mut ProblemVariables, term: &CoverageTerm, constraints: &mut Vec<Constraint>) -> Variable {
    let shortfall = vars.add(variable().min(0));
    constraints.push(constraint!(shortfall + term.coverage.to_expression() >= term.target));
    shortfall
}

/// Over/undershoot slacks per muscle, each in units of `scale(target)`:
/// `coverage <= target + scale·o`, `coverage >= target − scale·u`.
fn deviation_model(
    vars: &mut ProblemVariables,
    terms: &[CoverageTerm],
    weight: f64,
    under_weight: f64,
    scale: impl Fn(f64) -> f64,
) -> ObjectiveModel {
    let mut model = ObjectiveModel::default();
    let max_over = vars.add(variable().min(0));
    let max_under = vars.add(variable().min(0));
    model.objective.add_term(max_over, 1.0);
    model.objective.add_term(max_under, under_weight);

    for term in terms {
        let over = vars.add(variable().min(0));
        let under = vars.add(variable().min(0));
        let unit = scale(term.target);
        let coverage = term.coverage.to_expression();

        model
            .constraints
            .push(constraint!(coverage.clone() - unit * over <= term.target));
        model
            .constraints
            .push(constraint!(coverage + unit * under >= term.target));
        model.constraints.push(constraint!(max_over >= over));
        model.constraints.push(constraint!(max_under >= under));

        model.objective.add_term(over, weight);
        model.objective.add_term(under, weight * under_weight);
    }
    model
}

/// Serializable objective choice, as found in catalog tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveKind {
    #[default]
    SumShortfall,
    Minimax {
        #[serde(default = "default_tie_break")]
        tie_break: f64,
    },
    Asymmetric {
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default = "default_under_weight")]
        under_weight: f64,
    },
    Percentage {
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default = "default_under_weight")]
        under_weight: f64,
    },
}

fn default_tie_break() -> f64 {
    DEFAULT_TIE_BREAK
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn default_under_weight() -> f64 {
    DEFAULT_UNDER_WEIGHT
}

impl ObjectiveKind {
    pub fn builder(&self) -> Box<dyn ObjectiveBuilder + Send + Sync> {
        match *self {
            ObjectiveKind::SumShortfall => Box::new(SumShortfall),
            ObjectiveKind::Minimax { tie_break } => Box::new(Minimax { tie_break }),
            ObjectiveKind::Asymmetric { weight, under_weight } => Box::new(Asymmetric { weight, under_weight }),
            ObjectiveKind::Percentage { weight, under_weight } => Box::new(Percentage { weight, under_weight }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = match *self {
            ObjectiveKind::SumShortfall => vec![],
            ObjectiveKind::Minimax { tie_break } => vec![tie_break],
            ObjectiveKind::Asymmetric { weight, under_weight }
            | ObjectiveKind::Percentage { weight, under_weight } => vec![weight, under_weight],
        };
        match weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            Some(&w) => Err(ConfigError::InvalidWeight(w)),
            None => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectiveKind::SumShortfall => "sum-shortfall",
            ObjectiveKind::Minimax { .. } => "minimax",
            ObjectiveKind::Asymmetric { .. } => "asymmetric",
            ObjectiveKind::Percentage { .. } => "percentage",
        }
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses an objective name with default weights
impl FromStr for ObjectiveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum-shortfall" | "shortfall" => Ok(ObjectiveKind::SumShortfall),
            "minimax" => Ok(ObjectiveKind::Minimax {
                tie_break: DEFAULT_TIE_BREAK,
            }),
            "asymmetric" => Ok(ObjectiveKind::Asymmetric {
                weight: DEFAULT_WEIGHT,
                under_weight: DEFAULT_UNDER_WEIGHT,
            }),
            "percentage" => Ok(ObjectiveKind::Percentage {
                weight: DEFAULT_WEIGHT,
                under_weight: DEFAULT_UNDER_WEIGHT,
            }),
            other => Err(format!(
                "unknown objective \"{other}\" (expected sum-shortfall, minimax, asymmetric or percentage)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use good_lp::{SolverModel, default_solver};

    /// One muscle per entry, coverage = `volume` variable fixed at `covered`.
    /// Returns the optimal objective value.
    fn objective_at(builder: &dyn ObjectiveBuilder, muscles: &[(f64, f64)]) -> f64 {
        let mut vars = ProblemVariables::new();
        let volumes: Vec<Variable> = muscles.iter().map(|_| vars.add(variable().min(0))).collect();
        let terms: Vec<CoverageTerm> = muscles
            .iter()
            .zip(&volumes)
            .enumerate()
            .map(|(muscle, (&(target, _), &volume))| {
                let mut coverage = LinearExpr::new();
                coverage.add_term(volume, 1.0);
                CoverageTerm { muscle, target, coverage }
            })
            .collect();

        let model = builder.build(&mut vars, &terms);
        let mut problem = vars.minimise(model.objective.to_expression()).using(default_solver);
        for c in model.constraints {
            problem = problem.with(c);
        }
        for (&(_, covered), &volume) in muscles.iter().zip(&volumes) {
            problem = problem.with(constraint!(volume == covered));
        }
        let solution = problem.solve().unwrap();
        model.objective.evaluate(&solution)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_sum_shortfall_ignores_overshoot() {
        let value = objective_at(&SumShortfall, &[(10.0, 7.0), (5.0, 9.0)]);
        assert!(close(value, 3.0));
    }

    #[test]
    fn test_minimax_bounds_worst_shortfall() {
        let value = objective_at(&Minimax { tie_break: 0.01 }, &[(10.0, 7.0), (5.0, 4.0)]);
        assert!(close(value, 3.0 + 0.01 * 4.0));
    }

    #[test]
    fn test_asymmetric_penalizes_undershoot_harder() {
        let builder = Asymmetric { weight: 0.1, under_weight: 2.0 };
        let over = objective_at(&builder, &[(10.0, 12.0)]);
        let under = objective_at(&builder, &[(10.0, 8.0)]);
        assert!(close(over, 0.1 * 2.0 + 2.0));
        assert!(close(under, 0.1 * 2.0 * 2.0 + 2.0 * 2.0));
        assert!(under > over);
    }

    #[test]
    fn test_percentage_is_relative_to_target() {
        let builder = Percentage { weight: 1.0, under_weight: 1.0 };
        // 50% short on a small target outweighs 10% short on a large one
        let small = objective_at(&builder, &[(2.0, 1.0)]);
        let large = objective_at(&builder, &[(20.0, 18.0)]);
        assert!(close(small, 50.0 + 50.0));
        assert!(close(large, 10.0 + 10.0));
    }

    #[test]
    fn test_zero_deviation_scores_zero() {
        for kind in ["sum-shortfall", "minimax", "asymmetric", "percentage"] {
            let kind: ObjectiveKind = kind.parse().unwrap();
            let value = objective_at(kind.builder().as_ref(), &[(6.0, 6.0), (3.0, 3.0)]);
            assert!(close(value, 0.0), "{kind} scored {value}");
        }
    }

    #[test]
    fn test_kind_parsing_and_names() {
        assert_eq!("minimax".parse::<ObjectiveKind>().unwrap().name(), "minimax");
        assert_eq!(
            "percentage".parse::<ObjectiveKind>().unwrap(),
            ObjectiveKind::Percentage { weight: DEFAULT_WEIGHT, under_weight: DEFAULT_UNDER_WEIGHT }
        );
        assert!("lexicographic".parse::<ObjectiveKind>().is_err());
        for kind in ["sum-shortfall", "minimax", "asymmetric", "percentage"] {
            let parsed: ObjectiveKind = kind.parse().unwrap();
            assert_eq!(parsed.builder().name(), kind);
        }
    }

    #[test]
    fn test_kind_from_json_uses_default_weights() {
        let kind: ObjectiveKind = serde_json::from_str(r#"{"kind": "asymmetric", "under_weight": 3.0}"#).unwrap();
        assert_eq!(kind, ObjectiveKind::Asymmetric { weight: DEFAULT_WEIGHT, under_weight: 3.0 });
        let kind: ObjectiveKind = serde_json::from_str(r#"{"kind": "sum_shortfall"}"#).unwrap();
        assert_eq!(kind, ObjectiveKind::SumShortfall);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let kind = ObjectiveKind::Asymmetric { weight: -1.0, under_weight: 2.0 };
        assert_eq!(kind.validate(), Err(ConfigError::InvalidWeight(-1.0)));
        assert!(ObjectiveKind::default().validate().is_ok());
    }
}
