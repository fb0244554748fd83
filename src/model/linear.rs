//! Solver-agnostic linear expressions and shared linearizations

use good_lp::{Constraint, Expression, ProblemVariables, Solution, Variable, constraint, variable};

/// Sparse linear expression `constant + Σ coefficient · variable`.
///
/// Kept alongside the solver's own `Expression` so objective values and
/// coverage can be re-evaluated against a solution after solving.
#[derive(Debug, Clone, Default)]
pub struct LinearExpr {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Zero coefficients are dropped
    pub fn add_term(&mut self, var: Variable, coefficient: f64) {
        if coefficient != 0.0 {
            self.terms.push((var, coefficient));
        }
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// `self += factor · other`
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        for &(var, coefficient) in &other.terms {
            self.add_term(var, coefficient * factor);
        }
        self.constant += other.constant * factor;
    }

    pub fn has_terms(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn to_expression(&self) -> Expression {
        let mut expression = Expression::from(self.constant);
        for &(var, coefficient) in &self.terms {
            expression += coefficient * var;
        }
        expression
    }

    pub fn evaluate<S: Solution>(&self, solution: &S) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coefficient)| coefficient * solution.value(var))
            .sum::<f64>()
            + self.constant
    }
}

/// Binary `y = x1 AND x2` through
/// `y <= x1`, `y <= x2`, `y >= x1 + x2 - 1`.
pub fn conjunction(vars: &mut ProblemVariables, x1: Variable, x2: Variable) -> (Variable, [Constraint; 3]) {
    let both = vars.add(variable().binary());
    let constraints = [
        constraint!(both <= x1),
        constraint!(both <= x2),
        constraint!(x1 + x2 - both <= 1),
    ];
    (both, constraints)
}

/// Round a solver value of an integer variable
pub fn integral(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use good_lp::{SolverModel, default_solver};

    fn solve_and(fixed1: f64, fixed2: f64, maximise: bool) -> f64 {
        let mut vars = ProblemVariables::new();
        let x1 = vars.add(variable().binary());
        let x2 = vars.add(variable().binary());
        let (both, constraints) = conjunction(&mut vars, x1, x2);

        let mut problem = if maximise {
            vars.maximise(both).using(default_solver)
        } else {
            vars.minimise(both).using(default_solver)
        };
        for c in constraints {
            problem = problem.with(c);
        }
        let solution = problem
            .with(constraint!(x1 == fixed1))
            .with(constraint!(x2 == fixed2))
            .solve()
            .unwrap();
        solution.value(both)
    }

    /// Both optimisation directions must land on the same value, otherwise
    /// the conjunction is not pinned by its constraints.
    fn pinned_and(fixed1: f64, fixed2: f64) -> f64 {
        let low = solve_and(fixed1, fixed2, false);
        let high = solve_and(fixed1, fixed2, true);
        assert!((low - high).abs() < 1e-6, "conjunction not pinned: {low} vs {high}");
        low
    }

    #[test]
    fn test_conjunction_truth_table() {
        assert!(pinned_and(0.0, 0.0).abs() < 1e-6);
        assert!(pinned_and(1.0, 0.0).abs() < 1e-6);
        assert!(pinned_and(0.0, 1.0).abs() < 1e-6);
        assert!((pinned_and(1.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_expr_evaluation() {
        let mut vars = ProblemVariables::new();
        let x = vars.add(variable().min(0).max(10));
        let mut expr = LinearExpr::constant(1.5);
        expr.add_term(x, 2.0);
        expr.add_term(x, 0.0);

        let mut doubled = LinearExpr::new();
        doubled.add_scaled(&expr, 2.0);

        let solution = vars
            .maximise(expr.to_expression())
            .using(default_solver)
            .solve()
            .unwrap();
        assert!((expr.evaluate(&solution) - 21.5).abs() < 1e-6);
        assert!((doubled.evaluate(&solution) - 43.0).abs() < 1e-6);
        assert!(expr.has_terms());
        assert!(!LinearExpr::constant(3.0).has_terms());
    }

    #[test]
    fn test_integral_rounding() {
        assert_eq!(integral(2.9999999), 3);
        assert_eq!(integral(-1e-9), 0);
        assert_eq!(integral(4.0000001), 4);
    }
}
