//! Plain-text plan report

use std::fmt::Write;

use crate::model::SolveStatus;
use crate::plan::{CategoryPlan, Plan, day_label};

fn status_line(plan: &Plan) -> String {
    match plan.status {
        SolveStatus::Optimal => format!("Status: optimal ({}, objective {:.3})", plan.objective_kind, plan.objective),
        SolveStatus::Feasible => format!(
            "Status: feasible, not proven optimal ({}, objective {:.3})",
            plan.objective_kind, plan.objective
        ),
        other => format!("Status: {other}"),
    }
}

fn write_counts(out: &mut String, category: &CategoryPlan) {
    let total: u32 = category.counts.iter().map(|c| c.count).sum();
    let _ = writeln!(out, "{} counts ({total} total):", category.id);
    for count in &category.counts {
        let _ = writeln!(out, "  {:40} : {}", count.exercise, count.count);
    }
}

fn write_pairs(out: &mut String, category: &CategoryPlan) {
    let _ = writeln!(out, "{} supersets ({}):", category.id, category.pairs.len());
    for (i, pair) in category.pairs.iter().enumerate() {
        let _ = writeln!(out, " Pair {:2}: {}  +  {}", i + 1, pair.first, pair.second);
    }
}

fn write_days(out: &mut String, category: &CategoryPlan) {
    let schedule = &category.schedule;
    let width = schedule.days.iter().map(Vec::len).max().unwrap_or(0);

    let _ = writeln!(out, "### {} days", category.id);
    let mut header = String::from("| Day |");
    let mut rule = String::from("|---|");
    for i in 0..width {
        let _ = write!(header, " Superset {} |", i + 1);
        rule.push_str("---|");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");
    for (d, day) in schedule.days.iter().enumerate() {
        let _ = write!(out, "| {} |", day_label(&category.id, d));
        for superset in day {
            let _ = write!(out, " {}<br>{} |", superset.first, superset.second);
        }
        let _ = writeln!(out);
    }

    if schedule.conflicts == 0 {
        let _ = writeln!(out, "Conflict-free: no exercise repeats within a day.");
    } else {
        let _ = writeln!(
            out,
            "Schedule allows {} shared exercises within a day; use with caution.",
            schedule.conflicts
        );
    }
}

/// Render the plan the way the `solve` and `show` commands print it
pub fn render(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", status_line(plan));

    let _ = writeln!(out, "\n=== COUNTS ===");
    for category in &plan.categories {
        write_counts(&mut out, category);
    }

    let _ = writeln!(out, "\n=== SUPERSETS ===");
    for category in &plan.categories {
        write_pairs(&mut out, category);
    }

    let _ = writeln!(out, "\n=== COVERAGE vs TARGETS (sets/week) ===");
    for coverage in &plan.coverage {
        let _ = writeln!(
            out,
            "  {:20} target {:4.1}   covered {:6.2}   diff {:6.2}",
            coverage.muscle,
            coverage.target,
            coverage.covered,
            coverage.deviation()
        );
    }
    let _ = writeln!(out, "\nTotal shortfall = {:.3}", plan.total_shortfall());

    let _ = writeln!(out, "\n=== SCHEDULE ===");
    for category in &plan.categories {
        let _ = writeln!(out);
        write_days(&mut out, category);
    }
    out
}
