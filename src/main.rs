//! supersplit - Weekly superset program planner

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use supersplit::catalog::{self, Catalog};
use supersplit::db::{Database, StoredPlan};
use supersplit::model::objective::ObjectiveKind;
use supersplit::model::schedule::ScheduleStrategy;
use supersplit::tui::App;
use supersplit::{Outcome, Planner, report};

const DB_PATH: &str = "supersplit.db";

#[derive(Parser)]
#[command(name = "supersplit")]
#[command(author, version, about = "Weekly superset program planner")]
struct Cli {
    /// Catalog JSON file (built-in catalog when omitted)
    #[arg(long, global = true, env = "SUPERSPLIT_CATALOG")]
    catalog: Option<PathBuf>,

    /// Plan history database
    #[arg(long, global = true, env = "SUPERSPLIT_DB", default_value = DB_PATH)]
    db: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Per-run overrides of the catalog's tuning section
#[derive(Args)]
struct TuningArgs {
    /// Maximum activation overlap inside a superset
    #[arg(long)]
    threshold: Option<f64>,

    /// sum-shortfall, minimax, asymmetric or percentage
    #[arg(long)]
    objective: Option<ObjectiveKind>,

    /// conflict-slack or overlap
    #[arg(long)]
    schedule: Option<ScheduleStrategy>,

    /// Solve day assignments of all categories concurrently
    #[arg(long)]
    parallel: bool,
}

impl TuningArgs {
    fn apply(&self, catalog: &mut Catalog) {
        let tuning = &mut catalog.tuning;
        if let Some(threshold) = self.threshold {
            tuning.overlap_threshold = threshold;
        }
        if let Some(objective) = self.objective {
            tuning.objective = objective;
        }
        if let Some(schedule) = self.schedule {
            tuning.schedule = schedule;
        }
        tuning.parallel_days |= self.parallel;
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI plan browser
    Tui,

    /// Solve a weekly plan and print the report
    Solve {
        #[command(flatten)]
        tuning: TuningArgs,

        /// Store the plan in the history database
        #[arg(short, long)]
        save: bool,

        /// Print the plan as JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Validate the catalog and show quotas without solving
    Check {
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Print the built-in catalog as JSON
    Catalog,

    /// List saved plans
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Print the report of a saved plan
    Show {
        /// Plan id from `history`
        id: i64,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load(path),
        None => Ok(catalog::builtin()),
    }
}

fn solve(cli: &Cli, tuning: &TuningArgs, save: bool, json: bool) -> Result<()> {
    let mut catalog = load_catalog(cli.catalog.as_ref())?;
    tuning.apply(&mut catalog);

    let planner = Planner::new(&catalog)?;
    let plan = match planner.plan()? {
        Outcome::Optimal(plan) | Outcome::Feasible(plan) => plan,
        Outcome::Infeasible => bail!("No feasible plan: not enough compatible supersets for the quotas"),
        Outcome::Failed(message) => bail!("Solver failed: {message}"),
    };

    if json {
        println!("{}", plan.to_json()?);
    } else {
        print!("{}", report::render(&plan));
    }

    if save {
        let db = Database::open(&cli.db)?;
        let stored = StoredPlan::new(catalog.fingerprint()?, plan);
        if let Some(best) = db.regression(&stored)? {
            warn!(
                objective = stored.objective,
                best,
                kind = %stored.objective_kind,
                "New plan is worse than a saved plan for the same catalog"
            );
        }
        let id = db.add_plan(&stored)?;
        info!(id, "Plan saved");
        println!("Saved plan {id}");
    }
    Ok(())
}

fn check(cli: &Cli, tuning: &TuningArgs) -> Result<()> {
    let mut catalog = load_catalog(cli.catalog.as_ref())?;
    tuning.apply(&mut catalog);
    let planner = Planner::new(&catalog)?;

    println!("Catalog {} is valid", catalog.fingerprint()?);
    println!(
        "{} muscles, {} machines, {} exercises",
        catalog.muscles.len(),
        catalog.equipment.len(),
        catalog.exercises.len()
    );
    println!("{:-<60}", "");
    for (c, (category, quota)) in catalog.categories.iter().zip(planner.quotas()).enumerate() {
        println!(
            "{:10} | {} days x {} supersets | {} instances | {} compatible pairs",
            category.id,
            quota.days,
            quota.pairs_per_day,
            quota.instances,
            planner.gate().pairs(c).len()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Solve { tuning, save, json }) => solve(&cli, tuning, *save, *json)?,

        Some(Commands::Check { tuning }) => check(&cli, tuning)?,

        Some(Commands::Catalog) => {
            println!("{}", catalog::builtin().to_json()?);
        }

        Some(Commands::History { limit }) => {
            let db = Database::open(&cli.db)?;
            let plans = db.get_plans()?;
            println!("Saved plans:");
            println!("{:-<72}", "");
            for p in plans.iter().take(*limit) {
                println!(
                    "{:4} | {} | {:14} | {:10} | {:8.3} | {}",
                    p.id.unwrap_or_default(),
                    p.date.format("%Y-%m-%d %H:%M"),
                    p.objective_kind,
                    p.status,
                    p.objective,
                    p.fingerprint
                );
            }
        }

        Some(Commands::Show { id }) => {
            let db = Database::open(&cli.db)?;
            let stored = db
                .get_plan(*id)?
                .with_context(|| format!("No saved plan with id {id}"))?;
            println!("Plan {id} solved {}", stored.date.format("%Y-%m-%d %H:%M"));
            print!("{}", report::render(&stored.plan));
        }

        Some(Commands::Tui) | None => {
            let db = Database::open(&cli.db)?;
            let mut app = App::new(db)?;
            app.run()?;
        }
    }

    Ok(())
}
