use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use hornet_engine::{solve_with_session, FixConfig, FixResult, FixStatus};
use hornet_ir::{Query, SolverInfo};
use hornet_smt::printer::to_smtlib;
use hornet_smt::{SessionConfig, SmtSession, SolverKind};

#[derive(Parser)]
#[command(name = "hornet")]
#[command(about = "Horn-clause constraint solver over κ-variables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a JSON constraint query
    Solve {
        /// Path to the query file
        file: PathBuf,

        /// Solver backend: z3 | mathsat | cvc4
        #[arg(long, default_value = "z3")]
        solver: String,

        /// Minimise each κ's conjunction after solving
        #[arg(long, default_value_t = false)]
        minimal_sol: bool,

        /// Report worklist/constraint statistics
        #[arg(long, default_value_t = false)]
        stats: bool,

        /// Mirror the SMT conversation to `<file>.smt2`
        #[arg(long, default_value_t = false)]
        smt_log: bool,

        /// Keep MBQI enabled (extensionality reasoning)
        #[arg(long, default_value_t = false)]
        extensionality: bool,

        /// Enable the string theory (requires z3 >= 4.4.2)
        #[arg(long, default_value_t = false)]
        string_theory: bool,

        /// Treat expressions as alpha-equivalent upstream
        #[arg(long, default_value_t = false)]
        alpha_equivalence: bool,

        /// Treat expressions as beta-equivalent upstream
        #[arg(long, default_value_t = false)]
        beta_equivalence: bool,

        /// Normalise expressions upstream
        #[arg(long, default_value_t = false)]
        normal_form: bool,

        /// Delegate to the external gradual solver
        #[arg(long, default_value_t = false)]
        gradual: bool,

        /// The query was pre-processed by the external κ-eliminator
        #[arg(long, default_value_t = false)]
        use_elim: bool,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve {
            file,
            solver,
            minimal_sol,
            stats,
            smt_log,
            extensionality,
            string_theory,
            alpha_equivalence,
            beta_equivalence,
            normal_form,
            gradual,
            use_elim,
            format,
        } => {
            let solver = parse_solver(&solver)?;
            let text = fs::read_to_string(&file).into_diagnostic()?;
            let query: Query = serde_json::from_str(&text).into_diagnostic()?;
            let info = SolverInfo::build(query).into_diagnostic()?;

            let session_cfg = SessionConfig {
                solver,
                extensionality,
                string_theory,
                alpha_equivalence,
                beta_equivalence,
                normal_form,
                log_file: smt_log.then(|| smt_log_path(&file)),
            };
            let fix_cfg = FixConfig {
                minimal_sol,
                solver_stats: stats,
                gradual,
                use_elim,
            };

            let mut session = SmtSession::open(session_cfg).into_diagnostic()?;
            let solved = solve_with_session(&info, &fix_cfg, &mut session);
            match session.close() {
                Ok(status) if !status.success() => {
                    warn!(?status, "solver subprocess exited abnormally");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "error closing solver session"),
            }

            let result = match solved {
                Ok(result) => result,
                Err(e) => FixResult::crashed(e.to_string()),
            };
            render(&result, &format)?;
            std::process::exit(match result.status {
                FixStatus::Safe => 0,
                FixStatus::Unsafe(_) => 1,
                FixStatus::Crash { .. } => 2,
            });
        }
    }
}

fn parse_solver(name: &str) -> miette::Result<SolverKind> {
    match name {
        "z3" => Ok(SolverKind::Z3),
        "mathsat" => Ok(SolverKind::MathSat),
        "cvc4" => Ok(SolverKind::Cvc4),
        other => miette::bail!("unknown solver `{other}` (expected z3, mathsat, or cvc4)"),
    }
}

/// Transcript path derived from the query file: `<file>.smt2`.
fn smt_log_path(file: &PathBuf) -> PathBuf {
    let mut os = file.clone().into_os_string();
    os.push(".smt2");
    PathBuf::from(os)
}

fn render(result: &FixResult, format: &str) -> miette::Result<()> {
    match format {
        "text" => {
            print!("{result}");
            Ok(())
        }
        "json" => {
            let unsafe_cs: Vec<serde_json::Value> = match &result.status {
                FixStatus::Unsafe(cs) => cs
                    .iter()
                    .map(|(id, tag)| serde_json::json!({ "id": id, "tag": tag }))
                    .collect(),
                _ => Vec::new(),
            };
            let solution: serde_json::Map<String, serde_json::Value> = result
                .solution
                .iter()
                .map(|(k, p)| {
                    let text = to_smtlib(p).unwrap_or_else(|_| format!("{p:?}"));
                    (k.to_string(), serde_json::Value::String(text))
                })
                .collect();
            let out = serde_json::json!({
                "status": result.status.verdict_class(),
                "unsafe": unsafe_cs,
                "solution": solution,
                "warnings": result.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
            Ok(())
        }
        other => miette::bail!("unknown format `{other}` (expected text or json)"),
    }
}
