use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use hornet_ir::{Expr, Sort, Symbol};

use crate::error::SmtError;
use crate::printer::{sort_to_smtlib, to_smtlib};
use crate::response::{parse_response, Response};

/// Which solver subprocess to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    Z3,
    MathSat,
    Cvc4,
}

impl SolverKind {
    /// Fixed spawn command for each backend.
    pub fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            SolverKind::Z3 => ("z3", &["-smt2", "-in"]),
            SolverKind::MathSat => ("mathsat", &["-input=smt2"]),
            SolverKind::Cvc4 => ("cvc4", &["--incremental", "-L", "smtlib2"]),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Z3 => "z3",
            SolverKind::MathSat => "mathsat",
            SolverKind::Cvc4 => "cvc4",
        }
    }
}

/// Session configuration.
///
/// The three normalisation toggles are not interpreted here; they are
/// surfaced on the session for downstream passes that share its lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub solver: SolverKind,
    /// When off, Z3 is started with MBQI disabled.
    pub extensionality: bool,
    /// Requires Z3 >= 4.4.2.
    pub string_theory: bool,
    pub alpha_equivalence: bool,
    pub beta_equivalence: bool,
    pub normal_form: bool,
    /// Mirror the conversation to this file (commands verbatim, responses
    /// as `; SMT Says:` comments).
    pub log_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            solver: SolverKind::Z3,
            extensionality: false,
            string_theory: false,
            alpha_equivalence: false,
            beta_equivalence: false,
            normal_form: false,
            log_file: None,
        }
    }
}

/// Verdict of a `check-sat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// Minimum Z3 version with the renamed option preamble.
const Z3_NEW_OPTIONS: &[u32] = &[4, 3, 2];
/// Minimum Z3 version with the string theory.
const Z3_STRING_THEORY: &[u32] = &[4, 4, 2];

/// Lexicographic comparison over dot-split version components:
/// `[4,3,2,1] >= [4,3,2]`.
pub fn version_at_least(have: &[u32], want: &[u32]) -> bool {
    have >= want
}

/// One long-lived solver subprocess conversation.
///
/// Commands reach the solver in program order; exactly one response is read
/// per reading command. The session owns the subprocess handles exclusively
/// and must not be shared across threads.
pub struct SmtSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    log: Option<File>,
    pub config: SessionConfig,
    z3_version: Option<Vec<u32>>,
}

impl SmtSession {
    /// Spawn the configured solver, query its version (Z3), and emit the
    /// option preamble. Fails before spawning when the configuration is
    /// unsatisfiable (e.g. string theory on a non-Z3 backend).
    pub fn open(config: SessionConfig) -> Result<Self, SmtError> {
        if config.string_theory && config.solver != SolverKind::Z3 {
            return Err(SmtError::Unsupported(format!(
                "string theory requires z3 >= 4.4.2, not {}",
                config.solver.name()
            )));
        }

        let log = match &config.log_file {
            None => None,
            Some(path) => {
                if let Some(dir) = path.parent() {
                    if !dir.as_os_str().is_empty() {
                        fs::create_dir_all(dir)?;
                    }
                }
                Some(File::create(path)?)
            }
        };

        let (cmd, args) = config.solver.command();
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SmtError::Spawn {
                cmd: cmd.to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            SmtError::Solver(format!("failed to capture {cmd} stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SmtError::Solver(format!("failed to capture {cmd} stdout"))
        })?;

        let mut session = SmtSession {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            log,
            config,
            z3_version: None,
        };
        session.startup()?;
        Ok(session)
    }

    fn startup(&mut self) -> Result<(), SmtError> {
        if self.config.solver != SolverKind::Z3 {
            return Ok(());
        }
        let version = self.query_z3_version()?;
        debug!(target: "hornet::smt", ?version, "z3 version");

        if self.config.string_theory && !version_at_least(&version, Z3_STRING_THEORY) {
            return Err(SmtError::Unsupported(format!(
                "string theory requires z3 >= 4.4.2, found {}",
                join_version(&version)
            )));
        }

        // Option names changed in 4.3.2.
        let new_names = version_at_least(&version, Z3_NEW_OPTIONS);
        self.smt_write("(set-option :auto-config false)")?;
        self.smt_write("(set-option :model true)")?;
        if new_names {
            self.smt_write("(set-option :model.partial false)")?;
            if !self.config.extensionality {
                self.smt_write("(set-option :smt.mbqi false)")?;
            }
        } else {
            self.smt_write("(set-option :model-partial false)")?;
            if !self.config.extensionality {
                self.smt_write("(set-option :mbqi false)")?;
            }
        }
        if self.config.string_theory {
            self.smt_write("(set-option :smt.string_solver z3str3)")?;
        }
        self.z3_version = Some(version);
        Ok(())
    }

    /// `(get-info :version)` replies `(:version "4.8.12")`; this is the one
    /// response outside the verdict/model grammar, so it is read raw.
    fn query_z3_version(&mut self) -> Result<Vec<u32>, SmtError> {
        self.smt_write("(get-info :version)")?;
        let line = read_solver_line(&mut self.stdout)?;
        self.log_line(&format!("; SMT Says: {line}"))?;
        let quoted = line
            .split('"')
            .nth(1)
            .ok_or_else(|| SmtError::Parse(format!("unexpected version reply `{line}`")))?;
        parse_version(quoted)
            .ok_or_else(|| SmtError::Parse(format!("cannot parse version `{quoted}`")))
    }

    pub fn z3_version(&self) -> Option<&[u32]> {
        self.z3_version.as_deref()
    }

    fn log_line(&mut self, line: &str) -> Result<(), SmtError> {
        if let Some(log) = &mut self.log {
            writeln!(log, "{line}")?;
        }
        Ok(())
    }

    /// Send one command line: newline-terminated, explicitly flushed,
    /// mirrored verbatim to the transcript log.
    fn smt_write(&mut self, line: &str) -> Result<(), SmtError> {
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        self.log_line(line)?;
        Ok(())
    }

    /// Read exactly one response, pulling extra lines when the parser asks.
    fn smt_read(&mut self) -> Result<Response, SmtError> {
        let first = read_solver_line(&mut self.stdout)?;
        let reader = &mut self.stdout;
        let resp = parse_response(&first, || read_solver_line(&mut *reader))?;
        self.log_line(&format!("; SMT Says: {resp}"))?;
        Ok(resp)
    }

    pub fn declare_fun(
        &mut self,
        sym: &Symbol,
        args: &[Sort],
        ret: &Sort,
    ) -> Result<(), SmtError> {
        let args: Vec<String> = args.iter().map(sort_to_smtlib).collect();
        self.smt_write(&format!(
            "(declare-fun {sym} ({}) {})",
            args.join(" "),
            sort_to_smtlib(ret)
        ))
    }

    pub fn assert_pred(&mut self, p: &Expr) -> Result<(), SmtError> {
        let p = to_smtlib(p)?;
        self.smt_write(&format!("(assert {p})"))
    }

    pub fn assert_with_trigger(
        &mut self,
        p: &Expr,
        triggers: &[Expr],
    ) -> Result<(), SmtError> {
        let p = to_smtlib(p)?;
        let ts: Result<Vec<String>, SmtError> = triggers.iter().map(to_smtlib).collect();
        self.smt_write(&format!(
            "(assert (! {p} :pattern ({})))",
            ts?.join(" ")
        ))
    }

    pub fn assert_distinct(&mut self, es: &[Expr]) -> Result<(), SmtError> {
        let parts: Result<Vec<String>, SmtError> = es.iter().map(to_smtlib).collect();
        self.smt_write(&format!("(assert (distinct {}))", parts?.join(" ")))
    }

    pub fn push(&mut self) -> Result<(), SmtError> {
        self.smt_write("(push 1)")
    }

    pub fn pop(&mut self) -> Result<(), SmtError> {
        self.smt_write("(pop 1)")
    }

    pub fn check_sat(&mut self) -> Result<SatResult, SmtError> {
        self.smt_write("(check-sat)")?;
        match self.smt_read()? {
            Response::Sat => Ok(SatResult::Sat),
            Response::Unsat => Ok(SatResult::Unsat),
            Response::Unknown => Ok(SatResult::Unknown),
            Response::Error(msg) => Err(SmtError::Solver(msg)),
            other => Err(SmtError::Parse(format!(
                "expected a verdict, got `{other}`"
            ))),
        }
    }

    pub fn get_values(
        &mut self,
        syms: &[Symbol],
    ) -> Result<Vec<(Symbol, String)>, SmtError> {
        let names: Vec<&str> = syms.iter().map(Symbol::as_str).collect();
        self.smt_write(&format!("(get-value ({}))", names.join(" ")))?;
        match self.smt_read()? {
            Response::Values(vs) => Ok(vs),
            Response::Error(msg) => Err(SmtError::Solver(msg)),
            other => Err(SmtError::Parse(format!("expected a model, got `{other}`"))),
        }
    }

    /// Scoped push/pop: pops on every exit path, including failures of the
    /// body, so the outer assertion stack is restored.
    pub fn bracket<T>(
        &mut self,
        label: &str,
        body: impl FnOnce(&mut Self) -> Result<T, SmtError>,
    ) -> Result<T, SmtError> {
        debug!(target: "hornet::smt", label, "bracket");
        self.push()?;
        let out = body(self);
        let popped = self.pop();
        match out {
            Err(e) => Err(e),
            Ok(v) => popped.map(|_| v),
        }
    }

    /// Terminate the conversation and reap the subprocess. Handle errors
    /// are reported but non-fatal; the exit status is returned.
    pub fn close(mut self) -> Result<ExitStatus, SmtError> {
        if let Err(e) = writeln!(self.stdin, "(exit)").and_then(|_| self.stdin.flush()) {
            warn!(target: "hornet::smt", error = %e, "error closing solver stdin");
        }
        let status = self.child.wait()?;
        Ok(status)
    }
}

impl Drop for SmtSession {
    fn drop(&mut self) {
        // Backstop for sessions dropped on error paths; `close` waits the
        // child first, in which case these are no-ops.
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

fn read_solver_line(reader: &mut BufReader<ChildStdout>) -> Result<String, SmtError> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(SmtError::Parse(
            "solver closed its output stream".to_string(),
        ));
    }
    Ok(line.trim_end().to_string())
}

fn parse_version(s: &str) -> Option<Vec<u32>> {
    let parts: Vec<u32> = s
        .split('.')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

fn join_version(v: &[u32]) -> String {
    v.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_commands_are_fixed() {
        assert_eq!(SolverKind::Z3.command(), ("z3", &["-smt2", "-in"][..]));
        assert_eq!(
            SolverKind::MathSat.command(),
            ("mathsat", &["-input=smt2"][..])
        );
        assert_eq!(
            SolverKind::Cvc4.command(),
            ("cvc4", &["--incremental", "-L", "smtlib2"][..])
        );
    }

    #[test]
    fn version_compare_is_lexicographic() {
        assert!(version_at_least(&[4, 3, 2, 1], &[4, 3, 2]));
        assert!(version_at_least(&[4, 3, 2], &[4, 3, 2]));
        assert!(version_at_least(&[4, 4], &[4, 3, 2]));
        assert!(!version_at_least(&[4, 3, 1], &[4, 3, 2]));
        assert!(!version_at_least(&[4, 3], &[4, 3, 2]));
        assert!(!version_at_least(&[3, 9, 9], &[4, 3, 2]));
    }

    #[test]
    fn parse_version_accepts_dot_split_integers() {
        assert_eq!(parse_version("4.8.12"), Some(vec![4, 8, 12]));
        assert_eq!(parse_version("4"), Some(vec![4]));
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("4.x"), None);
    }

    #[test]
    fn string_theory_on_non_z3_fails_before_spawn() {
        let cfg = SessionConfig {
            solver: SolverKind::Cvc4,
            string_theory: true,
            ..SessionConfig::default()
        };
        assert!(matches!(
            SmtSession::open(cfg),
            Err(SmtError::Unsupported(_))
        ));
    }

    #[test]
    fn default_config_targets_z3_without_string_theory() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.solver, SolverKind::Z3);
        assert!(!cfg.string_theory);
        assert!(!cfg.extensionality);
        assert!(cfg.log_file.is_none());
    }
}
