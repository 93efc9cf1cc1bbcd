use hornet_ir::{Expr, Sort};

use crate::error::SmtError;

/// Serialise an expression as a canonical SMT-LIB2 term.
///
/// Serialisation is a pure function of the expression; backends share it.
/// κ applications must be expanded before printing and are rejected.
pub fn to_smtlib(e: &Expr) -> Result<String, SmtError> {
    let mut out = String::new();
    write_expr(e, &mut out)?;
    Ok(out)
}

fn write_expr(e: &Expr, out: &mut String) -> Result<(), SmtError> {
    match e {
        Expr::Var(s) => out.push_str(s.as_str()),
        Expr::IntLit(n) => {
            if *n < 0 {
                out.push_str("(- ");
                out.push_str(&n.unsigned_abs().to_string());
                out.push(')');
            } else {
                out.push_str(&n.to_string());
            }
        }
        Expr::BoolLit(b) => out.push_str(if *b { "true" } else { "false" }),
        Expr::Add(a, b) => write_binary("+", a, b, out)?,
        Expr::Sub(a, b) => write_binary("-", a, b, out)?,
        Expr::Mul(a, b) => write_binary("*", a, b, out)?,
        Expr::Neg(a) => {
            out.push_str("(- ");
            write_expr(a, out)?;
            out.push(')');
        }
        Expr::Eq(a, b) => write_binary("=", a, b, out)?,
        Expr::Ne(a, b) => {
            out.push_str("(not ");
            write_binary("=", a, b, out)?;
            out.push(')');
        }
        Expr::Lt(a, b) => write_binary("<", a, b, out)?,
        Expr::Le(a, b) => write_binary("<=", a, b, out)?,
        Expr::Gt(a, b) => write_binary(">", a, b, out)?,
        Expr::Ge(a, b) => write_binary(">=", a, b, out)?,
        Expr::And(ps) => write_nary("and", "true", ps, out)?,
        Expr::Or(ps) => write_nary("or", "false", ps, out)?,
        Expr::Not(a) => {
            out.push_str("(not ");
            write_expr(a, out)?;
            out.push(')');
        }
        Expr::Implies(a, b) => write_binary("=>", a, b, out)?,
        Expr::Iff(a, b) => write_binary("=", a, b, out)?,
        Expr::App(f, args) => {
            if args.is_empty() {
                out.push_str(f.as_str());
            } else {
                out.push('(');
                out.push_str(f.as_str());
                for a in args {
                    out.push(' ');
                    write_expr(a, out)?;
                }
                out.push(')');
            }
        }
        Expr::Ite(c, t, e2) => {
            out.push_str("(ite ");
            write_expr(c, out)?;
            out.push(' ');
            write_expr(t, out)?;
            out.push(' ');
            write_expr(e2, out)?;
            out.push(')');
        }
        Expr::Forall(binders, body) => write_quant("forall", binders, body, out)?,
        Expr::Exists(binders, body) => write_quant("exists", binders, body, out)?,
        Expr::KVar(k, _) => return Err(SmtError::UnexpectedKVar(k.to_string())),
    }
    Ok(())
}

fn write_binary(op: &str, a: &Expr, b: &Expr, out: &mut String) -> Result<(), SmtError> {
    out.push('(');
    out.push_str(op);
    out.push(' ');
    write_expr(a, out)?;
    out.push(' ');
    write_expr(b, out)?;
    out.push(')');
    Ok(())
}

fn write_nary(
    op: &str,
    identity: &str,
    ps: &[Expr],
    out: &mut String,
) -> Result<(), SmtError> {
    match ps {
        [] => out.push_str(identity),
        [p] => write_expr(p, out)?,
        _ => {
            out.push('(');
            out.push_str(op);
            for p in ps {
                out.push(' ');
                write_expr(p, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn write_quant(
    kw: &str,
    binders: &[(hornet_ir::Symbol, Sort)],
    body: &Expr,
    out: &mut String,
) -> Result<(), SmtError> {
    out.push('(');
    out.push_str(kw);
    out.push_str(" (");
    for (i, (sym, sort)) in binders.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push('(');
        out.push_str(sym.as_str());
        out.push(' ');
        out.push_str(&sort_to_smtlib(sort));
        out.push(')');
    }
    out.push_str(") ");
    write_expr(body, out)?;
    out.push(')');
    Ok(())
}

/// Serialise a sort. Functional sorts never print inline; they are split
/// into argument and return sorts at `declare-fun` sites.
pub fn sort_to_smtlib(sort: &Sort) -> String {
    match sort {
        Sort::Bool => "Bool".to_string(),
        Sort::Int => "Int".to_string(),
        Sort::Func(_, ret) => sort_to_smtlib(ret),
    }
}
