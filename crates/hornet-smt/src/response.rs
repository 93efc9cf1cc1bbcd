use std::fmt;

use hornet_ir::Symbol;

use crate::error::SmtError;

/// A parsed solver response.
///
/// `Display` re-serialises the canonical form, so parsing then printing
/// reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Sat,
    Unsat,
    Unknown,
    Error(String),
    /// A `get-value` model: `((sym value) …)` with values kept verbatim.
    Values(Vec<(Symbol, String)>),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Sat => write!(f, "sat"),
            Response::Unsat => write!(f, "unsat"),
            Response::Unknown => write!(f, "unknown"),
            Response::Error(msg) => write!(f, "(error \"{msg}\")"),
            Response::Values(vs) => {
                write!(f, "(")?;
                for (i, (sym, val)) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({sym} {val})")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse one response starting from `first`, pulling further lines from
/// `refill` whenever the input so far is insufficient (multi-line errors,
/// models split across lines). The refill closure is the continuation of
/// the line reader.
pub fn parse_response<F>(first: &str, refill: F) -> Result<Response, SmtError>
where
    F: FnMut() -> Result<String, SmtError>,
{
    let mut cur = Cursor::new(first, refill);
    cur.skip_ws()?;
    match cur.peek()? {
        b'(' => cur.parse_sexp(),
        _ => {
            let word = cur.token()?;
            match word.as_str() {
                "sat" => Ok(Response::Sat),
                "unsat" => Ok(Response::Unsat),
                "unknown" => Ok(Response::Unknown),
                other => Err(SmtError::Parse(format!(
                    "expected sat/unsat/unknown or '(', got `{other}`"
                ))),
            }
        }
    }
}

struct Cursor<F> {
    buf: Vec<u8>,
    pos: usize,
    refill: F,
}

impl<F> Cursor<F>
where
    F: FnMut() -> Result<String, SmtError>,
{
    fn new(first: &str, refill: F) -> Self {
        Cursor {
            buf: first.as_bytes().to_vec(),
            pos: 0,
            refill,
        }
    }

    /// Make at least one unread byte available, reading more lines on demand.
    fn ensure(&mut self) -> Result<(), SmtError> {
        while self.pos >= self.buf.len() {
            let line = (self.refill)()?;
            if line.is_empty() {
                return Err(SmtError::Parse(
                    "unexpected end of solver output".to_string(),
                ));
            }
            self.buf.push(b'\n');
            self.buf.extend_from_slice(line.as_bytes());
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<u8, SmtError> {
        self.ensure()?;
        Ok(self.buf[self.pos])
    }

    fn bump(&mut self) -> Result<u8, SmtError> {
        let c = self.peek()?;
        self.pos += 1;
        Ok(c)
    }

    /// Skip whitespace already in the buffer; does not force a refill.
    fn skip_ws(&mut self) -> Result<(), SmtError> {
        while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        // Whitespace may run to the end of a line mid-expression; leave the
        // refill decision to the next peek.
        Ok(())
    }

    /// Skip whitespace, refilling until a non-blank byte arrives.
    fn skip_ws_hard(&mut self) -> Result<(), SmtError> {
        loop {
            self.skip_ws()?;
            if self.pos < self.buf.len() {
                return Ok(());
            }
            self.ensure()?;
        }
    }

    fn expect(&mut self, want: u8) -> Result<(), SmtError> {
        let got = self.bump()?;
        if got != want {
            return Err(SmtError::Parse(format!(
                "expected `{}`, got `{}`",
                want as char, got as char
            )));
        }
        Ok(())
    }

    /// A bare token: bytes up to whitespace or a parenthesis.
    fn token(&mut self) -> Result<String, SmtError> {
        self.skip_ws_hard()?;
        let start = self.pos;
        while self.pos < self.buf.len() {
            let c = self.buf[self.pos];
            if c.is_ascii_whitespace() || c == b'(' || c == b')' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(SmtError::Parse("expected a token".to_string()));
        }
        Ok(String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned())
    }

    /// A model value: either a bare token or a parenthesised token such as
    /// `(- 3)`, consumed wholesale with its parentheses preserved.
    fn value(&mut self) -> Result<String, SmtError> {
        self.skip_ws_hard()?;
        if self.peek()? != b'(' {
            return self.token();
        }
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let c = self.bump()?;
            match c {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        Ok(String::from_utf8_lossy(&self.buf[start..self.pos]).into_owned())
    }

    /// After the opening parenthesis: either `(error "…")` or a model.
    fn parse_sexp(&mut self) -> Result<Response, SmtError> {
        self.expect(b'(')?;
        self.skip_ws_hard()?;
        match self.peek()? {
            b'(' => return self.parse_values(),
            b')' => {
                self.pos += 1;
                return Ok(Response::Values(Vec::new()));
            }
            _ => {}
        }
        let head = self.token()?;
        if head != "error" {
            return Err(SmtError::Parse(format!(
                "expected `error` or a model pair, got `{head}`"
            )));
        }
        self.skip_ws_hard()?;
        self.expect(b'"')?;
        let start = self.pos;
        loop {
            let c = self.bump()?;
            if c == b'"' {
                break;
            }
        }
        let msg = String::from_utf8_lossy(&self.buf[start..self.pos - 1]).into_owned();
        self.skip_ws_hard()?;
        self.expect(b')')?;
        Ok(Response::Error(msg))
    }

    fn parse_values(&mut self) -> Result<Response, SmtError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws_hard()?;
            match self.peek()? {
                b')' => {
                    self.pos += 1;
                    return Ok(Response::Values(out));
                }
                b'(' => {
                    self.pos += 1;
                    let sym = self.token()?;
                    let val = self.value()?;
                    self.skip_ws_hard()?;
                    self.expect(b')')?;
                    out.push((Symbol::new(sym), val));
                }
                other => {
                    return Err(SmtError::Parse(format!(
                        "expected `(` or `)` in model, got `{}`",
                        other as char
                    )))
                }
            }
        }
    }
}
