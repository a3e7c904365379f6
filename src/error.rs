use std::fmt;
use std::rc::Rc;

use crate::context::CallContext;
use crate::position::Span;

/// The three failure phases of the pipeline. Lex errors are split into the
/// shapes the lexer can actually produce so callers can match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalChar,
    ExpectedChar,
    UnterminatedString,
    Syntax,
    Runtime,
}

impl ErrorKind {
    fn display_name(self) -> &'static str {
        match self {
            ErrorKind::IllegalChar => "Illegal Character",
            ErrorKind::ExpectedChar => "Expected Character",
            ErrorKind::UnterminatedString => "Unterminated String",
            ErrorKind::Syntax => "Invalid Syntax",
            ErrorKind::Runtime => "Runtime Error",
        }
    }
}

/// One traceback entry. `span` is where execution was inside the named
/// call context: the error position for the innermost frame, the call
/// site for every frame above it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub span: Span,
    pub name: String,
}

/// A fully attributable diagnostic: kind, detail text, the offending span,
/// and (for runtime errors) the call-context chain captured at the point
/// of failure, innermost frame first.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub details: String,
    pub span: Span,
    pub trace: Vec<Frame>,
}

impl Error {
    pub(crate) fn illegal_char(span: Span, ch: char) -> Self {
        Self {
            kind: ErrorKind::IllegalChar,
            details: format!("'{}'", ch),
            span,
            trace: Vec::new(),
        }
    }

    pub(crate) fn expected_char(span: Span, details: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ExpectedChar,
            details: details.into(),
            span,
            trace: Vec::new(),
        }
    }

    pub(crate) fn unterminated_string(span: Span) -> Self {
        Self {
            kind: ErrorKind::UnterminatedString,
            details: "reached end of input before closing '\"'".to_string(),
            span,
            trace: Vec::new(),
        }
    }

    pub(crate) fn syntax(span: Span, details: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            details: details.into(),
            span,
            trace: Vec::new(),
        }
    }

    /// A runtime error captures the active call-context chain so the
    /// renderer can print a traceback. The innermost frame pairs the
    /// error span with the failing context; each outer frame pairs a
    /// call-site span with the caller's context.
    pub(crate) fn runtime(span: Span, details: impl Into<String>, ctx: &Rc<CallContext>) -> Self {
        let mut trace = Vec::new();
        let mut at = span.clone();
        let mut current = Some(ctx.clone());
        while let Some(c) = current {
            trace.push(Frame {
                span: at.clone(),
                name: c.name.clone(),
            });
            match &c.call_site {
                Some(site) => at = site.clone(),
                None => break,
            }
            current = c.parent.clone();
        }
        Self {
            kind: ErrorKind::Runtime,
            details: details.into(),
            span,
            trace,
        }
    }

    /// Whether the error points at the very end of its source. The REPL
    /// uses this to tell "the construct is unfinished" apart from a real
    /// syntax mistake.
    pub fn at_end_of_input(&self) -> bool {
        self.span.start.index >= self.span.src.text.chars().count()
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}: {}\n", self.kind.display_name(), self.details);
        out.push_str(&format!(
            "File {}, line {}\n\n",
            self.span.src.name,
            self.span.start.line + 1
        ));
        out.push_str(&underline(&self.span));
        for frame in &self.trace {
            out.push_str(&format!(
                "File {}, line {}, in {}\n",
                frame.span.src.name,
                frame.span.start.line + 1,
                frame.name
            ));
        }
        out
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for Error {}

/// Echo the offending line(s) with a `^` underline beneath the span.
/// Tabs are stripped from the output so the carets stay aligned.
fn underline(span: &Span) -> String {
    let start = span.start;
    // A span that ends at column zero of a later line stops, visually, at
    // the end of the previous line.
    let (end_line, end_col) = if span.end.line > start.line && span.end.column == 0 {
        (span.end.line - 1, usize::MAX)
    } else {
        (span.end.line, span.end.column)
    };

    let mut out = String::new();
    for line_no in start.line..=end_line {
        let line = span.src.line_text(line_no);
        let width = line.chars().count();
        let col_start = if line_no == start.line { start.column } else { 0 };
        let col_end = if line_no == end_line {
            end_col.min(width.max(col_start + 1))
        } else {
            width
        };
        out.push_str(line);
        out.push('\n');
        out.push_str(&" ".repeat(col_start));
        out.push_str(&"^".repeat(col_end.saturating_sub(col_start).max(1)));
        out.push('\n');
    }
    out.replace('\t', "")
}
