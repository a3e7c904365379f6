use std::rc::Rc;

/// A named piece of source text.
///
/// Spans keep a shared handle to their source so a diagnostic can be
/// rendered long after the lexer and parser that produced it are gone,
/// including across files pulled in by the `run` builtin.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            text: text.into(),
        })
    }

    pub(crate) fn line_text(&self, line: usize) -> &str {
        self.text.lines().nth(line).unwrap_or("")
    }
}

/// A single scan position: character index plus zero-based line and column.
/// Diagnostics add one to the line when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    /// Offset in characters (not bytes) from the start of the source.
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Pos {
    pub(crate) fn advance(&mut self, ch: char) {
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

/// A half-open `[start, end)` region of one source. Every token and AST
/// node carries one; the invariant throughout the pipeline is that a
/// node's span starts where its first child starts and ends where its
/// last child ends.
#[derive(Clone)]
pub struct Span {
    pub src: Rc<Source>,
    pub start: Pos,
    pub end: Pos,
}

/// Compact form: AST dumps would otherwise repeat the whole source text
/// once per node through the `Rc<Source>` handle.
impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}..{}:{}",
            self.start.line + 1,
            self.start.column,
            self.end.line + 1,
            self.end.column
        )
    }
}

impl Span {
    pub(crate) fn new(src: &Rc<Source>, start: Pos, end: Pos) -> Self {
        Self {
            src: src.clone(),
            start,
            end,
        }
    }

    /// Widen: from the start of `self` to the end of `other`.
    pub(crate) fn to(&self, other: &Span) -> Span {
        Span {
            src: self.src.clone(),
            start: self.start,
            end: other.end,
        }
    }

    /// The exact source text this span covers.
    pub(crate) fn slice(&self) -> String {
        self.src
            .text
            .chars()
            .skip(self.start.index)
            .take(self.end.index.saturating_sub(self.start.index))
            .collect()
    }
}
