//! Shared error utilities used across the compilation pipeline.
//!
//! Every failure is fatal and carries enough context to print a located
//! diagnostic: file, line, column, the offending source line and a caret
//! range underlining the token. The exit code of the process is derived
//! from the error kind.

use snafu::Snafu;
use std::fmt;

pub type CompileResult<T> = Result<T, CompileError>;

/// Owned source context attached to located errors.
///
/// Built from a token's borrowed location at the moment an error is
/// constructed, so the error can outlive the source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  pub file: String,
  pub line: u32,
  pub column: u32,
  pub end_line: u32,
  pub end_column: u32,
  pub line_text: String,
}

impl Diagnostic {
  /// The source line plus a caret range underneath it.
  pub fn context(&self) -> String {
    let start = self.column.saturating_sub(1) as usize;
    let width = if self.end_line == self.line {
      (self.end_column.saturating_sub(self.column) as usize).max(1)
    } else {
      // The token runs past this line; underline to the end of it.
      self.line_text.len().saturating_sub(start).max(1)
    };
    format!("  {}\n  {}{}", self.line_text, " ".repeat(start), "^".repeat(width))
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.file, self.line, self.column)
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{path}: {source}"))]
  Io {
    path: String,
    source: std::io::Error,
  },

  #[snafu(display("{location}: unterminated string literal\n{}", location.context()))]
  UnterminatedString { location: Diagnostic },

  #[snafu(display("{location}: unterminated character literal\n{}", location.context()))]
  UnterminatedChar { location: Diagnostic },

  #[snafu(display("{location}: unknown character '{character}'\n{}", location.context()))]
  UnknownCharacter { character: char, location: Diagnostic },

  #[snafu(display("{location}: expected {expected}, but got {found}\n{}", location.context()))]
  UnexpectedToken {
    expected: String,
    found: String,
    location: Diagnostic,
  },

  #[snafu(display("{location}: invalid number literal {found}\n{}", location.context()))]
  InvalidNumber { found: String, location: Diagnostic },

  #[snafu(display(
    "{location}: unexpected {found} in grammar rule; expected an identifier, a literal, ';' or '|'\n{}",
    location.context()
  ))]
  GrammarSyntax { found: String, location: Diagnostic },

  #[snafu(display("grammar references undefined rules: {}", names.join(", ")))]
  UnresolvedRules { names: Vec<String> },

  #[snafu(display("reduce/reduce conflict in state {state}"))]
  ReduceReduceConflict { state: usize },

  #[snafu(display(
    "{location}: syntax error: unable to shift or reduce {found}; expected one of: {}\n{}",
    expected.join(", "),
    location.context()
  ))]
  Syntax {
    found: String,
    expected: Vec<String>,
    location: Diagnostic,
  },

  #[snafu(display("parser ran out of stack states"))]
  StackExhausted,

  #[snafu(display("use of undefined variable '{name}'"))]
  UndefinedVariable { name: String },

  #[snafu(display("code generation for {construct} is not implemented"))]
  NotImplemented { construct: String },

  #[snafu(display("fasm exited with status {code}"))]
  AssemblerFailed { code: i32 },
}

impl CompileError {
  /// Process exit code for this error kind.
  pub fn exit_code(&self) -> i32 {
    match self {
      CompileError::UnresolvedRules { .. } => 2,
      CompileError::ReduceReduceConflict { .. } => 3,
      CompileError::Syntax { .. } | CompileError::StackExhausted => 4,
      _ => 1,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn diagnostic() -> Diagnostic {
    Diagnostic {
      file: "test.cpp".to_string(),
      line: 3,
      column: 5,
      end_line: 3,
      end_column: 8,
      line_text: "int foo;".to_string(),
    }
  }

  #[test]
  fn located_errors_point_at_the_token() {
    let err = CompileError::UnexpectedToken {
      expected: "Identifier".to_string(),
      found: "';'".to_string(),
      location: diagnostic(),
    };
    let report = err.to_string();
    assert!(report.starts_with("test.cpp:3:5: expected Identifier, but got ';'"));
    assert!(report.contains("int foo;"));
    assert!(report.contains("    ^^^"));
  }

  #[test]
  fn exit_codes_follow_the_error_kind() {
    let unresolved = CompileError::UnresolvedRules {
      names: vec!["expr".to_string()],
    };
    assert_eq!(unresolved.exit_code(), 2);
    assert_eq!(CompileError::ReduceReduceConflict { state: 7 }.exit_code(), 3);

    let stuck = CompileError::Syntax {
      found: "';'".to_string(),
      expected: vec!["'('".to_string()],
      location: diagnostic(),
    };
    assert_eq!(stuck.exit_code(), 4);

    let lex = CompileError::UnterminatedString {
      location: diagnostic(),
    };
    assert_eq!(lex.exit_code(), 1);
  }
}
