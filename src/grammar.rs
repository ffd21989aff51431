//! Grammar definitions and the grammar-file loader.
//!
//! A grammar maps non-terminal names to rules; each rule is an ordered
//! list of alternatives and each alternative an ordered list of targets.
//! Rules are loaded from plain text of the form
//! `name -> target* ( '|' target* )* ;` where a target is a quoted
//! lexeme, the name of another rule, or one of the reserved terminal-class
//! names. The reserved name `Empty` contributes nothing and marks an
//! alternative as empty.

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Lexer, Token, TokenKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::mem;

/// Name of the synthetic start rule added when building the parse table.
pub const START_RULE: &str = "T";

/// Non-terminal every grammar must define; the start rule derives it.
pub const ENTRY_RULE: &str = "program";

/// Symbolic token categories a grammar can match without naming a lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TerminalClass {
  Identifier,
  IntegerLiteral,
  FloatLiteral,
  DoubleLiteral,
  CharLiteral,
  StringLiteral,
  BasicType,
  IntModifier,
  ValueModifier,
  Keyword,
  Eof,
}

impl TerminalClass {
  /// The grammar-file spelling of a class, if the name is reserved.
  fn from_name(name: &str) -> Option<TerminalClass> {
    match name {
      "Identifier" => Some(TerminalClass::Identifier),
      "IntegerLiteral" => Some(TerminalClass::IntegerLiteral),
      "FloatLiteral" => Some(TerminalClass::FloatLiteral),
      "DoubleLiteral" => Some(TerminalClass::DoubleLiteral),
      "CharLiteral" => Some(TerminalClass::CharLiteral),
      "StringLiteral" => Some(TerminalClass::StringLiteral),
      "BasicType" => Some(TerminalClass::BasicType),
      "IntModifier" => Some(TerminalClass::IntModifier),
      "ValueModifier" => Some(TerminalClass::ValueModifier),
      "Keyword" => Some(TerminalClass::Keyword),
      "Eof" => Some(TerminalClass::Eof),
      _ => None,
    }
  }

  /// Whether a lexed token belongs to this class. All numeric classes
  /// match number-literal tokens; telling them apart is deferred.
  pub fn matches(self, token: &Token<'_>) -> bool {
    match self {
      TerminalClass::IntegerLiteral | TerminalClass::FloatLiteral | TerminalClass::DoubleLiteral => {
        token.kind == TokenKind::NumberLiteral
      }
      TerminalClass::Identifier => token.kind == TokenKind::Identifier,
      TerminalClass::CharLiteral => token.kind == TokenKind::CharLiteral,
      TerminalClass::StringLiteral => token.kind == TokenKind::StringLiteral,
      TerminalClass::BasicType => token.kind == TokenKind::BasicType,
      TerminalClass::IntModifier => token.kind == TokenKind::IntModifier,
      TerminalClass::ValueModifier => token.kind == TokenKind::ValueModifier,
      TerminalClass::Keyword => token.kind == TokenKind::Keyword,
      TerminalClass::Eof => token.kind == TokenKind::Eof,
    }
  }
}

impl fmt::Display for TerminalClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      TerminalClass::Identifier => "<Identifier>",
      TerminalClass::IntegerLiteral => "<IntegerLiteral>",
      TerminalClass::FloatLiteral => "<FloatLiteral>",
      TerminalClass::DoubleLiteral => "<DoubleLiteral>",
      TerminalClass::CharLiteral => "<CharLiteral>",
      TerminalClass::StringLiteral => "<StringLiteral>",
      TerminalClass::BasicType => "<BasicType>",
      TerminalClass::IntModifier => "<IntModifier>",
      TerminalClass::ValueModifier => "<ValueModifier>",
      TerminalClass::Keyword => "<Keyword>",
      TerminalClass::Eof => "<EOF>",
    };
    f.write_str(text)
  }
}

/// One right-hand-side element of a rule alternative.
#[derive(Debug, Clone)]
pub enum Target {
  /// A symbolic token category. The lexeme payload participates in
  /// equality only for the `Identifier` class, which lets a grammar treat
  /// specific identifiers as keyword-like.
  Class { class: TerminalClass, lexeme: String },
  /// A verbatim lexeme.
  Literal(String),
  /// A reference by name to another rule.
  Rule(String),
}

impl Target {
  pub fn class(class: TerminalClass) -> Self {
    Target::Class {
      class,
      lexeme: String::new(),
    }
  }

  pub fn literal(lexeme: impl Into<String>) -> Self {
    Target::Literal(lexeme.into())
  }

  pub fn rule(name: impl Into<String>) -> Self {
    Target::Rule(name.into())
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Target::Rule(_))
  }

  pub fn is_terminal(&self) -> bool {
    !self.is_nonterminal()
  }

  /// Whether this target can shift the given lookahead token.
  pub fn matches_token(&self, token: &Token<'_>) -> bool {
    match self {
      Target::Rule(_) => false,
      Target::Class { class, .. } => class.matches(token),
      Target::Literal(lexeme) => token.text == lexeme,
    }
  }
}

impl PartialEq for Target {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (
        Target::Class {
          class: TerminalClass::Identifier,
          lexeme: a,
        },
        Target::Class {
          class: TerminalClass::Identifier,
          lexeme: b,
        },
      ) => a == b,
      (Target::Class { class: a, .. }, Target::Class { class: b, .. }) => a == b,
      (Target::Literal(a), Target::Literal(b)) => a == b,
      (Target::Rule(a), Target::Rule(b)) => a == b,
      _ => false,
    }
  }
}

impl Eq for Target {}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Target::Class { class, .. } => write!(f, "{class}"),
      Target::Literal(lexeme) => write!(f, "'{lexeme}'"),
      Target::Rule(name) => f.write_str(name),
    }
  }
}

/// Ordered sequence of targets; empty means the alternative derives ε.
pub type Alternative = Vec<Target>;

/// Named non-terminal with its ordered alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
  pub name: String,
  pub alternatives: Vec<Alternative>,
}

impl Rule {
  /// A rule is nullable when any of its alternatives is empty.
  pub fn allows_empty(&self) -> bool {
    self.alternatives.iter().any(|alternative| alternative.is_empty())
  }
}

/// Mapping from non-terminal name to rule. Every `Target::Rule` reachable
/// from a loaded grammar names a key of this map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grammar {
  rules: BTreeMap<String, Rule>,
}

impl Grammar {
  /// Load a grammar from the text of a grammar file.
  pub fn load(filename: &str, text: &str) -> CompileResult<Grammar> {
    let mut lexer = Lexer::new(filename, text);
    let mut rules: BTreeMap<String, Rule> = BTreeMap::new();
    let mut pending: BTreeSet<String> = BTreeSet::new();

    loop {
      let token = lexer.next_token()?;
      if token.kind == TokenKind::Eof {
        break;
      }
      if token.kind != TokenKind::Identifier {
        return Err(grammar_syntax(&token));
      }

      let name = token.text.to_string();
      log::debug!("new rule: {name}");
      lexer.expect(TokenKind::Arrow)?;

      let mut alternatives: Vec<Alternative> = Vec::new();
      let mut alternative: Alternative = Vec::new();
      loop {
        let token = lexer.next_token()?;
        match token.kind {
          TokenKind::Semicolon => {
            alternatives.push(alternative);
            break;
          }
          TokenKind::BitwiseOr => {
            log::debug!("  new alternative for '{name}'");
            alternatives.push(mem::take(&mut alternative));
          }
          TokenKind::StringLiteral | TokenKind::CharLiteral => {
            alternative.push(Target::literal(token.text));
          }
          TokenKind::Identifier => {
            if let Some(class) = TerminalClass::from_name(token.text) {
              alternative.push(Target::class(class));
            } else if token.text == "Empty" {
              // Empty is not a token; an alternative holding only it
              // stays empty and makes the rule nullable.
            } else {
              if !rules.contains_key(token.text) && token.text != name {
                pending.insert(token.text.to_string());
              }
              alternative.push(Target::rule(token.text));
            }
          }
          _ => return Err(grammar_syntax(&token)),
        }
      }

      log::debug!("rule '{}' has {} alternative(s)", name, alternatives.len());
      pending.remove(&name);
      rules.insert(
        name.clone(),
        Rule { name, alternatives },
      );
    }

    if !pending.is_empty() {
      return Err(CompileError::UnresolvedRules {
        names: pending.into_iter().collect(),
      });
    }

    Ok(Grammar { rules })
  }

  pub fn get(&self, name: &str) -> Option<&Rule> {
    self.rules.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.rules.contains_key(name)
  }

  /// Rules in deterministic (name) order.
  pub fn rules(&self) -> impl Iterator<Item = &Rule> {
    self.rules.values()
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Clone of this grammar with the synthetic start rule `T -> program`
  /// appended, ready for table construction.
  pub fn augmented(&self) -> Grammar {
    let mut rules = self.rules.clone();
    rules.insert(
      START_RULE.to_string(),
      Rule {
        name: START_RULE.to_string(),
        alternatives: vec![vec![Target::rule(ENTRY_RULE)]],
      },
    );
    Grammar { rules }
  }
}

fn grammar_syntax(token: &Token<'_>) -> CompileError {
  CompileError::GrammarSyntax {
    found: token.describe(),
    location: token.diagnostic(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loads_rules_with_classes_and_literals() {
    let text = "program -> function ; function -> BasicType Identifier '(' ')' '{' '}' ;";
    let grammar = Grammar::load("grammar.rule", text).expect("loads");

    assert_eq!(grammar.len(), 2);
    let program = grammar.get("program").expect("program rule");
    assert_eq!(program.alternatives.len(), 1);
    assert_eq!(program.alternatives[0], vec![Target::rule("function")]);

    let function = grammar.get("function").expect("function rule");
    assert_eq!(function.alternatives[0].len(), 6);
    assert_eq!(
      function.alternatives[0][0],
      Target::class(TerminalClass::BasicType)
    );
    assert_eq!(function.alternatives[0][2], Target::literal("("));
  }

  #[test]
  fn empty_marks_an_alternative_nullable() {
    let grammar = Grammar::load("grammar.rule", "program -> 'a' | Empty ;").expect("loads");
    let rule = grammar.get("program").expect("program rule");
    assert_eq!(rule.alternatives.len(), 2);
    assert!(rule.alternatives[1].is_empty());
    assert!(rule.allows_empty());
  }

  #[test]
  fn forward_and_self_references_resolve() {
    let text = "program -> list ; list -> list 'x' | Empty ;";
    let grammar = Grammar::load("grammar.rule", text).expect("loads");
    assert!(grammar.contains("list"));
  }

  #[test]
  fn unresolved_references_are_reported_together() {
    let err = Grammar::load("grammar.rule", "program -> foo bar ;").expect_err("unresolved");
    match err {
      CompileError::UnresolvedRules { names } => {
        assert_eq!(names, vec!["bar".to_string(), "foo".to_string()]);
      }
      other => panic!("expected UnresolvedRules, got {other:?}"),
    }
  }

  #[test]
  fn stray_tokens_in_a_rule_body_are_syntax_errors() {
    let err = Grammar::load("grammar.rule", "program -> 'a' -> 'b' ;").expect_err("syntax");
    assert!(matches!(err, CompileError::GrammarSyntax { .. }));
  }

  #[test]
  fn identifier_class_targets_compare_by_lexeme() {
    let plain = Target::class(TerminalClass::Identifier);
    let keyword_like = Target::Class {
      class: TerminalClass::Identifier,
      lexeme: "asm".to_string(),
    };
    assert_eq!(plain, Target::class(TerminalClass::Identifier));
    assert_ne!(plain, keyword_like);

    // Other classes ignore the payload.
    let a = Target::Class {
      class: TerminalClass::Eof,
      lexeme: "x".to_string(),
    };
    assert_eq!(a, Target::class(TerminalClass::Eof));
  }

  #[test]
  fn augmented_grammar_gains_the_start_rule() {
    let grammar = Grammar::load("grammar.rule", "program -> 'a' ;").expect("loads");
    let augmented = grammar.augmented();
    let start = augmented.get(START_RULE).expect("start rule");
    assert_eq!(start.alternatives, vec![vec![Target::rule(ENTRY_RULE)]]);
    assert!(!grammar.contains(START_RULE));
  }
}
