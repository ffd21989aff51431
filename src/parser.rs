//! Shift/reduce parser driven by the generated table.
//!
//! The driver holds a stack of state indices and a stack of parse nodes
//! and consumes one lookahead token per `advance` call. Conflicts are
//! resolved by biasing toward shifting: a pending reduction shifts first,
//! then a literal match, then a terminal-class match, and a lone reduction
//! is deferred whenever the state could still shift a terminal once more
//! input arrives. Two applicable reductions are fatal.

use crate::error::{CompileError, CompileResult};
use crate::grammar::{Target, START_RULE};
use crate::table::{ParseRules, ParseTable, Reduction};
use crate::tokenizer::{Lexer, Token};

/// Concrete parse-tree node: a terminal leaf holding a lexeme, or an
/// interior node named after the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
  Terminal { lexeme: String },
  Rule { name: String, children: Vec<ParseNode> },
}

impl ParseNode {
  pub fn terminal(lexeme: impl Into<String>) -> Self {
    ParseNode::Terminal {
      lexeme: lexeme.into(),
    }
  }

  pub fn rule(name: impl Into<String>, children: Vec<ParseNode>) -> Self {
    ParseNode::Rule {
      name: name.into(),
      children,
    }
  }

  /// In-order terminal lexemes of the subtree.
  pub fn leaves(&self) -> Vec<&str> {
    match self {
      ParseNode::Terminal { lexeme } => vec![lexeme.as_str()],
      ParseNode::Rule { children, .. } => {
        children.iter().flat_map(ParseNode::leaves).collect()
      }
    }
  }

  /// Indented one-node-per-line listing of the tree.
  pub fn render(&self) -> String {
    let mut out = String::new();
    self.render_into(&mut out, 0);
    out
  }

  fn render_into(&self, out: &mut String, depth: usize) {
    for _ in 0..depth {
      out.push_str("  ");
    }
    match self {
      ParseNode::Terminal { lexeme } => {
        out.push('\'');
        out.push_str(lexeme);
        out.push_str("'\n");
      }
      ParseNode::Rule { name, children } => {
        out.push_str(name);
        out.push('\n');
        for child in children {
          child.render_into(out, depth + 1);
        }
      }
    }
  }

  fn label(&self) -> String {
    match self {
      ParseNode::Terminal { lexeme } => format!("'{lexeme}'"),
      ParseNode::Rule { name, .. } => name.clone(),
    }
  }
}

/// Table-driven parser state between lookahead tokens.
pub struct Parser<'t> {
  table: &'t ParseTable,
  states: Vec<usize>,
  nodes: Vec<ParseNode>,
  /// Node produced by the most recent reduction, awaiting its goto shift.
  pending: Option<ParseNode>,
  done: bool,
}

impl<'t> Parser<'t> {
  pub fn new(table: &'t ParseTable) -> Self {
    Self {
      table,
      states: vec![0],
      nodes: Vec::new(),
      pending: None,
      done: false,
    }
  }

  /// Whether the start rule has been reduced.
  pub fn done(&self) -> bool {
    self.done
  }

  /// The accepted tree, once `done` reports true.
  pub fn into_tree(mut self) -> Option<ParseNode> {
    self.nodes.pop()
  }

  fn current_state(&self) -> usize {
    self.states.last().copied().unwrap_or(0)
  }

  fn current_rules(&self) -> &ParseRules {
    &self.table.states[self.current_state()]
  }

  /// Feed one lookahead token. Returns once the token has been consumed,
  /// the parser decides to wait for more input, or the start rule reduces.
  pub fn advance(&mut self, lookahead: &Token<'_>) -> CompileResult<()> {
    let mut consumed = false;

    loop {
      self.trace(lookahead, consumed);

      // Highest-priority matching shift: pending reduction (30), literal
      // lookahead (20), terminal class (10); ties go to the target listed
      // first.
      let mut best_priority = 0;
      let mut best: Option<(bool, usize)> = None;
      for (target, successor) in &self.current_rules().shifts {
        let priority = match target {
          Target::Rule(name) => match &self.pending {
            Some(ParseNode::Rule { name: pending, .. }) if pending == name => 30,
            _ => 0,
          },
          Target::Literal(_) if !consumed && target.matches_token(lookahead) => 20,
          Target::Class { .. } if !consumed && target.matches_token(lookahead) => 10,
          _ => 0,
        };
        if priority > best_priority {
          best_priority = priority;
          best = Some((priority == 30, *successor));
        }
      }

      if let Some((from_pending, successor)) = best {
        if from_pending {
          if let Some(node) = self.pending.take() {
            log::trace!("shift {}, goto state {successor}", node.label());
            self.nodes.push(node);
            self.states.push(successor);
            continue;
          }
        } else {
          consumed = true;
          log::trace!("shift '{}', goto state {successor}", lookahead.text);
          self.nodes.push(ParseNode::terminal(lookahead.text));
          self.states.push(successor);
          continue;
        }
      }

      let reductions = &self.current_rules().reductions;
      if reductions.len() > 1 {
        return Err(CompileError::ReduceReduceConflict {
          state: self.current_state(),
        });
      }

      if reductions.len() == 1 {
        let shifts_a_terminal = self
          .current_rules()
          .shifts
          .iter()
          .any(|(target, _)| target.is_terminal());
        if consumed && shifts_a_terminal {
          log::trace!("shift/reduce conflict: waiting for the next lookahead");
          return Ok(());
        }

        let reduction = reductions[0].clone();
        self.reduce(&reduction)?;
        if reduction.rule_name == START_RULE {
          log::trace!("reduced the start rule: accepting");
          if let Some(tree) = self.pending.take() {
            self.nodes.push(tree);
          }
          self.done = true;
          return Ok(());
        }
        continue;
      }

      if consumed && self.pending.is_none() {
        return Ok(());
      }

      let expected = self
        .current_rules()
        .shifts
        .iter()
        .map(|(target, _)| target.to_string())
        .collect();
      return Err(CompileError::Syntax {
        found: lookahead.describe(),
        expected,
        location: lookahead.diagnostic(),
      });
    }
  }

  /// Pop the reduced alternative off both stacks and build its node.
  ///
  /// A leftmost popped node naming the same rule is inlined, so
  /// left-recursive chains accumulate flat; any other popped non-terminal
  /// whose name starts with `_` is spliced into its parent.
  fn reduce(&mut self, reduction: &Reduction) -> CompileResult<()> {
    log::trace!("reduce {} -> {}", reduction.pop_count, reduction.rule_name);
    if self.nodes.len() < reduction.pop_count || self.states.len() <= reduction.pop_count {
      return Err(CompileError::StackExhausted);
    }

    let popped = self.nodes.split_off(self.nodes.len() - reduction.pop_count);
    self.states.truncate(self.states.len() - reduction.pop_count);

    let mut children = Vec::new();
    for (position, node) in popped.into_iter().enumerate() {
      match node {
        ParseNode::Rule { name, children: inner }
          if position == 0 && name == reduction.rule_name =>
        {
          children.extend(inner);
        }
        ParseNode::Rule { name, children: inner } if name.starts_with('_') => {
          children.extend(inner);
        }
        node => children.push(node),
      }
    }

    self.pending = Some(ParseNode::rule(reduction.rule_name.as_str(), children));
    Ok(())
  }

  fn trace(&self, lookahead: &Token<'_>, consumed: bool) {
    if !log::log_enabled!(log::Level::Trace) {
      return;
    }
    let nodes: Vec<String> = self.nodes.iter().map(ParseNode::label).collect();
    let pending = self
      .pending
      .as_ref()
      .map(ParseNode::label)
      .unwrap_or_default();
    let lookahead = if consumed {
      String::new()
    } else {
      format!(" $ '{}'", lookahead.text)
    };
    log::trace!(
      "state {}, nodes [{}] {pending}{lookahead}",
      self.current_state(),
      nodes.join(" "),
    );
  }
}

/// Parse an entire token stream, feeding the parser one lookahead at a
/// time until the start rule reduces.
pub fn parse(table: &ParseTable, lexer: &mut Lexer<'_>) -> CompileResult<ParseNode> {
  let mut parser = Parser::new(table);
  while !parser.done() {
    let lookahead = lexer.next_token()?;
    parser.advance(&lookahead)?;
  }
  parser.into_tree().ok_or(CompileError::StackExhausted)
}
