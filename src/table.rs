//! LR(0) item sets and the shift/reduce table built from them.
//!
//! States are processed in creation order. Closing a state expands every
//! non-terminal to the right of a dot in place; items with the dot at the
//! end become reductions. Goto kernels are compared structurally against
//! all existing states so equal item sets share one index, which keeps the
//! numbering reproducible for a given grammar.

use crate::error::{CompileError, CompileResult};
use crate::grammar::{Alternative, Grammar, Target, ENTRY_RULE, START_RULE};
use crate::ordered::OrderedSet;

/// A rule alternative annotated with a parsing position. The alternative
/// is addressed as a (rule name, alternative index) handle into the
/// grammar rather than a borrowed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedItem {
  pub rule: String,
  pub alternative: usize,
  pub dot: usize,
}

impl DottedItem {
  fn start(rule: impl Into<String>, alternative: usize) -> Self {
    DottedItem {
      rule: rule.into(),
      alternative,
      dot: 0,
    }
  }

  fn resolve<'g>(&self, grammar: &'g Grammar) -> Option<&'g Alternative> {
    grammar.get(&self.rule)?.alternatives.get(self.alternative)
  }

  /// The target the dot sits in front of, or `None` at the end.
  pub fn after_dot<'g>(&self, grammar: &'g Grammar) -> Option<&'g Target> {
    self.resolve(grammar)?.get(self.dot)
  }

  /// Length of the addressed alternative.
  pub fn len(&self, grammar: &Grammar) -> usize {
    self.resolve(grammar).map(Vec::len).unwrap_or(0)
  }

  fn advanced(&self) -> DottedItem {
    DottedItem {
      rule: self.rule.clone(),
      alternative: self.alternative,
      dot: self.dot + 1,
    }
  }

  /// `name -> a . b c` rendering for traces.
  pub fn render(&self, grammar: &Grammar) -> String {
    let mut out = format!("{} ->", self.rule);
    if let Some(alternative) = self.resolve(grammar) {
      for (position, target) in alternative.iter().enumerate() {
        if position == self.dot {
          out.push_str(" .");
        }
        out.push_str(&format!(" {target}"));
      }
      if self.dot >= alternative.len() {
        out.push_str(" .");
      }
    }
    out
  }
}

/// What to do when a state's items have their dot at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
  /// How many nodes (and states) to pop off the stacks.
  pub pop_count: usize,
  /// The non-terminal the popped nodes reduce to.
  pub rule_name: String,
}

/// Shift/goto and reduction actions for one automaton state.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseRules {
  pub state: usize,
  /// Target to successor state, in first-appearance order.
  pub shifts: Vec<(Target, usize)>,
  pub reductions: OrderedSet<Reduction>,
}

/// The canonical LR(0) collection plus the actions derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTable {
  pub states: Vec<ParseRules>,
  /// The closed item set behind each state, kept for tracing and tests.
  pub item_sets: Vec<OrderedSet<DottedItem>>,
}

/// Build the full table for a grammar. The grammar must define the
/// `program` entry rule; the synthetic start rule is added here.
pub fn build_parse_table(grammar: &Grammar) -> CompileResult<ParseTable> {
  if !grammar.contains(ENTRY_RULE) {
    return Err(CompileError::UnresolvedRules {
      names: vec![ENTRY_RULE.to_string()],
    });
  }
  let grammar = grammar.augmented();
  log::debug!("building parse table");

  let mut item_sets: Vec<OrderedSet<DottedItem>> = Vec::new();
  let mut shifts: Vec<Vec<(Target, usize)>> = Vec::new();
  let mut reductions: Vec<OrderedSet<Reduction>> = Vec::new();

  let mut initial = OrderedSet::new();
  initial.insert(DottedItem::start(START_RULE, 0));
  item_sets.push(initial);

  let mut index = 0;
  while index < item_sets.len() {
    let mut state_reductions = OrderedSet::new();
    let mut goto_targets: OrderedSet<Target> = OrderedSet::new();

    // Close the state: every non-terminal to the right of a dot pulls in
    // items for all of its alternatives; dot-at-end items reduce.
    let mut position = 0;
    while position < item_sets[index].len() {
      let item = item_sets[index][position].clone();
      match item.after_dot(&grammar) {
        None => {
          state_reductions.insert(Reduction {
            pop_count: item.len(&grammar),
            rule_name: item.rule.clone(),
          });
        }
        Some(target) => {
          let target = target.clone();
          if let Target::Rule(name) = &target {
            if let Some(rule) = grammar.get(name) {
              for alternative in 0..rule.alternatives.len() {
                item_sets[index].insert(DottedItem::start(name.clone(), alternative));
              }
            }
          }
          goto_targets.insert(target);
        }
      }
      position += 1;
    }

    // Advance the dot over each goto target, sharing the successor with
    // any structurally equal existing state.
    let mut state_shifts: Vec<(Target, usize)> = Vec::new();
    for target in goto_targets.iter() {
      let mut kernel: OrderedSet<DottedItem> = OrderedSet::new();
      for item in item_sets[index].iter() {
        if item.after_dot(&grammar) == Some(target) {
          kernel.insert(item.advanced());
        }
      }
      if kernel.is_empty() {
        continue;
      }
      let successor = match item_sets.iter().position(|existing| *existing == kernel) {
        Some(existing) => existing,
        None => {
          item_sets.push(kernel);
          item_sets.len() - 1
        }
      };
      state_shifts.push((target.clone(), successor));
    }

    shifts.push(state_shifts);
    reductions.push(state_reductions);
    index += 1;
  }

  let states: Vec<ParseRules> = shifts
    .into_iter()
    .zip(reductions)
    .enumerate()
    .map(|(state, (shifts, reductions))| ParseRules {
      state,
      shifts,
      reductions,
    })
    .collect();

  if log::log_enabled!(log::Level::Debug) {
    for (state, rules) in states.iter().enumerate() {
      log::debug!("state {state}:");
      for item in item_sets[state].iter() {
        log::debug!("  {}", item.render(&grammar));
      }
      for (target, successor) in &rules.shifts {
        log::debug!("  see {target}? shift and goto state {successor}");
      }
      for reduction in rules.reductions.iter() {
        log::debug!("  reduce {} -> {}", reduction.pop_count, reduction.rule_name);
      }
    }
  }

  Ok(ParseTable { states, item_sets })
}
