//! FIRST and FOLLOW set computation.
//!
//! Both analyses seed their sets from a single walk over the grammar while
//! recording dependency edges between non-terminals, then propagate along
//! those edges until a fixed point. Re-running either analysis on the same
//! grammar yields the same maps.

use crate::grammar::{Grammar, Target};
use crate::ordered::OrderedSet;
use std::collections::{BTreeMap, BTreeSet};

/// Per-non-terminal terminal sets, keyed in deterministic name order.
pub type TerminalSets = BTreeMap<String, OrderedSet<Target>>;

type Dependencies = BTreeMap<String, BTreeSet<String>>;

fn is_nullable(grammar: &Grammar, name: &str) -> bool {
  grammar.get(name).is_some_and(|rule| rule.allows_empty())
}

/// For each non-terminal, the terminals a derivation of it can start with.
pub fn first_sets(grammar: &Grammar) -> TerminalSets {
  let mut sets: TerminalSets = TerminalSets::new();
  let mut dependencies = Dependencies::new();

  for rule in grammar.rules() {
    sets.entry(rule.name.clone()).or_default();

    for alternative in &rule.alternatives {
      for target in alternative {
        match target {
          Target::Rule(name) => {
            let inherited = sets.get(name).cloned().unwrap_or_default();
            sets.entry(rule.name.clone()).or_default().merge(&inherited);
            if name != &rule.name {
              dependencies
                .entry(rule.name.clone())
                .or_default()
                .insert(name.clone());
            }
            if !is_nullable(grammar, name) {
              break;
            }
          }
          terminal => {
            sets.entry(rule.name.clone()).or_default().insert(terminal.clone());
            break;
          }
        }
      }
    }
  }

  propagate(&mut sets, &dependencies);
  sets
}

/// For each non-terminal, the terminals that can immediately follow one of
/// its derivations.
pub fn follow_sets(grammar: &Grammar, first: &TerminalSets) -> TerminalSets {
  let mut sets: TerminalSets = TerminalSets::new();
  let mut dependencies = Dependencies::new();

  for rule in grammar.rules() {
    sets.entry(rule.name.clone()).or_default();
  }

  for rule in grammar.rules() {
    for alternative in &rule.alternatives {
      for (position, target) in alternative.iter().enumerate() {
        let Target::Rule(name) = target else {
          continue;
        };

        if position + 1 == alternative.len() {
          // The occurrence ends the alternative, so whatever follows the
          // enclosing rule also follows it.
          dependencies
            .entry(name.clone())
            .or_default()
            .insert(rule.name.clone());
          continue;
        }

        for (offset, next) in alternative.iter().enumerate().skip(position + 1) {
          match next {
            Target::Rule(next_name) if next_name == name => {
              // Another occurrence of the same non-terminal; the outer
              // walk picks it up from there.
              break;
            }
            Target::Rule(next_name) => {
              let inherited = first.get(next_name).cloned().unwrap_or_default();
              sets.entry(name.clone()).or_default().merge(&inherited);
              if !is_nullable(grammar, next_name) {
                break;
              }
              if offset + 1 == alternative.len() {
                dependencies
                  .entry(name.clone())
                  .or_default()
                  .insert(rule.name.clone());
              }
            }
            terminal => {
              sets.entry(name.clone()).or_default().insert(terminal.clone());
              break;
            }
          }
        }
      }
    }
  }

  propagate(&mut sets, &dependencies);
  sets
}

/// Re-union each dependency edge until no set grows.
fn propagate(sets: &mut TerminalSets, dependencies: &Dependencies) {
  let mut grew = true;
  while grew {
    grew = false;
    for (name, sources) in dependencies {
      for source in sources {
        let Some(inherited) = sets.get(source).cloned() else {
          continue;
        };
        if sets.entry(name.clone()).or_default().merge(&inherited) > 0 {
          grew = true;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::TerminalClass;

  fn grammar(text: &str) -> Grammar {
    Grammar::load("grammar.rule", text).expect("loads")
  }

  fn set(targets: &[Target]) -> OrderedSet<Target> {
    targets.iter().cloned().collect()
  }

  #[test]
  fn first_sets_cross_nullable_prefixes() {
    // program is the mandatory entry rule; S exercises the chain.
    let g = grammar("program -> S ; S -> A 'b' ; A -> 'a' | Empty ;");
    let first = first_sets(&g);

    assert_eq!(first["A"], set(&[Target::literal("a")]));
    assert_eq!(first["S"], set(&[Target::literal("a"), Target::literal("b")]));
    assert_eq!(first["program"], first["S"]);
    assert!(g.get("A").expect("rule A").allows_empty());
  }

  #[test]
  fn first_stops_at_the_first_terminal() {
    let g = grammar("program -> 'x' 'y' ;");
    let first = first_sets(&g);
    assert_eq!(first["program"], set(&[Target::literal("x")]));
  }

  #[test]
  fn first_handles_left_recursion() {
    let g = grammar("program -> expr ; expr -> expr '+' expr | Identifier ;");
    let first = first_sets(&g);
    assert_eq!(
      first["expr"],
      set(&[Target::class(TerminalClass::Identifier)])
    );
    assert_eq!(first["program"], first["expr"]);
  }

  #[test]
  fn follow_collects_terminals_after_occurrences() {
    let g = grammar("program -> S ; S -> A 'b' ; A -> 'a' | Empty ;");
    let first = first_sets(&g);
    let follow = follow_sets(&g, &first);

    assert_eq!(follow["A"], set(&[Target::literal("b")]));
    // S ends program, so FOLLOW(S) inherits FOLLOW(program), which is empty.
    assert!(follow["S"].is_empty());
  }

  #[test]
  fn follow_crosses_nullable_neighbours() {
    let g = grammar("program -> A B 'z' ; A -> 'a' ; B -> 'b' | Empty ;");
    let first = first_sets(&g);
    let follow = follow_sets(&g, &first);

    // B may derive ε, so both FIRST(B) and 'z' follow A.
    assert_eq!(follow["A"], set(&[Target::literal("b"), Target::literal("z")]));
    assert_eq!(follow["B"], set(&[Target::literal("z")]));
  }

  #[test]
  fn follow_inherits_through_trailing_occurrences() {
    let g = grammar("program -> A ';' ; A -> 'x' B ; B -> 'y' ;");
    let first = first_sets(&g);
    let follow = follow_sets(&g, &first);

    // B ends A, so FOLLOW(B) inherits FOLLOW(A).
    assert_eq!(follow["A"], set(&[Target::literal(";")]));
    assert_eq!(follow["B"], set(&[Target::literal(";")]));
  }

  #[test]
  fn both_analyses_are_idempotent() {
    let text = "program -> S ; S -> S 'x' A | A ; A -> 'a' | Empty ;";
    let g = grammar(text);

    let first_a = first_sets(&g);
    let first_b = first_sets(&g);
    assert_eq!(first_a, first_b);

    let follow_a = follow_sets(&g, &first_a);
    let follow_b = follow_sets(&g, &first_b);
    assert_eq!(follow_a, follow_b);
  }

  #[test]
  fn first_contains_only_terminals() {
    let text = "program -> S ; S -> A 'b' | S 'c' ; A -> 'a' | Empty ;";
    let first = first_sets(&grammar(text));
    for set in first.values() {
      assert!(set.iter().all(Target::is_terminal));
    }
  }
}
