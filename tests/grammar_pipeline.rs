//! End-to-end tests for the grammar-driven front-end: grammar and source
//! files on disk, through loading, table construction and parsing.

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use toycpp::parser::ParseNode;
use toycpp::{parse_with_grammar, CompileError};

/// Write (filename, contents) pairs into a fresh temp dir and read them
/// back the way the binary does.
fn fixture(files: &[(&str, &str)]) -> (TempDir, Vec<String>) {
  let dir = TempDir::new().expect("temp dir");
  let mut contents = Vec::new();
  for (name, text) in files {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("write fixture");
    contents.push(fs::read_to_string(&path).expect("read fixture"));
  }
  (dir, contents)
}

const TOY_GRAMMAR: &str = include_str!("../grammar.rule");

#[test]
fn parses_the_demo_source_with_the_shipped_grammar() {
  let source = include_str!("../demos/add.cpp");
  let (_dir, contents) = fixture(&[("grammar.rule", TOY_GRAMMAR), ("add.cpp", source)]);

  let tree = parse_with_grammar("grammar.rule", &contents[0], "add.cpp", &contents[1])
    .expect("parses");

  // The leaf sequence is exactly the token stream (the trailing empty
  // lexeme is the Eof token).
  let mut expected: Vec<&str> = vec![
    "int", "main", "(", ")", "{", "int", "a", ";", "int", "b", ";", "a", "=", "1", ";", "b",
    "=", "a", "+", "2", ";", "return", "b", ";", "}",
  ];
  expected.push("");
  assert_eq!(tree.leaves(), expected);
}

#[test]
fn helper_rules_never_show_up_in_the_tree() {
  let source = "int main() { return 0; }";
  let tree =
    parse_with_grammar("grammar.rule", TOY_GRAMMAR, "min.cpp", source).expect("parses");

  fn walk(node: &ParseNode, f: &mut impl FnMut(&str)) {
    if let ParseNode::Rule { name, children } = node {
      f(name);
      for child in children {
        walk(child, f);
      }
    }
  }

  let mut names = Vec::new();
  walk(&tree, &mut |name| names.push(name.to_string()));
  assert!(names.iter().all(|name| !name.starts_with('_')), "{names:?}");
  assert!(names.contains(&"function".to_string()));
  assert!(names.contains(&"return_statement".to_string()));
}

#[test]
fn inline_assembly_and_calls_parse() {
  let source = r#"
    void quit() {
      asm("  mov rax, 60\n" "  syscall\n");
    }
    int main() {
      quit();
      return 0;
    }
  "#;
  let tree =
    parse_with_grammar("grammar.rule", TOY_GRAMMAR, "exit.cpp", source).expect("parses");
  let leaves = tree.leaves();
  assert!(leaves.contains(&"asm"));
  assert!(leaves.contains(&"quit"));
}

#[test]
fn sources_outside_the_grammar_fail_with_a_syntax_error() {
  let source = "int main() { while (1) { } }";
  let err = parse_with_grammar("grammar.rule", TOY_GRAMMAR, "bad.cpp", source)
    .expect_err("not in the grammar");
  match err {
    CompileError::Syntax { found, .. } => assert_eq!(found, "'while'"),
    other => panic!("expected Syntax, got {other:?}"),
  }
}

#[test]
fn grammars_without_the_entry_rule_are_unresolved() {
  let err = parse_with_grammar("grammar.rule", "start -> 'a' ;", "x.cpp", "a")
    .expect_err("missing program");
  assert!(matches!(err, CompileError::UnresolvedRules { .. }));
  assert_eq!(err.exit_code(), 2);
}
