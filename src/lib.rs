//! Crate root: wires together the compilation pipeline.
//!
//! Two front-ends share the lexer:
//! - the grammar-driven path loads a grammar file, computes FIRST/FOLLOW,
//!   builds an LR(0) shift/reduce table and drives it over the source to
//!   produce a concrete parse tree;
//! - the direct path hand-parses the token stream into a function AST and
//!   lowers it to FASM ELF64 assembly.
//!
//! File handling, process exit codes and the external assembler live in
//! the binary; everything here is argument-and-return.

pub mod analysis;
pub mod ast;
pub mod error;
pub mod grammar;
pub mod ordered;
pub mod parser;
pub mod table;
pub mod tokenizer;

mod codegen;

pub use error::{CompileError, CompileResult};

/// Compile a source string into FASM ELF64 assembly.
pub fn generate_assembly(filename: &str, source: &str) -> CompileResult<String> {
  let mut lexer = tokenizer::Lexer::new(filename, source);
  let program = ast::parse_program(&mut lexer)?;
  codegen::generate(&program)
}

/// Parse a source string against a grammar file, producing the parse tree.
pub fn parse_with_grammar(
  grammar_filename: &str,
  grammar_text: &str,
  source_filename: &str,
  source: &str,
) -> CompileResult<parser::ParseNode> {
  let grammar = grammar::Grammar::load(grammar_filename, grammar_text)?;

  let first = analysis::first_sets(&grammar);
  log_sets("FIRST", &first);
  let follow = analysis::follow_sets(&grammar, &first);
  log_sets("FOLLOW", &follow);

  let parse_table = table::build_parse_table(&grammar)?;
  log::debug!("parse table has {} states", parse_table.states.len());

  let mut lexer = tokenizer::Lexer::new(source_filename, source);
  parser::parse(&parse_table, &mut lexer)
}

fn log_sets(label: &str, sets: &analysis::TerminalSets) {
  if !log::log_enabled!(log::Level::Debug) {
    return;
  }
  for (name, set) in sets {
    let targets: Vec<String> = set.iter().map(ToString::to_string).collect();
    log::debug!("{label}({name}) = {{{}}}", targets.join(", "));
  }
}
