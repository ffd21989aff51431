use clap::Parser;
use snafu::ResultExt;
use std::fs;
use std::path::PathBuf;
use std::process::{self, Command};
use toycpp::error::{AssemblerFailedSnafu, IoSnafu};
use toycpp::CompileResult;

/// Where the generated assembly lands before assembling.
const OUTPUT_ASM: &str = "/tmp/toycpp_output.asm";

#[derive(Parser)]
#[command(version, about = "Ahead-of-time compiler for a C-like toy language")]
struct Args {
  /// Source file to compile.
  source: PathBuf,

  /// Parse with the grammar-driven front-end and print the tree instead
  /// of compiling.
  #[arg(long)]
  parse_only: bool,

  /// Grammar file for the grammar-driven front-end.
  #[arg(long, default_value = "grammar.rule")]
  grammar: PathBuf,
}

fn main() {
  env_logger::init();
  let args = Args::parse();

  if let Err(err) = run(&args) {
    eprintln!("ERROR: {err}");
    process::exit(err.exit_code());
  }
}

fn run(args: &Args) -> CompileResult<()> {
  let source_name = args.source.display().to_string();
  let source = fs::read_to_string(&args.source).context(IoSnafu {
    path: source_name.clone(),
  })?;

  if args.parse_only {
    let grammar_name = args.grammar.display().to_string();
    let grammar_text = fs::read_to_string(&args.grammar).context(IoSnafu {
      path: grammar_name.clone(),
    })?;
    let tree = toycpp::parse_with_grammar(&grammar_name, &grammar_text, &source_name, &source)?;
    print!("{}", tree.render());
    return Ok(());
  }

  let assembly = toycpp::generate_assembly(&source_name, &source)?;
  print!("{assembly}");

  fs::write(OUTPUT_ASM, &assembly).context(IoSnafu { path: OUTPUT_ASM })?;

  // fasm turns the assembly into the executable directly; no linker runs.
  let status = Command::new("fasm")
    .arg(OUTPUT_ASM)
    .arg("executable")
    .status()
    .context(IoSnafu { path: "fasm" })?;
  snafu::ensure!(
    status.success(),
    AssemblerFailedSnafu {
      code: status.code().unwrap_or(-1),
    }
  );

  Ok(())
}
