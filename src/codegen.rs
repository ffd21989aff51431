//! Code generation: lower the AST into flat-assembler (FASM) ELF64 source.
//!
//! Every function gets a frame addressed relative to `rsp`; scalar locals
//! occupy 4-byte dword slots at negative displacements. Expression support
//! is deliberately narrow: integer constants, variable reads and a single
//! addition lower, and everything else reports `NotImplemented`.

use crate::ast::{BinaryOp, Expression, FunctionDefinition, Program, Statement};
use crate::error::{CompileError, CompileResult};
use std::collections::BTreeMap;

/// Stack slot bookkeeping for one local variable.
#[derive(Debug, Clone, Copy)]
struct VariableInfo {
  stack_pos: usize,
  size: usize,
}

impl VariableInfo {
  /// Frame-relative operand for this slot.
  fn slot(&self) -> String {
    format!("[rsp-{}]", self.stack_pos + self.size)
  }
}

/// Per-function variable context.
#[derive(Debug, Default)]
struct Context {
  stack_pos: usize,
  variables: BTreeMap<String, VariableInfo>,
}

impl Context {
  fn declare(&mut self, name: &str) -> VariableInfo {
    let info = VariableInfo {
      stack_pos: self.stack_pos,
      size: 4,
    };
    self.stack_pos += info.size;
    self.variables.insert(name.to_string(), info);
    info
  }

  fn lookup(&self, name: &str) -> CompileResult<VariableInfo> {
    self
      .variables
      .get(name)
      .copied()
      .ok_or_else(|| CompileError::UndefinedVariable {
        name: name.to_string(),
      })
  }
}

/// Emit a complete FASM ELF64 module for the program.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut asm = String::new();
  asm.push_str("format ELF64 executable\n\n");
  asm.push_str("_start:\n");
  asm.push_str("  ;; Initialize globals\n");
  asm.push_str("  ;; ...\n\n");
  asm.push_str("  ;; Call main\n");
  asm.push_str("  call main\n\n");
  asm.push_str("  ;; Exit with status code = result from main.\n");
  asm.push_str("  mov rdi, rax                ; return code: whatever main returned\n");
  asm.push_str("  mov rax, 60                 ; sys_exit(fd)\n");
  asm.push_str("  syscall\n\n");

  for function in &program.functions {
    emit_function(function, &mut asm)?;
  }

  Ok(asm)
}

fn emit_function(function: &FunctionDefinition, asm: &mut String) -> CompileResult<()> {
  asm.push_str(&format!("{}:\n", function.name));
  asm.push_str("  push rbp\n");
  asm.push_str("  mov rbp, rsp\n\n");

  let mut ctx = Context::default();

  for statement in &function.body {
    match statement {
      Statement::VarDef { names, .. } => {
        let mut total = 0;
        for name in names {
          total += ctx.declare(name).size;
        }
        asm.push_str(&format!("  sub rsp, {}   ; {}\n", total, names.join(", ")));
      }
      Statement::VarAssign { name, value } => emit_assignment(&ctx, name, value, asm)?,
      Statement::FuncCall { callee } => {
        asm.push_str(&format!("  call {callee}\n"));
      }
      Statement::InlineAssembly { text } => {
        asm.push_str(text);
        if !text.ends_with('\n') {
          asm.push('\n');
        }
      }
      Statement::Return { value } => emit_return(&ctx, function, value.as_ref(), asm)?,
    }
  }

  asm.push_str(&format!("{}__return:\n", function.name));
  asm.push_str(&format!("  add rsp, {}\n", ctx.stack_pos));
  asm.push_str("  pop rbp\n");
  asm.push_str("  ret\n\n");
  Ok(())
}

fn emit_assignment(
  ctx: &Context,
  name: &str,
  value: &Expression,
  asm: &mut String,
) -> CompileResult<()> {
  let dest = ctx.lookup(name)?;
  asm.push_str(&format!("  ;; {name} = {value};\n"));

  match value {
    Expression::IntConstant(constant) => {
      asm.push_str(&format!("  mov dword {}, {constant}\n\n", dest.slot()));
    }
    Expression::VarAccess(source) => {
      let source = ctx.lookup(source)?;
      asm.push_str(&format!("  mov eax, {}\n", source.slot()));
      asm.push_str(&format!("  mov dword {}, eax\n\n", dest.slot()));
    }
    Expression::Binary {
      op: BinaryOp::Add,
      lhs,
      rhs,
    } => {
      emit_load_eax(ctx, lhs, asm)?;
      emit_add_eax(ctx, rhs, asm)?;
      asm.push_str(&format!("  mov dword {}, eax\n\n", dest.slot()));
    }
    Expression::Binary { op, .. } => {
      return Err(CompileError::NotImplemented {
        construct: format!("binary operator '{op}'"),
      });
    }
    other => {
      return Err(CompileError::NotImplemented {
        construct: format!("assignment of '{other}'"),
      });
    }
  }
  Ok(())
}

fn emit_load_eax(ctx: &Context, operand: &Expression, asm: &mut String) -> CompileResult<()> {
  match operand {
    Expression::IntConstant(constant) => {
      asm.push_str(&format!("  mov eax, {constant}\n"));
    }
    Expression::VarAccess(name) => {
      asm.push_str(&format!("  mov eax, {}\n", ctx.lookup(name)?.slot()));
    }
    other => {
      return Err(CompileError::NotImplemented {
        construct: format!("addition operand '{other}'"),
      });
    }
  }
  Ok(())
}

fn emit_add_eax(ctx: &Context, operand: &Expression, asm: &mut String) -> CompileResult<()> {
  match operand {
    Expression::IntConstant(constant) => {
      asm.push_str(&format!("  add eax, {constant}\n"));
    }
    Expression::VarAccess(name) => {
      asm.push_str(&format!("  add eax, {}\n", ctx.lookup(name)?.slot()));
    }
    other => {
      return Err(CompileError::NotImplemented {
        construct: format!("addition operand '{other}'"),
      });
    }
  }
  Ok(())
}

fn emit_return(
  ctx: &Context,
  function: &FunctionDefinition,
  value: Option<&Expression>,
  asm: &mut String,
) -> CompileResult<()> {
  if let Some(value) = value {
    match value {
      Expression::IntConstant(constant) => {
        asm.push_str(&format!("  mov rax, {constant}\n"));
      }
      Expression::VarAccess(name) => {
        asm.push_str(&format!("  ;; return {name};\n"));
        asm.push_str(&format!("  mov rax, {}\n", ctx.lookup(name)?.slot()));
      }
      other => {
        return Err(CompileError::NotImplemented {
          construct: format!("returning '{other}'"),
        });
      }
    }
  }
  asm.push_str(&format!("  jmp {}__return\n", function.name));
  Ok(())
}
