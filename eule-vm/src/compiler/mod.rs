// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Single-pass Pratt compiler.
//!
//! Source text goes straight to bytecode: there is no AST. The compiler
//! keeps a stack of per-function states so nested function literals can
//! resolve captured variables by walking outward, emits jumps with
//! back-patching, and recovers from errors at statement boundaries so a
//! run can report several diagnostics.
//!
//! This module owns declarations, statements, scopes and loops; the
//! expression grammar lives in [`expr`].

pub mod parser;

mod expr;

use std::rc::Rc;

use eule_syntax::TokenKind;

use crate::chunk::{Function, UpvalDesc};
use crate::error::CompileError;
use crate::opcode::Op;
use crate::value::Value;

use parser::Parser;

/// Hard limit on declared parameters.
pub const MAX_PARAMS: usize = 16;

/// Constant pools, locals and upvalue lists are byte-indexed.
const MAX_SLOTS: usize = 256;

/// Compile a source unit into its script function.
pub fn compile(source: &str) -> Result<Rc<Function>, CompileError> {
    let mut compiler = Compiler::new(source);
    while !compiler.parser.match_kind(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.emit_return();

    if compiler.parser.had_error {
        return Err(CompileError::new(compiler.parser.diagnostics));
    }
    match compiler.states.pop() {
        Some(state) => Ok(Rc::new(state.function)),
        None => Err(CompileError::new(Vec::new())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FnType {
    Script,
    Function,
}

#[derive(Debug)]
struct Local {
    name: String,
    depth: u32,
    initialized: bool,
    captured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    Loop,
    Block,
}

/// Compilation context of one loop or labelled block.
#[derive(Debug)]
struct LoopCtx {
    label: Option<String>,
    kind: LoopKind,
    /// `continue` target; rewritten by `for` once its step clause exists.
    start: usize,
    /// `break` jumps to patch at loop end.
    breaks: Vec<usize>,
    /// Scope depth at loop entry; `break`/`continue` discard deeper locals.
    depth: u32,
}

/// Per-function compilation state.
struct FnState {
    function: Function,
    fn_type: FnType,
    locals: Vec<Local>,
    loops: Vec<LoopCtx>,
    scope: u32,
    /// Pending prefix `++`/`--` markers, consumed by the assignment helper.
    prefix: Vec<bool>,
}

impl FnState {
    fn script() -> Self {
        FnState {
            function: Function::new("@"),
            fn_type: FnType::Script,
            locals: Vec::new(),
            loops: Vec::new(),
            scope: 0,
            prefix: Vec::new(),
        }
    }

    fn nested(name: &str) -> Self {
        FnState {
            function: Function::new(name),
            fn_type: FnType::Function,
            locals: Vec::new(),
            loops: Vec::new(),
            scope: 1,
            prefix: Vec::new(),
        }
    }
}

pub(crate) struct Compiler<'src> {
    parser: Parser<'src>,
    states: Vec<FnState>,
}

impl<'src> Compiler<'src> {
    fn new(source: &'src str) -> Self {
        Compiler {
            parser: Parser::new(source),
            states: vec![FnState::script()],
        }
    }

    fn state(&self) -> &FnState {
        &self.states[self.states.len() - 1]
    }

    fn state_mut(&mut self) -> &mut FnState {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /* == declarations & statements ========================================= */

    fn declaration(&mut self) {
        if self.parser.match_kind(TokenKind::Var) {
            self.variable_declaration();
        } else if self.parser.check(TokenKind::Func) && self.parser.check_next(TokenKind::Identifier)
        {
            self.parser.advance();
            self.function_declaration();
        } else {
            self.statement();
        }

        if self.parser.panic {
            self.parser.synchronize();
        }
    }

    fn statement(&mut self) {
        if self.parser.match_kind(TokenKind::Semicolon) || self.parser.match_kind(TokenKind::NewLine)
        {
            // empty statement
        } else if self.parser.match_kind(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else if self.parser.match_kind(TokenKind::If) {
            self.if_statement(false);
        } else if self.parser.match_kind(TokenKind::Unless) {
            self.if_statement(true);
        } else if self.parser.match_kind(TokenKind::While) {
            self.while_statement(None, false);
        } else if self.parser.match_kind(TokenKind::Until) {
            self.while_statement(None, true);
        } else if self.parser.match_kind(TokenKind::Do) {
            self.do_statement(None);
        } else if self.parser.match_kind(TokenKind::For) {
            self.for_statement(None);
        } else if self.parser.match_kind(TokenKind::Foreach) {
            self.foreach_statement(None);
        } else if self.parser.match_kind(TokenKind::Break) {
            self.break_statement();
        } else if self.parser.match_kind(TokenKind::Continue) {
            self.continue_statement();
        } else if self.parser.match_kind(TokenKind::Return) {
            self.return_statement();
        } else if self.parser.check(TokenKind::Identifier) && self.parser.check_next(TokenKind::Colon)
        {
            self.label_statement();
        } else {
            self.expression_statement();
        }
    }

    fn variable_declaration(&mut self) {
        let mut need_semicolon = false;
        loop {
            let name_index = self.declare_variable();
            let name = self.parser.previous.literal.to_string();
            if self.parser.match_kind(TokenKind::Equal) {
                self.expression();
                need_semicolon = true;
            } else if self.parser.check(TokenKind::LeftParen)
                || self.parser.check(TokenKind::EqualRightAngle)
                || self.parser.check(TokenKind::LeftBrace)
            {
                let is_arrow = self.function(&name);
                need_semicolon = is_arrow;
            } else {
                self.emit(Op::Nihil);
                need_semicolon = true;
            }
            self.define_variable(name_index);
            if !self.parser.match_kind(TokenKind::Comma) {
                break;
            }
        }
        if need_semicolon {
            self.parser.consume_semicolon();
        }
    }

    /// `func name(params) body`: sugar for a function-valued declaration,
    /// except the name is visible inside the body for self-recursion.
    fn function_declaration(&mut self) {
        let name_index = self.declare_variable();
        let name = self.parser.previous.literal.to_string();
        if self.state().scope > 0 {
            self.mark_last_initialized();
        }
        let is_arrow = self.function(&name);
        self.define_variable(name_index);
        if is_arrow {
            self.parser.consume_semicolon();
        }
    }

    fn block(&mut self) {
        while !self.parser.check(TokenKind::RightBrace) && !self.parser.check(TokenKind::Eof) {
            self.declaration();
        }
        self.parser.consume(TokenKind::RightBrace);
    }

    fn if_statement(&mut self, reverse: bool) {
        self.parser.consume(TokenKind::LeftParen);
        self.expression_allow_comma();
        self.parser.consume(TokenKind::RightParen);

        if reverse {
            self.emit(Op::Not);
        }
        let then_jump = self.emit_jump(Op::JumpIfFalse);

        self.emit(Op::Pop);

        self.parser.ignore_newline();
        self.statement();

        let else_jump = self.emit_jump(Op::Jump);

        self.patch_jump(then_jump);

        self.emit(Op::Pop);

        if self.parser.match_kind(TokenKind::Else) {
            self.statement();
        }

        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self, label: Option<String>, reverse: bool) {
        let loop_start = self.begin_loop(label, LoopKind::Loop);

        self.parser.consume(TokenKind::LeftParen);
        self.expression_allow_comma();
        self.parser.consume(TokenKind::RightParen);

        if reverse {
            self.emit(Op::Not);
        }
        let exit_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);

        self.parser.ignore_newline();
        self.statement();

        self.emit_jump_back(loop_start);

        self.patch_jump(exit_jump);
        self.emit(Op::Pop);

        self.end_loop();
    }

    fn do_statement(&mut self, label: Option<String>) {
        let loop_start = self.begin_loop(label, LoopKind::Loop);

        self.parser.ignore_newline();
        self.statement();

        let reverse = if self.parser.match_kind(TokenKind::Until) {
            true
        } else {
            self.parser.consume(TokenKind::While);
            false
        };
        self.parser.consume(TokenKind::LeftParen);

        self.expression_allow_comma();

        if reverse {
            self.emit(Op::Not);
        }
        let exit_jump = self.emit_jump(Op::JumpIfFalse);

        self.emit(Op::Pop);
        self.emit_jump_back(loop_start);

        self.parser.consume(TokenKind::RightParen);
        self.parser.consume_semicolon();

        self.patch_jump(exit_jump);
        self.emit(Op::Pop);

        self.end_loop();
    }

    fn for_statement(&mut self, label: Option<String>) {
        self.begin_scope();
        self.parser.consume(TokenKind::LeftParen);
        if self.parser.match_kind(TokenKind::Semicolon) {
            // no initializer
        } else if self.parser.match_kind(TokenKind::Var) {
            self.variable_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.begin_loop(label, LoopKind::Loop);
        let mut exit_jump = None;
        if !self.parser.match_kind(TokenKind::Semicolon) {
            self.expression_allow_comma();
            self.parser.consume_semicolon();

            exit_jump = Some(self.emit_jump(Op::JumpIfFalse));
            self.emit(Op::Pop);
        }

        if !self.parser.match_kind(TokenKind::RightParen) {
            let body_jump = self.emit_jump(Op::Jump);
            let increment_start = self.code_len();
            self.expression_allow_comma();
            self.emit(Op::Pop);
            self.parser.consume(TokenKind::RightParen);

            self.emit_jump_back(loop_start);
            if let Some(ctx) = self.state_mut().loops.last_mut() {
                ctx.start = increment_start;
            }
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.parser.ignore_newline();
        self.statement();
        self.emit_jump_back(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit(Op::Pop);
        }

        self.end_loop();
        self.end_scope();
    }

    /// `foreach (x in expr) s`: `expr` must yield a callable iterator; each
    /// call returns a `{value, done}` record. The iterator lives in a hidden
    /// local, the loop variable is assigned from each record.
    fn foreach_statement(&mut self, label: Option<String>) {
        self.begin_scope();

        self.parser.consume(TokenKind::LeftParen);
        self.parser.consume(TokenKind::Identifier);
        let variable = self.parser.previous.literal.to_string();
        self.add_local(variable);
        self.emit(Op::Nihil);
        self.mark_last_initialized();
        let variable_slot = (self.state().locals.len() - 1) as u8;

        self.parser.consume(TokenKind::In);
        self.expression();
        self.add_local("@".to_string());
        self.mark_last_initialized();
        self.parser.consume(TokenKind::RightParen);

        let loop_start = self.begin_loop(label, LoopKind::Loop);

        self.emit(Op::Dup);
        self.emit_with(Op::Call, 0);
        let exit_jump = self.emit_jump(Op::JumpIfDone);

        self.emit_with(Op::StoreLocal, variable_slot);
        self.emit(Op::Pop);

        self.parser.ignore_newline();
        self.statement();
        self.emit_jump_back(loop_start);

        self.patch_jump(exit_jump);

        self.end_loop();
        self.end_scope();
    }

    fn break_statement(&mut self) {
        if !self.parser.match_semicolon() {
            self.parser.consume(TokenKind::Identifier);
            let label = self.parser.previous.literal.to_string();
            let target = self
                .state()
                .loops
                .iter()
                .rposition(|ctx| ctx.label.as_deref() == Some(label.as_str()));
            match target {
                Some(index) => self.emit_break(index),
                None => {
                    self.parser.error_at_previous("undefined label");
                    return;
                }
            }
        } else {
            let target = self
                .state()
                .loops
                .iter()
                .rposition(|ctx| ctx.kind == LoopKind::Loop);
            match target {
                Some(index) => self.emit_break(index),
                None => {
                    self.parser.error_at_previous("break outside loop");
                    return;
                }
            }
        }
        self.parser.consume_end();
    }

    fn emit_break(&mut self, index: usize) {
        self.discard_locals(self.state().loops[index].depth);
        let jump = self.emit_jump(Op::Jump);
        self.state_mut().loops[index].breaks.push(jump);
    }

    fn continue_statement(&mut self) {
        if !self.parser.match_semicolon() {
            self.parser.consume(TokenKind::Identifier);
            let label = self.parser.previous.literal.to_string();
            let target = self
                .state()
                .loops
                .iter()
                .rposition(|ctx| ctx.label.as_deref() == Some(label.as_str()));
            match target {
                Some(index) => {
                    if self.state().loops[index].kind != LoopKind::Loop {
                        self.parser.error_at_previous("continue non loop label");
                        return;
                    }
                    self.emit_continue(index);
                }
                None => {
                    self.parser.error_at_previous("undefined label");
                    return;
                }
            }
        } else {
            let target = self
                .state()
                .loops
                .iter()
                .rposition(|ctx| ctx.kind == LoopKind::Loop);
            match target {
                Some(index) => self.emit_continue(index),
                None => {
                    self.parser.error_at_previous("continue outside loop");
                    return;
                }
            }
        }
        self.parser.consume_end();
    }

    fn emit_continue(&mut self, index: usize) {
        self.discard_locals(self.state().loops[index].depth);
        let start = self.state().loops[index].start;
        self.emit_jump_back(start);
    }

    fn return_statement(&mut self) {
        if self.state().fn_type == FnType::Script {
            self.parser.error_at_previous("return outside function");
        }

        if self.parser.match_semicolon() {
            self.emit_return();
        } else {
            self.expression();
            self.parser.consume_end();
            self.emit(Op::Return);
        }
    }

    fn label_statement(&mut self) {
        let label = self.parser.current.literal.to_string();
        self.parser.advance();
        self.parser.advance();
        if self.parser.match_kind(TokenKind::While) {
            self.while_statement(Some(label), false);
        } else if self.parser.match_kind(TokenKind::Until) {
            self.while_statement(Some(label), true);
        } else if self.parser.match_kind(TokenKind::Do) {
            self.do_statement(Some(label));
        } else if self.parser.match_kind(TokenKind::For) {
            self.for_statement(Some(label));
        } else if self.parser.match_kind(TokenKind::Foreach) {
            self.foreach_statement(Some(label));
        } else if self.parser.match_kind(TokenKind::LeftBrace) {
            self.begin_loop(Some(label), LoopKind::Block);
            self.begin_scope();
            self.block();
            self.end_scope();
            self.end_loop();
        } else {
            self.statement();
        }
    }

    fn expression_statement(&mut self) {
        self.expression_allow_comma();
        self.parser.consume_end();
        self.emit(Op::Pop);
    }

    /* == variables ========================================================= */

    fn declare_variable(&mut self) -> u8 {
        self.parser.consume(TokenKind::Identifier);
        if self.state().scope == 0 {
            let name = self.parser.previous.literal.to_string();
            self.make_constant(Value::string(&name))
        } else {
            self.declare_local_variable();
            0
        }
    }

    fn define_variable(&mut self, name_index: u8) {
        if self.state().scope == 0 {
            self.emit_with(Op::DefineGlobal, name_index);
        } else {
            self.mark_last_initialized();
        }
    }

    fn declare_local_variable(&mut self) {
        let name = self.parser.previous.literal.to_string();
        let scope = self.state().scope;
        let mut duplicate = false;
        for local in self.state().locals.iter().rev() {
            if local.depth < scope {
                break;
            }
            if local.name == name {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.parser.error_at_previous("variable already declared");
        }

        self.add_local(name);
    }

    fn add_local(&mut self, name: String) {
        if self.state().locals.len() == MAX_SLOTS {
            self.parser.error_at_previous("too many variables (255)");
        }
        let depth = self.state().scope;
        self.state_mut().locals.push(Local {
            name,
            depth,
            initialized: false,
            captured: false,
        });
    }

    fn mark_last_initialized(&mut self) {
        if let Some(local) = self.state_mut().locals.last_mut() {
            local.initialized = true;
        }
    }

    fn resolve_local(&self, level: usize, name: &str) -> Option<u8> {
        for (index, local) in self.states[level].locals.iter().enumerate().rev() {
            if local.name == name && local.initialized {
                return Some(index as u8);
            }
        }
        None
    }

    fn resolve_upval(&mut self, level: usize, name: &str) -> Option<u8> {
        if level == 0 {
            return None;
        }
        if let Some(local) = self.resolve_local(level - 1, name) {
            self.states[level - 1].locals[local as usize].captured = true;
            return Some(self.add_upval(level, local, true));
        }
        if let Some(upval) = self.resolve_upval(level - 1, name) {
            return Some(self.add_upval(level, upval, false));
        }
        None
    }

    fn add_upval(&mut self, level: usize, index: u8, is_local: bool) -> u8 {
        for (existing, desc) in self.states[level].function.upvals.iter().enumerate() {
            if desc.index == index && desc.is_local == is_local {
                return existing as u8;
            }
        }

        if self.states[level].function.upvals.len() == MAX_SLOTS {
            self.parser.error_at_previous("too many upvalues (255)");
        }

        self.states[level]
            .function
            .upvals
            .push(UpvalDesc { is_local, index });
        (self.states[level].function.upvals.len() - 1) as u8
    }

    /* == scopes & loops ==================================================== */

    fn begin_scope(&mut self) {
        self.state_mut().scope += 1;
    }

    fn end_scope(&mut self) {
        self.state_mut().scope -= 1;

        loop {
            let op = match self.state().locals.last() {
                Some(local) if local.depth > self.state().scope => {
                    if local.captured {
                        Op::CloseUpvalue
                    } else {
                        Op::Pop
                    }
                }
                _ => break,
            };
            self.emit(op);
            self.state_mut().locals.pop();
        }
    }

    /// Emit pops (or upvalue closes) for locals deeper than `depth` without
    /// forgetting them; used before `break`/`continue` jumps so the runtime
    /// stack matches the jump target.
    fn discard_locals(&mut self, depth: u32) {
        let ops: Vec<Op> = self
            .state()
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth > depth)
            .map(|local| {
                if local.captured {
                    Op::CloseUpvalue
                } else {
                    Op::Pop
                }
            })
            .collect();
        for op in ops {
            self.emit(op);
        }
    }

    fn begin_loop(&mut self, label: Option<String>, kind: LoopKind) -> usize {
        let start = self.code_len();
        let depth = self.state().scope;
        self.state_mut().loops.push(LoopCtx {
            label,
            kind,
            start,
            breaks: Vec::new(),
            depth,
        });
        start
    }

    fn end_loop(&mut self) {
        if let Some(ctx) = self.state_mut().loops.pop() {
            for break_jump in ctx.breaks {
                self.patch_jump(break_jump);
            }
        }
    }

    /* == emission ========================================================== */

    fn code_len(&self) -> usize {
        self.state().function.code.len()
    }

    fn emit(&mut self, op: Op) {
        self.emit_byte(op as u8);
    }

    fn emit_with(&mut self, op: Op, operand: u8) {
        self.emit_byte(op as u8);
        self.emit_byte(operand);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line;
        self.state_mut().function.write(byte, line);
    }

    fn emit_number(&mut self, number: f64) {
        if (0.0..=255.0).contains(&number) && number.floor() == number {
            self.emit_with(Op::SmallInt, number as u8);
        } else {
            self.emit_constant(Value::Number(number));
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_with(Op::Constant, index);
    }

    fn emit_return(&mut self) {
        self.emit(Op::Nihil);
        self.emit(Op::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.state_mut().function.add_constant(value);
        if index >= MAX_SLOTS {
            self.parser.error_at_previous("too many constants (255)");
            return 0;
        }
        index as u8
    }

    fn consume_identifier_constant(&mut self) {
        self.parser.consume(TokenKind::Identifier);
        let name = self.parser.previous.literal.to_string();
        self.emit_constant(Value::string(&name));
    }

    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.code_len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.code_len() - offset - 2;

        if jump > u16::MAX as usize {
            self.parser.error_at_previous("too long jump");
        }

        let function = &mut self.state_mut().function;
        function.code[offset] = ((jump >> 8) & 0xff) as u8;
        function.code[offset + 1] = (jump & 0xff) as u8;
    }

    fn emit_jump_back(&mut self, loop_start: usize) {
        self.emit(Op::JumpBack);

        let offset = self.code_len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.parser.error_at_previous("too long jump");
        }

        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }
}
