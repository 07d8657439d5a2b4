// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Pratt expression grammar.
//!
//! Every token kind maps to at most one prefix handler and one infix
//! handler with a precedence; parsing advances, dispatches the prefix,
//! then folds infix handlers while the lookahead binds at least as
//! tightly. Writable targets (variables, keys, arrow properties) all
//! funnel through one assignment helper, which is what lets compound
//! assignment and prefix/postfix `++`/`--` share a single lowering.

use eule_syntax::TokenKind;

use crate::opcode::Op;
use crate::value::{parse_number, Value};

use super::{Compiler, MAX_PARAMS};

/// Precedence bands, lowest binds loosest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Prec {
    Lowest,
    Comma,
    Assign,
    Ternary,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
}

fn precedence_of(kind: TokenKind) -> Prec {
    match kind {
        TokenKind::Comma => Prec::Comma,

        TokenKind::Question | TokenKind::Then => Prec::Ternary,

        TokenKind::PipePipe | TokenKind::Or => Prec::Or,

        TokenKind::AmperAmper | TokenKind::And => Prec::And,

        TokenKind::EqualEqual | TokenKind::BangEqual => Prec::Equality,

        TokenKind::LeftAngle
        | TokenKind::RightAngle
        | TokenKind::LeftAngleEqual
        | TokenKind::RightAngleEqual => Prec::Comparison,

        TokenKind::Plus | TokenKind::Minus => Prec::Term,

        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Prec::Factor,

        TokenKind::LeftParen
        | TokenKind::LeftBracket
        | TokenKind::Dot
        | TokenKind::MinusRightAngle => Prec::Call,

        _ => Prec::Lowest,
    }
}

fn one_tighter(prec: Prec) -> Prec {
    match prec {
        Prec::Lowest => Prec::Comma,
        Prec::Comma => Prec::Assign,
        Prec::Assign => Prec::Ternary,
        Prec::Ternary => Prec::Or,
        Prec::Or => Prec::And,
        Prec::And => Prec::Equality,
        Prec::Equality => Prec::Comparison,
        Prec::Comparison => Prec::Term,
        Prec::Term => Prec::Factor,
        Prec::Factor => Prec::Unary,
        Prec::Unary | Prec::Call => Prec::Call,
    }
}

fn is_assign_token(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Equal
            | TokenKind::PlusEqual
            | TokenKind::MinusEqual
            | TokenKind::StarEqual
            | TokenKind::SlashEqual
            | TokenKind::PercentEqual
            | TokenKind::PipePipeEqual
            | TokenKind::AmperAmperEqual
    )
}

/// A writable (or readable) reference the assignment helper operates on.
///
/// The three shapes differ only in how `set`, `get`, and
/// get-without-consuming-the-receiver are emitted.
#[derive(Debug, Clone, Copy)]
enum Lvalue {
    /// Local, upvalue or global, by slot/constant index.
    Named { get: Op, set: Op, index: u8 },
    /// `receiver[key]` or `receiver.key`: receiver and key are on the stack.
    Keyed,
    /// `receiver->prop` without a call: getter/setter invocation.
    Method,
}

impl<'src> Compiler<'src> {
    pub(super) fn expression_allow_comma(&mut self) {
        self.parse_precedence(Prec::Comma);
    }

    pub(super) fn expression(&mut self) {
        self.parse_precedence(Prec::Assign);
    }

    fn parse_precedence(&mut self, prec: Prec) {
        self.parser.advance();
        let can_assign = prec <= Prec::Assign;
        if !self.nud(can_assign) {
            self.parser.error_at_previous("expression expected");
            return;
        }

        while prec <= precedence_of(self.parser.current.kind) {
            self.parser.advance();
            self.led(can_assign);
        }

        if matches!(
            self.parser.current.kind,
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            self.parser.error_at_previous("invalid postincrement");
        } else if can_assign && is_assign_token(self.parser.current.kind) {
            self.parser.error_at_previous("invalid assignment");
        }
    }

    /// Prefix dispatch; false when the token cannot start an expression.
    fn nud(&mut self, can_assign: bool) -> bool {
        match self.parser.previous.kind {
            TokenKind::LeftParen => self.parse_group(),
            TokenKind::LeftBracket => self.parse_array(),
            TokenKind::LeftBrace => self.parse_table(),
            TokenKind::Identifier => {
                let name = self.parser.previous.literal.to_string();
                self.named_variable(&name, can_assign);
            }
            TokenKind::Nihil => self.emit(Op::Nihil),
            TokenKind::False => self.emit(Op::False),
            TokenKind::True => self.emit(Op::True),
            TokenKind::Number => self.parse_number_literal(),
            TokenKind::String => self.parse_string_literal(),
            TokenKind::Func => {
                self.function("");
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Bang
            | TokenKind::Not
            | TokenKind::TypeOf
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus => self.parse_prefix(),
            _ => return false,
        }
        true
    }

    /// Infix dispatch; only called for kinds the precedence table maps.
    fn led(&mut self, can_assign: bool) {
        match self.parser.previous.kind {
            TokenKind::Comma => self.parse_comma(),
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::LeftAngle
            | TokenKind::LeftAngleEqual
            | TokenKind::RightAngle
            | TokenKind::RightAngleEqual => self.parse_infix(),
            TokenKind::PipePipe | TokenKind::Or => self.parse_or(),
            TokenKind::AmperAmper | TokenKind::And => self.parse_and(),
            TokenKind::Question | TokenKind::Then => self.parse_ternary(),
            TokenKind::LeftParen => self.parse_call(),
            TokenKind::LeftBracket => self.parse_index(can_assign),
            TokenKind::Dot => self.parse_dot(can_assign),
            TokenKind::MinusRightAngle => self.parse_arrow_call(can_assign),
            _ => self.parser.error_at_previous("expression expected"),
        }
    }

    /* == prefix handlers =================================================== */

    fn parse_group(&mut self) {
        if self.parser.lambda_ahead() {
            self.lambda();
            return;
        }
        self.expression_allow_comma();
        self.parser.consume(TokenKind::RightParen);
    }

    fn parse_number_literal(&mut self) {
        match parse_number(&self.parser.previous.literal) {
            Some(number) => self.emit_number(number),
            None => self.parser.error_at_previous("malformed number"),
        }
    }

    fn parse_string_literal(&mut self) {
        let literal = self.parser.previous.literal.to_string();
        let text = &literal[1..literal.len() - 1];
        self.emit_constant(Value::string(text));
    }

    fn parse_table(&mut self) {
        let mut index = 0.0f64;
        self.emit(Op::Table);
        if !self.parser.check(TokenKind::RightBrace) {
            loop {
                if self.parser.match_kind(TokenKind::Dot) {
                    self.consume_identifier_constant();
                    let name = self.parser.previous.literal.to_string();
                    if self.parser.match_kind(TokenKind::Equal) {
                        self.expression();
                    } else if self.parser.check(TokenKind::LeftParen)
                        || self.parser.check(TokenKind::EqualRightAngle)
                        || self.parser.check(TokenKind::LeftBrace)
                    {
                        self.function(&name);
                    } else {
                        self.named_variable(&name, false);
                    }
                    self.emit(Op::AddKey);
                } else if self.parser.match_kind(TokenKind::LeftBracket) {
                    self.expression_allow_comma();
                    self.parser.consume(TokenKind::RightBracket);
                    self.parser.consume(TokenKind::Equal);
                    self.expression();
                    self.emit(Op::AddKey);
                } else {
                    self.expression();
                    if self.parser.match_kind(TokenKind::DotDotDot) {
                        self.emit(Op::AddSpread);
                    } else {
                        self.emit_number(index);
                        index += 1.0;
                        self.emit(Op::Swap);
                        self.emit(Op::AddKey);
                    }
                }
                if !self.parser.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.parser.check(TokenKind::RightBrace) {
                    break;
                }
            }
        }
        self.parser.consume(TokenKind::RightBrace);
    }

    fn parse_array(&mut self) {
        self.emit(Op::Array);
        if !self.parser.check(TokenKind::RightBracket) {
            loop {
                self.expression();
                if self.parser.match_kind(TokenKind::DotDotDot) {
                    self.emit(Op::AddArraySpread);
                } else {
                    self.emit(Op::AddArrayElt);
                }
                if !self.parser.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.parser.check(TokenKind::RightBracket) {
                    break;
                }
            }
        }
        self.parser.consume(TokenKind::RightBracket);
    }

    fn parse_try(&mut self) {
        let try_jump = self.emit_jump(Op::OpenTry);
        self.expression();
        self.emit(Op::CloseTry);
        self.patch_jump(try_jump);
    }

    fn parse_prefix(&mut self) {
        let op_kind = self.parser.previous.kind;
        let prefix_len = self.state().prefix.len();
        match op_kind {
            TokenKind::PlusPlus => self.state_mut().prefix.push(true),
            TokenKind::MinusMinus => self.state_mut().prefix.push(false),
            _ => {}
        }
        self.parse_precedence(Prec::Unary);
        match op_kind {
            TokenKind::Bang | TokenKind::Not => self.emit(Op::Not),
            TokenKind::Plus => self.emit(Op::Pos),
            TokenKind::Minus => self.emit(Op::Neg),
            TokenKind::TypeOf => self.emit(Op::TypeOf),
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                if prefix_len < self.state().prefix.len() {
                    self.state_mut().prefix.clear();
                    self.parser.error_at_previous("invalid preincrement");
                }
            }
            _ => {}
        }
    }

    /* == infix handlers ==================================================== */

    fn parse_comma(&mut self) {
        self.emit(Op::Pop);
        self.expression_allow_comma();
    }

    fn parse_infix(&mut self) {
        let op_kind = self.parser.previous.kind;
        self.parse_precedence(one_tighter(precedence_of(op_kind)));
        match op_kind {
            TokenKind::BangEqual => {
                self.emit(Op::Eq);
                self.emit(Op::Not);
            }
            TokenKind::EqualEqual => self.emit(Op::Eq),
            TokenKind::LeftAngle => self.emit(Op::Lt),
            TokenKind::LeftAngleEqual => self.emit(Op::Le),
            // Strict greater: compare with swapped operands so NaN compares
            // false on both orders.
            TokenKind::RightAngle => {
                self.emit(Op::Swap);
                self.emit(Op::Lt);
            }
            TokenKind::RightAngleEqual => {
                self.emit(Op::Swap);
                self.emit(Op::Le);
            }
            TokenKind::Plus => self.emit(Op::Add),
            TokenKind::Minus => self.emit(Op::Sub),
            TokenKind::Star => self.emit(Op::Mul),
            TokenKind::Slash => self.emit(Op::Div),
            TokenKind::Percent => self.emit(Op::Mod),
            _ => {}
        }
    }

    fn parse_or(&mut self) {
        let else_jump = self.emit_jump(Op::JumpIfFalse);
        let end_jump = self.emit_jump(Op::Jump);
        self.patch_jump(else_jump);
        self.emit(Op::Pop);
        self.parse_precedence(Prec::Or);
        self.patch_jump(end_jump);
    }

    fn parse_and(&mut self) {
        let end_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.parse_precedence(Prec::And);
        self.patch_jump(end_jump);
    }

    fn parse_ternary(&mut self) {
        let then_jump = self.emit_jump(Op::JumpIfFalse);
        self.emit(Op::Pop);
        self.expression_allow_comma();
        let else_jump = self.emit_jump(Op::Jump);
        if !self.parser.match_kind(TokenKind::Else) {
            self.parser.consume(TokenKind::Colon);
        }
        self.patch_jump(then_jump);
        self.emit(Op::Pop);
        self.expression();
        self.patch_jump(else_jump);
    }

    fn parse_call(&mut self) {
        let (arg_count, spread) = self.argument_list();
        if spread {
            self.emit_with(Op::CallSpread, arg_count);
        } else {
            self.emit_with(Op::Call, arg_count);
        }
    }

    fn parse_index(&mut self, can_assign: bool) {
        self.expression_allow_comma();
        self.parser.consume(TokenKind::RightBracket);
        self.assign(Lvalue::Keyed, can_assign);
    }

    fn parse_dot(&mut self, can_assign: bool) {
        self.consume_identifier_constant();
        self.assign(Lvalue::Keyed, can_assign);
    }

    /// `receiver->name`: loads the property and calls it with the receiver
    /// as first argument; without an argument list it acts as a
    /// getter/setter invocation through the assignment helper.
    fn parse_arrow_call(&mut self, can_assign: bool) {
        self.emit(Op::Dup);
        self.consume_identifier_constant();
        self.emit(Op::LoadKey);
        self.emit(Op::Swap);
        if self.parser.match_kind(TokenKind::LeftParen) {
            let (arg_count, spread) = self.argument_list();
            if spread {
                self.emit_with(Op::CallSpread, arg_count + 1);
            } else {
                self.emit_with(Op::Call, arg_count + 1);
            }
        } else {
            self.assign(Lvalue::Method, can_assign);
        }
    }

    /* == assignment ======================================================== */

    fn assign(&mut self, target: Lvalue, can_assign: bool) {
        let pending = !self.state().prefix.is_empty()
            && precedence_of(self.parser.current.kind) <= Prec::Unary;
        if pending {
            let increment = matches!(self.state_mut().prefix.pop(), Some(true));
            self.emit_get_keep(target);
            self.emit_number(1.0);
            self.emit(if increment { Op::Add } else { Op::Sub });
            self.emit_set(target);
        } else if self.parser.match_kind(TokenKind::PlusPlus) {
            self.emit_get_keep(target);
            self.emit(Op::StoreTemp);
            self.emit_number(1.0);
            self.emit(Op::Add);
            self.emit_set(target);
            self.emit(Op::LoadTemp);
        } else if self.parser.match_kind(TokenKind::MinusMinus) {
            self.emit_get_keep(target);
            self.emit(Op::StoreTemp);
            self.emit_number(1.0);
            self.emit(Op::Sub);
            self.emit_set(target);
            self.emit(Op::LoadTemp);
        } else if can_assign {
            if self.parser.match_kind(TokenKind::Equal) {
                self.expression();
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::PlusEqual) {
                self.emit_get_keep(target);
                self.expression();
                self.emit(Op::Add);
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::MinusEqual) {
                self.emit_get_keep(target);
                self.expression();
                self.emit(Op::Sub);
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::StarEqual) {
                self.emit_get_keep(target);
                self.expression();
                self.emit(Op::Mul);
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::SlashEqual) {
                self.emit_get_keep(target);
                self.expression();
                self.emit(Op::Div);
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::PercentEqual) {
                self.emit_get_keep(target);
                self.expression();
                self.emit(Op::Mod);
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::PipePipeEqual) {
                self.emit_get_keep(target);
                self.parse_or();
                self.emit_set(target);
            } else if self.parser.match_kind(TokenKind::AmperAmperEqual) {
                self.emit_get_keep(target);
                self.parse_and();
                self.emit_set(target);
            } else {
                self.emit_get(target);
            }
        } else {
            self.emit_get(target);
        }
    }

    fn emit_get(&mut self, target: Lvalue) {
        match target {
            Lvalue::Named { get, index, .. } => self.emit_with(get, index),
            Lvalue::Keyed => self.emit(Op::LoadKey),
            Lvalue::Method => self.emit_with(Op::Call, 1),
        }
    }

    fn emit_set(&mut self, target: Lvalue) {
        match target {
            Lvalue::Named { set, index, .. } => self.emit_with(set, index),
            Lvalue::Keyed => self.emit(Op::StoreKey),
            Lvalue::Method => self.emit_with(Op::Call, 2),
        }
    }

    fn emit_get_keep(&mut self, target: Lvalue) {
        match target {
            Lvalue::Named { get, index, .. } => self.emit_with(get, index),
            Lvalue::Keyed => {
                self.emit(Op::DupTwo);
                self.emit(Op::LoadKey);
            }
            Lvalue::Method => {
                self.emit(Op::DupTwo);
                self.emit_with(Op::Call, 1);
            }
        }
    }

    pub(super) fn named_variable(&mut self, name: &str, can_assign: bool) {
        let level = self.states.len() - 1;
        let target = if let Some(index) = self.resolve_local(level, name) {
            Lvalue::Named {
                get: Op::LoadLocal,
                set: Op::StoreLocal,
                index,
            }
        } else if let Some(index) = self.resolve_upval(level, name) {
            Lvalue::Named {
                get: Op::LoadUpvalue,
                set: Op::StoreUpvalue,
                index,
            }
        } else {
            let index = self.make_constant(Value::string(name));
            Lvalue::Named {
                get: Op::LoadGlobal,
                set: Op::StoreGlobal,
                index,
            }
        };
        self.assign(target, can_assign);
    }

    /* == functions ========================================================= */

    /// Compile a function literal whose `(` has not been consumed; the
    /// parameter list is optional. Returns true for the single-expression
    /// arrow form, whose declaration still needs a terminator.
    pub(super) fn function(&mut self, name: &str) -> bool {
        self.states.push(super::FnState::nested(name));
        if self.parser.match_kind(TokenKind::LeftParen) {
            self.parameter_list();
        }
        self.function_tail()
    }

    /// Compile `(params) => …` or `(params) { … }` whose `(` was consumed in
    /// prefix position.
    fn lambda(&mut self) {
        self.states.push(super::FnState::nested(""));
        self.parameter_list();
        self.function_tail();
    }

    fn function_tail(&mut self) -> bool {
        let mut is_arrow = false;
        if self.parser.match_kind(TokenKind::EqualRightAngle) {
            if self.parser.match_kind(TokenKind::LeftBrace) {
                self.block();
                self.emit_return();
            } else {
                is_arrow = true;
                self.expression();
                self.emit(Op::Return);
            }
        } else {
            self.parser.consume(TokenKind::LeftBrace);
            self.block();
            self.emit_return();
        }
        self.finish_function();
        is_arrow
    }

    fn finish_function(&mut self) {
        if let Some(state) = self.states.pop() {
            let function = state.function;
            let has_upvals = !function.upvals.is_empty();
            self.emit_constant(Value::Function(std::rc::Rc::new(function)));
            if has_upvals {
                self.emit(Op::Closure);
            }
        }
    }

    fn parameter_list(&mut self) {
        if !self.parser.check(TokenKind::RightParen) {
            loop {
                let name_index = self.declare_variable();
                if self.parser.match_kind(TokenKind::DotDotDot) {
                    self.state_mut().function.vararg = true;
                }
                let count = self.state().function.param_count.saturating_add(1);
                self.state_mut().function.param_count = count;
                if self.state().function.param_count as usize > MAX_PARAMS {
                    self.parser.error_at_previous("too many parameters (16)");
                }
                self.define_variable(name_index);
                if !self.parser.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.parser.check(TokenKind::RightParen) || self.state().function.vararg {
                    break;
                }
            }
        }
        self.parser.consume(TokenKind::RightParen);
    }

    fn argument_list(&mut self) -> (u8, bool) {
        let mut arg_count: u32 = 0;
        let mut spread = false;
        if !self.parser.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if self.parser.match_kind(TokenKind::DotDotDot) {
                    spread = true;
                } else {
                    arg_count += 1;
                }
                if arg_count as usize > MAX_PARAMS {
                    self.parser.error_at_previous("too many arguments (16)");
                }
                if !self.parser.match_kind(TokenKind::Comma) {
                    break;
                }
                if self.parser.check(TokenKind::RightParen) || spread {
                    break;
                }
            }
        }
        self.parser.consume(TokenKind::RightParen);
        (arg_count.min(u8::MAX as u32) as u8, spread)
    }
}
