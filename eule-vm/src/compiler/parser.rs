// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Token reader: lookahead, consumption helpers, diagnostics and panic-mode
//! recovery for the compiler.

use eule_syntax::{Scanner, Token, TokenKind};

use crate::error::{At, Diagnostic};

/// Reads tokens with one token of lookahead past the current one.
///
/// `previous` is the token most recently consumed, `current` the one under
/// the cursor, `next` the one after it (needed to spot `label:` statements
/// and named `func` declarations).
pub struct Parser<'src> {
    scanner: Scanner<'src>,
    pub previous: Token<'src>,
    pub current: Token<'src>,
    pub next: Token<'src>,
    pub had_error: bool,
    pub panic: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut parser = Parser {
            scanner: Scanner::new(source),
            previous: Token::eof(),
            current: Token::eof(),
            next: Token::eof(),
            had_error: false,
            panic: false,
            diagnostics: Vec::new(),
        };
        parser.advance();
        parser.advance();
        parser
    }

    pub fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, Token::eof());
        self.current = std::mem::replace(&mut self.next, Token::eof());
        loop {
            self.next = self.scanner.scan();
            if self.next.kind != TokenKind::Error {
                break;
            }
            let token = self.next.clone();
            let message = token.literal.to_string();
            self.error_at(&token, &message);
        }
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    pub fn match_kind(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    pub fn consume(&mut self, kind: TokenKind) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(&format!("'{}' expected", kind));
    }

    /// Require a statement terminator: newline, `;`, or end of input.
    pub fn consume_semicolon(&mut self) {
        if !self.match_kind(TokenKind::NewLine) && !self.check(TokenKind::Eof) {
            self.consume(TokenKind::Semicolon);
        }
    }

    /// Consume a terminator if one is present.
    pub fn match_semicolon(&mut self) -> bool {
        self.match_kind(TokenKind::NewLine) || self.match_kind(TokenKind::Semicolon)
    }

    /// Consume a terminator if present; never reports.
    pub fn consume_end(&mut self) {
        let _ = self.match_kind(TokenKind::NewLine) || self.match_kind(TokenKind::Semicolon);
    }

    /// Skip a synthesized newline, e.g. between a `)` and a loop body.
    pub fn ignore_newline(&mut self) {
        self.match_kind(TokenKind::NewLine);
    }

    /// Decide whether a just-consumed `(` opens a lambda parameter list.
    ///
    /// Scans ahead over a cloned scanner for the matching `)`; a directly
    /// following `=>` or `{` makes it a lambda. No token is consumed.
    pub fn lambda_ahead(&self) -> bool {
        let mut depth = 1usize;
        let mut scanner = self.scanner.clone();
        let mut token = self.current.kind;
        let mut following = self.next.kind;
        loop {
            match token {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            following,
                            TokenKind::EqualRightAngle | TokenKind::LeftBrace
                        );
                    }
                }
                TokenKind::Eof | TokenKind::Error => return false,
                _ => {}
            }
            token = following;
            following = scanner.scan().kind;
        }
    }

    pub fn error_at_current(&mut self, message: &str) {
        let token = self.current.clone();
        self.error_at(&token, message);
    }

    pub fn error_at_previous(&mut self, message: &str) {
        let token = self.previous.clone();
        self.error_at(&token, message);
    }

    fn error_at(&mut self, token: &Token<'src>, message: &str) {
        if self.panic {
            return;
        }
        self.panic = true;
        self.had_error = true;
        let at = match token.kind {
            TokenKind::Eof => At::End,
            TokenKind::Error => At::Nowhere,
            _ => At::Literal(token.literal.to_string()),
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            message: message.to_string(),
            at,
        });
    }

    /// Leave panic mode and skip ahead to a plausible statement boundary.
    pub fn synchronize(&mut self) {
        self.panic = false;

        while self.current.kind != TokenKind::Eof {
            if matches!(
                self.previous.kind,
                TokenKind::Semicolon | TokenKind::NewLine
            ) {
                return;
            }

            if matches!(
                self.current.kind,
                TokenKind::Var
                    | TokenKind::Func
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Do
                    | TokenKind::For
                    | TokenKind::Foreach
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Return
            ) {
                return;
            }

            self.advance();
        }
    }
}
