//! Integer and string constant folding.
//!
//! Used for enumerator initializers, array sizes, `#if` conditions and
//! macro-derived constants. Object-like macros are expanded from their raw
//! text; function-like macros never fold. Anything that cannot be evaluated
//! yields `None` and the dependent value stays absent.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::lexer::Lexer;
use super::macros::MacroTable;
use super::token::{Keyword, Punct, TokenKind};

const MAX_EXPANSION_DEPTH: usize = 32;

/// Where an expression is being folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMode {
    /// Ordinary C expression: unknown identifiers do not fold.
    Expression,
    /// `#if` / `#elif`: `defined` is available and unknown identifiers are 0.
    Directive,
}

/// Names visible while folding.
#[derive(Debug, Clone, Copy)]
pub struct FoldEnv<'a> {
    pub macros: &'a MacroTable,
    pub constants: &'a HashMap<String, i64>,
    pub typedefs: &'a HashSet<String>,
    /// File and line of the directive being evaluated, for `defined`.
    pub position: Option<(&'a Path, u32)>,
}

impl<'a> FoldEnv<'a> {
    /// Evaluate `defined` as seen from `line` of `file`.
    pub fn at(self, file: &'a Path, line: u32) -> Self {
        FoldEnv {
            position: Some((file, line)),
            ..self
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        match self.position {
            Some((file, line)) => self.macros.is_defined_at(name, file, line),
            None => self.macros.is_defined(name),
        }
    }
}

/// Fold `tokens` to an integer.
pub fn fold_int(tokens: &[TokenKind], env: &FoldEnv<'_>, mode: FoldMode) -> Option<i64> {
    let expanded = expand(tokens, env, mode, &mut Vec::new(), 0)?;
    let mut parser = ExprParser {
        tokens: &expanded,
        pos: 0,
        env,
        mode,
    };
    let value = parser.conditional().ok()?;
    if parser.pos != expanded.len() {
        return None;
    }
    value
}

/// Fold raw text (a macro body or `#if` condition) to an integer.
pub fn fold_int_text(text: &str, env: &FoldEnv<'_>, mode: FoldMode) -> Option<i64> {
    let tokens = lex_fragment(text)?;
    if tokens.is_empty() {
        return None;
    }
    fold_int(&tokens, env, mode)
}

/// Fold `tokens` to a string by concatenating adjacent literals.
pub fn fold_string(tokens: &[TokenKind], env: &FoldEnv<'_>) -> Option<String> {
    let expanded = expand(tokens, env, FoldMode::Expression, &mut Vec::new(), 0)?;
    let mut inner: &[TokenKind] = &expanded;
    while let (Some(TokenKind::Punct(Punct::LParen)), Some(TokenKind::Punct(Punct::RParen))) =
        (inner.first(), inner.last())
    {
        inner = &inner[1..inner.len() - 1];
    }
    if inner.is_empty() {
        return None;
    }

    let mut value = String::new();
    for token in inner {
        match token {
            TokenKind::Str(s) => value.push_str(s),
            _ => return None,
        }
    }
    Some(value)
}

/// Fold raw text to a string.
pub fn fold_string_text(text: &str, env: &FoldEnv<'_>) -> Option<String> {
    let tokens = lex_fragment(text)?;
    fold_string(&tokens, env)
}

fn lex_fragment(text: &str) -> Option<Vec<TokenKind>> {
    let mut tokens = Vec::new();
    for token in Lexer::new(text, "<macro>", false) {
        match token.ok()?.kind {
            TokenKind::DocComment(_) => {}
            TokenKind::Preprocessor(_) => return None,
            kind => tokens.push(kind),
        }
    }
    Some(tokens)
}

/// Replace object-like macro names with their expansions.
fn expand(
    tokens: &[TokenKind],
    env: &FoldEnv<'_>,
    mode: FoldMode,
    hidden: &mut Vec<String>,
    depth: usize,
) -> Option<Vec<TokenKind>> {
    if depth > MAX_EXPANSION_DEPTH {
        return None;
    }

    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;

        let TokenKind::Ident(name) = token else {
            out.push(token.clone());
            continue;
        };

        // The operand of `defined` must not be expanded.
        if mode == FoldMode::Directive && name == "defined" {
            out.push(token.clone());
            let operand_len = match tokens.get(i) {
                Some(TokenKind::Punct(Punct::LParen)) => 3,
                Some(_) => 1,
                None => 0,
            };
            let end = (i + operand_len).min(tokens.len());
            out.extend_from_slice(&tokens[i..end]);
            i = end;
            continue;
        }

        let Some(def) = env.macros.get(name) else {
            out.push(token.clone());
            continue;
        };
        if hidden.iter().any(|h| h == name) {
            out.push(token.clone());
            continue;
        }
        if def.is_function_like() {
            return None;
        }

        let body = lex_fragment(&def.value)?;
        hidden.push(name.clone());
        let replacement = expand(&body, env, mode, hidden, depth + 1);
        hidden.pop();
        out.extend(replacement?);
    }

    Some(out)
}

/// Syntax failure; distinct from a value that is merely unknown.
struct Unparseable;

type Folded = Result<Option<i64>, Unparseable>;

struct ExprParser<'t, 'e> {
    tokens: &'t [TokenKind],
    pos: usize,
    env: &'e FoldEnv<'e>,
    mode: FoldMode,
}

fn bool_value(b: bool) -> i64 {
    i64::from(b)
}

impl<'t> ExprParser<'t, '_> {
    fn peek(&self) -> Option<&'t TokenKind> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<Punct> {
        match self.peek() {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.peek_punct() == Some(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: Punct) -> Result<(), Unparseable> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(Unparseable)
        }
    }

    fn conditional(&mut self) -> Folded {
        let cond = self.binary(0)?;
        if !self.eat(Punct::Question) {
            return Ok(cond);
        }
        let then = self.conditional()?;
        self.expect(Punct::Colon)?;
        let otherwise = self.conditional()?;
        Ok(cond.and_then(|c| if c != 0 { then } else { otherwise }))
    }

    /// Precedence climbing over the binary operators.
    fn binary(&mut self, min_prec: u8) -> Folded {
        let mut lhs = self.unary()?;

        while let Some(op) = self.peek_punct() {
            let Some(prec) = precedence(op) else { break };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;

            lhs = match op {
                Punct::AndAnd => match (lhs, rhs) {
                    (Some(0), _) | (_, Some(0)) => Some(0),
                    (Some(_), Some(_)) => Some(1),
                    _ => None,
                },
                Punct::OrOr => match (lhs, rhs) {
                    (Some(a), _) if a != 0 => Some(1),
                    (_, Some(b)) if b != 0 => Some(1),
                    (Some(_), Some(_)) => Some(0),
                    _ => None,
                },
                _ => match (lhs, rhs) {
                    (Some(a), Some(b)) => apply_binary(op, a, b),
                    _ => None,
                },
            };
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Folded {
        match self.peek_punct() {
            Some(Punct::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Punct::Minus) => {
                self.pos += 1;
                Ok(self.unary()?.and_then(i64::checked_neg))
            }
            Some(Punct::Tilde) => {
                self.pos += 1;
                Ok(self.unary()?.map(|v| !v))
            }
            Some(Punct::Bang) => {
                self.pos += 1;
                Ok(self.unary()?.map(|v| bool_value(v == 0)))
            }
            Some(Punct::LParen) if self.is_cast() => {
                self.skip_cast()?;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    /// Whether the parenthesis at the cursor opens a cast to a scalar type.
    fn is_cast(&self) -> bool {
        let mut i = self.pos + 1;
        let mut saw_type = false;
        while let Some(token) = self.tokens.get(i) {
            match token {
                TokenKind::Keyword(k) if is_cast_keyword(*k) => saw_type = true,
                TokenKind::Ident(name) if self.env.typedefs.contains(name) => saw_type = true,
                TokenKind::Punct(Punct::Star) if saw_type => {}
                TokenKind::Punct(Punct::RParen) => return saw_type,
                _ => return false,
            }
            i += 1;
        }
        false
    }

    fn skip_cast(&mut self) -> Result<(), Unparseable> {
        while let Some(token) = self.peek() {
            self.pos += 1;
            if matches!(token, TokenKind::Punct(Punct::RParen)) {
                return Ok(());
            }
        }
        Err(Unparseable)
    }

    fn primary(&mut self) -> Folded {
        let Some(token) = self.peek().cloned() else {
            return Err(Unparseable);
        };
        self.pos += 1;

        match token {
            // literals past i64::MAX do not fold
            TokenKind::Int { value, .. } => Ok(i64::try_from(value).ok()),
            TokenKind::Char(c) => Ok(Some(c)),
            TokenKind::Punct(Punct::LParen) => {
                let value = self.conditional()?;
                self.expect(Punct::RParen)?;
                Ok(value)
            }
            TokenKind::Ident(name) if self.mode == FoldMode::Directive && name == "defined" => {
                let parenthesized = self.eat(Punct::LParen);
                let operand = match self.peek() {
                    Some(TokenKind::Ident(n)) => n.clone(),
                    Some(TokenKind::Keyword(k)) => k.as_str().to_string(),
                    _ => return Err(Unparseable),
                };
                self.pos += 1;
                if parenthesized {
                    self.expect(Punct::RParen)?;
                }
                Ok(Some(bool_value(self.env.is_defined(&operand))))
            }
            TokenKind::Ident(name) => {
                if let Some(value) = self.env.constants.get(&name) {
                    return Ok(Some(*value));
                }
                if self.peek_punct() == Some(Punct::LParen) {
                    // unexpanded call: consume it so the rest still parses
                    self.skip_group()?;
                    return Ok(None);
                }
                match self.mode {
                    FoldMode::Directive => Ok(Some(0)),
                    FoldMode::Expression => Ok(None),
                }
            }
            TokenKind::Keyword(Keyword::Sizeof) => {
                if self.peek_punct() == Some(Punct::LParen) {
                    self.skip_group()?;
                } else {
                    self.unary()?;
                }
                Ok(None)
            }
            TokenKind::Float(_) | TokenKind::Str(_) => Ok(None),
            _ => Err(Unparseable),
        }
    }

    fn skip_group(&mut self) -> Result<(), Unparseable> {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            self.pos += 1;
            match token {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(Unparseable)
    }
}

fn is_cast_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Char
            | Keyword::Short
            | Keyword::Int
            | Keyword::Long
            | Keyword::Signed
            | Keyword::Unsigned
            | Keyword::Bool
            | Keyword::Const
            | Keyword::Volatile
            | Keyword::Void
    )
}

fn precedence(op: Punct) -> Option<u8> {
    let prec = match op {
        Punct::OrOr => 1,
        Punct::AndAnd => 2,
        Punct::Pipe => 3,
        Punct::Caret => 4,
        Punct::Amp => 5,
        Punct::EqEq | Punct::NotEq => 6,
        Punct::Lt | Punct::Le | Punct::Gt | Punct::Ge => 7,
        Punct::Shl | Punct::Shr => 8,
        Punct::Plus | Punct::Minus => 9,
        Punct::Star | Punct::Slash | Punct::Percent => 10,
        _ => return None,
    };
    Some(prec)
}

fn apply_binary(op: Punct, a: i64, b: i64) -> Option<i64> {
    match op {
        Punct::Star => a.checked_mul(b),
        Punct::Slash => a.checked_div(b),
        Punct::Percent => a.checked_rem(b),
        Punct::Plus => a.checked_add(b),
        Punct::Minus => a.checked_sub(b),
        Punct::Shl => a.checked_shl(u32::try_from(b).ok()?),
        Punct::Shr => a.checked_shr(u32::try_from(b).ok()?),
        Punct::Lt => Some(bool_value(a < b)),
        Punct::Le => Some(bool_value(a <= b)),
        Punct::Gt => Some(bool_value(a > b)),
        Punct::Ge => Some(bool_value(a >= b)),
        Punct::EqEq => Some(bool_value(a == b)),
        Punct::NotEq => Some(bool_value(a != b)),
        Punct::Amp => Some(a & b),
        Punct::Caret => Some(a ^ b),
        Punct::Pipe => Some(a | b),
        _ => None,
    }
}
