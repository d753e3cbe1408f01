//! Recursive-descent parser for C declarations.
//!
//! The parser pulls tokens from a [`Lexer`] through a small token layer that
//! evaluates conditional compilation, records macros, collects doc comments
//! and drops GNU decorations. The grammar above it covers external
//! declarations: prototypes, variables, typedefs and struct/union/enum
//! definitions. Function bodies and initializers are skipped.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::const_eval::{fold_int, fold_int_text, fold_string_text, FoldMode};
use super::directive::{parse_doc_comment, DocBlock, Directive};
use super::errors::{ParseError, ScanError};
use super::lexer::Lexer;
use super::macros::MacroDef;
use super::session::ScanState;
use super::token::{Keyword, PpLine, Punct, Token, TokenKind};
use super::types::{
    FunctionSpecifier, StorageClass, Symbol, SymbolKind, TagKind, Type, TypeId, TypeKind,
    TypeQualifiers,
};

type PResult<T> = Result<T, ScanError>;

/// Per-call parse settings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseOptions<'a> {
    /// Name the lex/parse call started with
    pub origin: &'a Path,
    /// Session filenames, for symbol retention
    pub filenames: &'a [PathBuf],
    pub macro_scan: bool,
    /// Turn object-like macros into `Const` symbols (macro-scan mode only)
    pub emit_consts: bool,
}

/// Everything one successful parse contributes to the session.
#[derive(Debug, Default)]
pub(crate) struct ParseOutput {
    pub symbols: Vec<Symbol>,
    /// (symbol identifier, directives) in attachment order
    pub registrations: Vec<(Option<String>, Vec<Directive>)>,
}

/// A significant token with its stream position and source file.
#[derive(Debug)]
struct Lexed {
    seq: u64,
    file: usize,
    token: Token,
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    parent_active: bool,
    active: bool,
    /// Some branch of this `#if` chain was (or could have been) taken
    taken: bool,
}

#[derive(Debug)]
struct PendingDoc {
    /// Sequence number of the token following the comment
    seq: u64,
    file: usize,
    block: DocBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclContext {
    TopLevel,
    Member,
    Param,
}

#[derive(Debug, Clone)]
enum SpecBase {
    /// Template copied into a new node for every declarator
    Fresh(Type),
    /// Shared struct/union/enum node
    Tag(TypeId),
}

#[derive(Debug, Clone, Copy)]
struct TagBody {
    kind: TagKind,
    anonymous: bool,
    id: TypeId,
}

#[derive(Debug)]
struct Specifiers {
    base: Option<SpecBase>,
    storage: StorageClass,
    quals: TypeQualifiers,
    funcspec: FunctionSpecifier,
    tag_body: Option<TagBody>,
    file: usize,
    line: u32,
}

#[derive(Debug, Clone)]
enum DeclOp {
    Pointer(TypeQualifiers),
    Array(Option<i64>),
    Function { params: Vec<Symbol>, variadic: bool },
}

#[derive(Debug, Default)]
struct Declarator {
    name: Option<String>,
    position: Option<(usize, u32)>,
    /// Applied to the base type in order
    ops: Vec<DeclOp>,
}

/// What `skip_macro_invocation` found at file scope.
enum Invocation {
    None,
    /// `NAME(...);`
    Statement,
    /// `NAME(...)` in front of a declaration
    Prefix,
}

pub(crate) struct Parser<'s, 'o> {
    lexer: Lexer,
    state: &'s mut ScanState,
    opts: ParseOptions<'o>,
    lookahead: VecDeque<Lexed>,
    files: Vec<PathBuf>,
    current_file: usize,
    next_seq: u64,
    last_seq: u64,
    conditions: Vec<CondFrame>,
    unnamed_docs: Vec<PendingDoc>,
    named_docs: Vec<PendingDoc>,
    decl_docs: Option<Vec<Directive>>,
    extern_c_depth: usize,
    output: ParseOutput,
}

impl<'s, 'o> Parser<'s, 'o> {
    pub(crate) fn new(source: &str, state: &'s mut ScanState, opts: ParseOptions<'o>) -> Self {
        Parser {
            lexer: Lexer::new(source, opts.origin, opts.macro_scan),
            state,
            opts,
            lookahead: VecDeque::new(),
            files: vec![opts.origin.to_path_buf()],
            current_file: 0,
            next_seq: 1,
            last_seq: 0,
            conditions: Vec::new(),
            unnamed_docs: Vec::new(),
            named_docs: Vec::new(),
            decl_docs: None,
            extern_c_depth: 0,
            output: ParseOutput::default(),
        }
    }

    /// Parse the whole input.
    pub(crate) fn run(mut self) -> PResult<ParseOutput> {
        while self.peek(0)?.is_some() {
            self.external_declaration()?;
        }
        if !self.conditions.is_empty() {
            debug!(
                "{}: {} unterminated conditional(s) at end of input",
                self.opts.origin.display(),
                self.conditions.len()
            );
        }
        Ok(self.output)
    }

    // ------------------------------------------------------------------
    // Token layer
    // ------------------------------------------------------------------

    fn active(&self) -> bool {
        self.conditions.last().map_or(true, |frame| frame.active)
    }

    fn sync_file(&mut self) {
        if self.lexer.file() == self.files[self.current_file].as_path() {
            return;
        }
        let file = self.lexer.file();
        self.current_file = match self.files.iter().position(|f| f == file) {
            Some(index) => index,
            None => {
                self.files.push(file.to_path_buf());
                self.files.len() - 1
            }
        };
    }

    /// Next significant token from the lexer, after preprocessing and decoration removal.
    fn pull(&mut self) -> PResult<Option<Lexed>> {
        loop {
            let token = match self.lexer.next() {
                None => return Ok(None),
                Some(Err(source)) => {
                    return Err(ScanError::Lex {
                        file: self.opts.origin.to_path_buf(),
                        source,
                    })
                }
                Some(Ok(token)) => token,
            };
            self.sync_file();

            let Token { kind, pos } = token;
            let kind = match kind {
                TokenKind::Preprocessor(pp) => {
                    self.directive(pp, pos.line);
                    continue;
                }
                _ if !self.active() => continue,
                TokenKind::DocComment(text) => {
                    self.doc_comment(&text);
                    continue;
                }
                kind => kind,
            };

            match &kind {
                TokenKind::Keyword(Keyword::Extension) => continue,
                TokenKind::Keyword(
                    Keyword::Attribute | Keyword::Asm | Keyword::Declspec | Keyword::StaticAssert,
                ) => {
                    trace!("skipping {}", kind);
                    match self.pull()? {
                        Some(next) if next.token.is_punct(Punct::LParen) => {
                            self.skip_raw_group()?;
                            continue;
                        }
                        other => return Ok(other),
                    }
                }
                TokenKind::Ident(name) if self.is_decoration(name) => continue,
                _ => {}
            }

            let seq = self.next_seq;
            self.next_seq += 1;
            return Ok(Some(Lexed {
                seq,
                file: self.current_file,
                token: Token::new(kind, pos),
            }));
        }
    }

    /// Drop raw tokens up to the `)` closing an already consumed `(`.
    fn skip_raw_group(&mut self) -> PResult<()> {
        let mut depth = 1usize;
        while let Some(lexed) = self.pull()? {
            if lexed.token.is_punct(Punct::LParen) {
                depth += 1;
            } else if lexed.token.is_punct(Punct::RParen) {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        // lookahead tokens precede the group, so report the end of input itself
        Err(ScanError::Parse {
            file: self.opts.origin.to_path_buf(),
            source: ParseError::new(
                self.lexer.file().to_path_buf(),
                self.lexer.line(),
                "`)`",
                "end of input",
            ),
        })
    }

    fn is_decoration(&self, name: &str) -> bool {
        self.state
            .macros
            .get(name)
            .is_some_and(|def| !def.is_function_like() && def.is_empty())
    }

    fn directive(&mut self, pp: PpLine, line: u32) {
        match pp {
            PpLine::Ifdef(name) => {
                let cond = self.is_defined_here(&name, line);
                self.push_condition(cond);
            }
            PpLine::Ifndef(name) => {
                let cond = !self.is_defined_here(&name, line);
                self.push_condition(cond);
            }
            PpLine::If(expr) => {
                let cond = self.active() && self.eval_condition(&expr, line);
                self.push_condition(cond);
            }
            PpLine::Elif(expr) => {
                let Some(frame) = self.conditions.last().copied() else {
                    trace!("#elif without #if at line {}", line);
                    return;
                };
                let cond =
                    !frame.taken && frame.parent_active && self.eval_condition(&expr, line);
                if let Some(frame) = self.conditions.last_mut() {
                    frame.active = cond;
                    frame.taken |= cond;
                }
            }
            PpLine::Else => match self.conditions.last_mut() {
                Some(frame) => {
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
                None => trace!("#else without #if at line {}", line),
            },
            PpLine::Endif => {
                if self.conditions.pop().is_none() {
                    trace!("#endif without #if at line {}", line);
                }
            }
            _ if !self.active() => {}
            PpLine::Define { name, params, body } => self.define(name, params, body, line),
            PpLine::Undef(name) => {
                let file = self.files[self.current_file].clone();
                self.state.undef_macro(&name, &file);
            }
            PpLine::Line { .. } => {}
            PpLine::Pragma(text) => trace!("ignoring #pragma {}", text),
            PpLine::Other(text) => trace!("ignoring #{}", text),
        }
    }

    fn push_condition(&mut self, cond: bool) {
        let parent_active = self.active();
        self.conditions.push(CondFrame {
            parent_active,
            active: parent_active && cond,
            taken: !parent_active || cond,
        });
    }

    /// Definitions recorded earlier from later lines of this file (by
    /// `parse_macros`) are not visible yet, so include guards still open.
    fn is_defined_here(&self, name: &str, line: u32) -> bool {
        let file = &self.files[self.current_file];
        self.state.macros.is_defined_at(name, file, line)
    }

    /// `#if` conditions that cannot be folded count as true.
    fn eval_condition(&self, expr: &str, line: u32) -> bool {
        let file = &self.files[self.current_file];
        let env = self.state.fold_env().at(file, line);
        match fold_int_text(expr, &env, FoldMode::Directive) {
            Some(value) => value != 0,
            None => {
                trace!("cannot evaluate #if {}, assuming true", expr);
                true
            }
        }
    }

    fn define(&mut self, name: String, params: Option<Vec<String>>, body: String, line: u32) {
        let file = self.files[self.current_file].clone();
        let def = MacroDef {
            name: name.clone(),
            params,
            value: body,
            file: file.clone(),
            line,
        };
        let wants_const = self.opts.macro_scan
            && self.opts.emit_consts
            && !def.is_function_like()
            && !def.is_empty();
        self.state.define_macro(def);

        if wants_const {
            self.macro_constant(name, file, line);
        }
    }

    fn macro_constant(&mut self, name: String, file: PathBuf, line: u32) {
        let (int, string) = {
            let env = self.state.fold_env();
            match fold_int_text(&name, &env, FoldMode::Expression) {
                Some(value) => (Some(value), None),
                None => (None, fold_string_text(&name, &env)),
            }
        };

        let ty = if int.is_some() {
            self.state.arena.alloc(Type::named(TypeKind::Base, "int"))
        } else if string.is_some() {
            let mut ch = Type::named(TypeKind::Base, "char");
            ch.qualifiers = TypeQualifiers::CONST;
            let ch = self.state.arena.alloc(ch);
            self.state.arena.alloc(Type::derived(TypeKind::Pointer, ch))
        } else {
            trace!("macro {} is not a constant", name);
            return;
        };

        let mut symbol = Symbol::new(SymbolKind::Const, Some(name), ty, file, line);
        symbol.const_int = int;
        symbol.const_string = string;
        self.emit(symbol);
    }

    fn doc_comment(&mut self, text: &str) {
        let block = parse_doc_comment(text);
        if block.directives.is_empty() {
            return;
        }
        let doc = PendingDoc {
            seq: self.next_seq,
            file: self.current_file,
            block,
        };
        if doc.block.symbol.is_some() {
            self.named_docs.push(doc);
        } else {
            self.unnamed_docs.push(doc);
        }
    }

    fn fill(&mut self, n: usize) -> PResult<()> {
        while self.lookahead.len() <= n {
            match self.pull()? {
                Some(lexed) => self.lookahead.push_back(lexed),
                None => break,
            }
        }
        Ok(())
    }

    fn peek(&mut self, n: usize) -> PResult<Option<&Token>> {
        self.fill(n)?;
        Ok(self.lookahead.get(n).map(|lexed| &lexed.token))
    }

    fn peek_punct(&mut self, n: usize, punct: Punct) -> PResult<bool> {
        Ok(self.peek(n)?.is_some_and(|t| t.is_punct(punct)))
    }

    fn peek_keyword(&mut self, n: usize) -> PResult<Option<Keyword>> {
        Ok(match self.peek(n)? {
            Some(Token {
                kind: TokenKind::Keyword(k),
                ..
            }) => Some(*k),
            _ => None,
        })
    }

    fn peek_ident(&mut self, n: usize) -> PResult<Option<String>> {
        Ok(self.peek(n)?.and_then(Token::ident).map(str::to_string))
    }

    fn next(&mut self) -> PResult<Option<Lexed>> {
        self.fill(0)?;
        let lexed = self.lookahead.pop_front();
        if let Some(lexed) = &lexed {
            self.last_seq = lexed.seq;
        }
        Ok(lexed)
    }

    fn bump(&mut self, expected: &str) -> PResult<Lexed> {
        match self.next()? {
            Some(lexed) => Ok(lexed),
            None => Err(self.error_here(expected)),
        }
    }

    fn eat_punct(&mut self, punct: Punct) -> PResult<bool> {
        if self.peek_punct(0, punct)? {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> PResult<Lexed> {
        if self.peek_punct(0, punct)? {
            self.bump(punct.as_str())
        } else {
            Err(self.error_here(&format!("`{}`", punct.as_str())))
        }
    }

    /// Error describing the token at the cursor.
    fn error_here(&mut self, expected: &str) -> ScanError {
        if let Err(e) = self.fill(0) {
            return e;
        }
        let (file, line, found) = match self.lookahead.front() {
            Some(lexed) => (
                self.files[lexed.file].clone(),
                lexed.token.pos.line,
                lexed.token.kind.to_string(),
            ),
            None => (
                self.lexer.file().to_path_buf(),
                self.lexer.line(),
                "end of input".to_string(),
            ),
        };
        ScanError::Parse {
            file: self.opts.origin.to_path_buf(),
            source: ParseError::new(file, line, expected, found),
        }
    }

    fn position(&mut self) -> PResult<(usize, u32)> {
        self.fill(0)?;
        Ok(match self.lookahead.front() {
            Some(lexed) => (lexed.file, lexed.token.pos.line),
            None => (self.current_file, self.lexer.line()),
        })
    }

    /// Consume a balanced group starting at the cursor.
    fn skip_balanced(&mut self, open: Punct, close: Punct) -> PResult<()> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let lexed = self.bump(&format!("`{}`", close.as_str()))?;
            if lexed.token.is_punct(open) {
                depth += 1;
            } else if lexed.token.is_punct(close) {
                depth -= 1;
            }
        }
        Ok(())
    }

    /// Collect an expression up to a `,`, `;`, `}` or unbalanced closer.
    fn collect_expression(&mut self) -> PResult<Vec<TokenKind>> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let Some(token) = self.peek(0)? else {
                break;
            };
            match &token.kind {
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenKind::Punct(Punct::Comma | Punct::Semicolon) if depth == 0 => break,
                _ => {}
            }
            if let Some(lexed) = self.next()? {
                tokens.push(lexed.token.kind);
            }
        }
        Ok(tokens)
    }

    fn fold(&self, tokens: &[TokenKind]) -> Option<i64> {
        if tokens.is_empty() {
            return None;
        }
        fold_int(tokens, &self.state.fold_env(), FoldMode::Expression)
    }

    // ------------------------------------------------------------------
    // Symbols and directive attachment
    // ------------------------------------------------------------------

    fn retained(&self, file: &Path) -> bool {
        self.opts.filenames.is_empty()
            || file == self.opts.origin
            || self.opts.filenames.iter().any(|f| f == file)
    }

    fn emit(&mut self, mut symbol: Symbol) {
        let mut directives = self.decl_docs.take().unwrap_or_default();

        if !self.retained(&symbol.file) {
            trace!(
                "dropping {} from {}",
                symbol.ident.as_deref().unwrap_or("<anonymous>"),
                symbol.file.display()
            );
            return;
        }

        if let Some(ident) = &symbol.ident {
            let file = &symbol.file;
            let found = self.named_docs.iter().position(|doc| {
                doc.block.symbol.as_deref() == Some(ident.as_str()) && self.files[doc.file] == *file
            });
            if let Some(index) = found {
                directives.extend(self.named_docs.remove(index).block.directives);
            }
        }

        if !directives.is_empty() {
            self.output
                .registrations
                .push((symbol.ident.clone(), directives.clone()));
            symbol.raw_directives = directives;
        }
        self.output.symbols.push(symbol);
    }

    /// Hand unnamed doc comments before the next token to the coming declaration.
    fn claim_docs(&mut self) -> PResult<()> {
        self.fill(0)?;
        let Some(start) = self.lookahead.front().map(|l| l.seq) else {
            return Ok(());
        };
        let mut claimed = Vec::new();
        let mut i = 0;
        while i < self.unnamed_docs.len() {
            if self.unnamed_docs[i].seq <= start {
                claimed.extend(self.unnamed_docs.remove(i).block.directives);
            } else {
                i += 1;
            }
        }
        self.decl_docs = (!claimed.is_empty()).then_some(claimed);
        Ok(())
    }

    fn finish_declaration(&mut self) {
        let last = self.last_seq;
        self.unnamed_docs.retain(|doc| doc.seq > last);
        self.decl_docs = None;
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    fn external_declaration(&mut self) -> PResult<()> {
        if self.eat_punct(Punct::Semicolon)? {
            self.finish_declaration();
            return Ok(());
        }

        if self.extern_c_depth > 0 && self.peek_punct(0, Punct::RBrace)? {
            self.next()?;
            self.extern_c_depth -= 1;
            return Ok(());
        }

        if self.peek_keyword(0)? == Some(Keyword::Extern)
            && matches!(self.peek(1)?, Some(Token { kind: TokenKind::Str(lang), .. }) if lang == "C")
        {
            self.next()?;
            self.next()?;
            if self.eat_punct(Punct::LBrace)? {
                self.extern_c_depth += 1;
            }
            return Ok(());
        }

        match self.skip_macro_invocation()? {
            Invocation::None => {}
            Invocation::Statement => {
                self.finish_declaration();
                return Ok(());
            }
            // pending docs belong to the declaration after a decorator macro
            Invocation::Prefix => return Ok(()),
        }

        self.claim_docs()?;
        let specs = self.specifiers(DeclContext::TopLevel)?;

        if self.eat_punct(Punct::Semicolon)? {
            if let Some(body) = specs.tag_body {
                if body.kind == TagKind::Enum && body.anonymous {
                    let file = self.files[specs.file].clone();
                    self.emit(Symbol::new(SymbolKind::Enum, None, body.id, file, specs.line));
                }
            }
            self.finish_declaration();
            return Ok(());
        }

        loop {
            let decl = self.declarator(DeclContext::TopLevel)?;
            if decl.name.is_none() && decl.ops.is_empty() {
                return Err(self.error_here("declarator"));
            }
            self.skip_trailing_decorations()?;

            let (file, line) = decl.position.unwrap_or((specs.file, specs.line));
            let file = self.files[file].clone();
            let is_typedef = specs.storage.contains(StorageClass::TYPEDEF);
            let direct = decl.ops.is_empty();
            let name = decl.name.clone();
            let ty = self.declared_type(&specs, decl.ops);
            let is_function = self.state.arena.get(ty).kind == TypeKind::Function;

            let kind = if is_typedef {
                SymbolKind::Typedef
            } else if is_function {
                SymbolKind::Function
            } else {
                SymbolKind::Variable
            };

            if is_typedef {
                if let Some(name) = &name {
                    self.state.add_typedef(name);
                    if direct {
                        self.name_anonymous_tag(&specs, name);
                    }
                }
            }

            let symbol = Symbol::new(kind, name, ty, file, line);

            if kind == SymbolKind::Function && self.peek_punct(0, Punct::LBrace)? {
                self.emit(symbol);
                self.skip_balanced(Punct::LBrace, Punct::RBrace)?;
                break;
            }

            if self.eat_punct(Punct::Assign)? {
                self.collect_expression()?;
            }
            self.emit(symbol);

            if self.eat_punct(Punct::Comma)? {
                continue;
            }
            self.expect_punct(Punct::Semicolon)?;
            break;
        }

        self.finish_declaration();
        Ok(())
    }

    /// Skip `NAME(...)` at file scope when it is a macro call rather than a declaration.
    fn skip_macro_invocation(&mut self) -> PResult<Invocation> {
        let Some(name) = self.peek_ident(0)? else {
            return Ok(Invocation::None);
        };
        if self.state.typedefs.contains(&name) || !self.peek_punct(1, Punct::LParen)? {
            return Ok(Invocation::None);
        }
        let known_macro = self
            .state
            .macros
            .get(&name)
            .is_some_and(MacroDef::is_function_like);

        let mut depth = 0usize;
        let mut close = 1;
        loop {
            match self.peek(close)? {
                None => return Ok(Invocation::None),
                Some(t) if t.is_punct(Punct::LParen) => depth += 1,
                Some(t) if t.is_punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            close += 1;
        }

        let declaration_follows = matches!(
            self.peek(close + 1)?,
            Some(Token {
                kind: TokenKind::Punct(
                    Punct::Semicolon | Punct::LBrace | Punct::Comma | Punct::Assign
                ),
                ..
            })
        );
        if !known_macro && declaration_follows {
            return Ok(Invocation::None);
        }

        for _ in 0..=close {
            self.next()?;
        }
        trace!("skipped macro invocation {}", name);
        if known_macro && self.eat_punct(Punct::Semicolon)? {
            return Ok(Invocation::Statement);
        }
        Ok(Invocation::Prefix)
    }

    fn is_specifier_keyword(keyword: Keyword) -> bool {
        matches!(
            keyword,
            Keyword::Typedef
                | Keyword::Extern
                | Keyword::Static
                | Keyword::Auto
                | Keyword::Register
                | Keyword::ThreadLocal
                | Keyword::Const
                | Keyword::Volatile
                | Keyword::Restrict
                | Keyword::Inline
                | Keyword::Noreturn
                | Keyword::Void
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
                | Keyword::Signed
                | Keyword::Unsigned
                | Keyword::Bool
                | Keyword::Complex
                | Keyword::Struct
                | Keyword::Union
                | Keyword::Enum
        )
    }

    fn is_qualifier(keyword: Keyword) -> bool {
        matches!(
            keyword,
            Keyword::Const | Keyword::Volatile | Keyword::Restrict
        )
    }

    /// Whether the token at `n` suggests the identifier before it is a type name.
    fn declarator_follows(&mut self, n: usize) -> PResult<bool> {
        let (ident, star, paren, qualifier) = match self.peek(n)? {
            Some(t) => (
                t.ident().is_some(),
                t.is_punct(Punct::Star),
                t.is_punct(Punct::LParen),
                matches!(t.kind, TokenKind::Keyword(k) if Self::is_qualifier(k)),
            ),
            None => return Ok(false),
        };
        Ok(ident || star || qualifier || (paren && self.peek_punct(n + 1, Punct::Star)?))
    }

    fn specifiers(&mut self, ctx: DeclContext) -> PResult<Specifiers> {
        let (file, line) = self.position()?;
        let mut specs = Specifiers {
            base: None,
            storage: StorageClass::empty(),
            quals: TypeQualifiers::empty(),
            funcspec: FunctionSpecifier::empty(),
            tag_body: None,
            file,
            line,
        };
        let mut words: Vec<Keyword> = Vec::new();
        let mut guessed = false;

        loop {
            if let Some(keyword) = self.peek_keyword(0)? {
                match keyword {
                    Keyword::Typedef => specs.storage |= StorageClass::TYPEDEF,
                    Keyword::Extern => specs.storage |= StorageClass::EXTERN,
                    Keyword::Static => specs.storage |= StorageClass::STATIC,
                    Keyword::Auto => specs.storage |= StorageClass::AUTO,
                    Keyword::Register => specs.storage |= StorageClass::REGISTER,
                    Keyword::ThreadLocal => specs.storage |= StorageClass::THREAD_LOCAL,
                    Keyword::Const => specs.quals |= TypeQualifiers::CONST,
                    Keyword::Volatile => specs.quals |= TypeQualifiers::VOLATILE,
                    Keyword::Restrict => specs.quals |= TypeQualifiers::RESTRICT,
                    Keyword::Inline => specs.funcspec |= FunctionSpecifier::INLINE,
                    Keyword::Noreturn => specs.funcspec |= FunctionSpecifier::NORETURN,
                    Keyword::Struct | Keyword::Union | Keyword::Enum => {
                        let kind = match keyword {
                            Keyword::Struct => TagKind::Struct,
                            Keyword::Union => TagKind::Union,
                            _ => TagKind::Enum,
                        };
                        let id = self.tag_specifier(kind, &mut specs)?;
                        specs.base = Some(SpecBase::Tag(id));
                        guessed = false;
                        continue;
                    }
                    k if Self::is_specifier_keyword(k) => {
                        if guessed {
                            specs.base = None;
                            guessed = false;
                        }
                        words.push(k);
                    }
                    _ => break,
                }
                self.next()?;
                continue;
            }

            let Some(name) = self.peek_ident(0)? else {
                break;
            };
            let has_type = specs.base.is_some() || !words.is_empty();
            if has_type && !guessed {
                break;
            }

            if self.state.typedefs.contains(&name) {
                self.next()?;
                specs.base = Some(SpecBase::Fresh(Type::named(TypeKind::TypedefName, name)));
                guessed = false;
                continue;
            }

            let looks_like_type = self.declarator_follows(1)?;
            if guessed {
                if !looks_like_type {
                    break;
                }
                trace!("treating {} as a type name", name);
            } else if self
                .peek_keyword(1)?
                .is_some_and(|k| Self::is_specifier_keyword(k) && !Self::is_qualifier(k))
            {
                trace!("dropping decoration {}", name);
                self.next()?;
                continue;
            } else if ctx == DeclContext::TopLevel && !looks_like_type {
                break;
            }

            self.next()?;
            specs.base = Some(SpecBase::Fresh(Type::named(TypeKind::TypedefName, name)));
            guessed = true;
        }

        if specs.base.is_none() && !words.is_empty() {
            specs.base = Some(SpecBase::Fresh(base_type_template(&words)));
        }
        Ok(specs)
    }

    fn tag_specifier(&mut self, kind: TagKind, specs: &mut Specifiers) -> PResult<TypeId> {
        let keyword = self.bump(kind.keyword())?;
        let name = self.peek_ident(0)?;
        if name.is_some() {
            self.next()?;
        }

        if !self.peek_punct(0, Punct::LBrace)? {
            return match name {
                Some(name) => Ok(self.state.arena.tag_ref(kind, &name)),
                None => Err(self.error_here("tag name or `{`")),
            };
        }
        self.next()?;

        let file = self.files[keyword.file].clone();
        let line = keyword.token.pos.line;
        let first_definition = match &name {
            Some(n) if self.state.arena.is_tag_defined(kind, n) => {
                debug!("{} {} is already defined, keeping the first body", kind.keyword(), n);
                self.state.arena.lookup_tag(kind, n)
            }
            _ => None,
        };

        let id = match (&name, first_definition) {
            (_, Some(_)) | (None, None) => self.state.arena.alloc(Type::new(kind.type_kind())),
            (Some(n), None) => self.state.arena.tag_ref(kind, n),
        };

        if let (Some(n), None) = (&name, first_definition) {
            let symbol = Symbol::new(kind.symbol_kind(), Some(n.clone()), id, file, line);
            self.emit(symbol);
        }

        let children = match kind {
            TagKind::Enum => self.enum_body()?,
            TagKind::Struct | TagKind::Union => self.struct_body()?,
        };
        let node = self.state.arena.get_mut(id);
        node.kind = kind.type_kind();
        node.child_list = children;

        if let Some(first) = first_definition {
            return Ok(first);
        }
        specs.tag_body = Some(TagBody {
            kind,
            anonymous: name.is_none(),
            id,
        });
        Ok(id)
    }

    fn struct_body(&mut self) -> PResult<Vec<Symbol>> {
        let mut members = Vec::new();
        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            if self.peek(0)?.is_none() {
                return Err(self.error_here("`}`"));
            }
            if self.eat_punct(Punct::Semicolon)? {
                continue;
            }

            let specs = self.specifiers(DeclContext::Member)?;
            if self.eat_punct(Punct::Semicolon)? {
                // anonymous struct/union member
                let file = self.files[specs.file].clone();
                let ty = self.declared_type(&specs, Vec::new());
                members.push(Symbol::new(SymbolKind::Member, None, ty, file, specs.line));
                continue;
            }

            loop {
                let decl = if self.peek_punct(0, Punct::Colon)? {
                    Declarator::default()
                } else {
                    self.declarator(DeclContext::Member)?
                };
                let mut bit_width = None;
                let bitfield = self.eat_punct(Punct::Colon)?;
                if bitfield {
                    let tokens = self.collect_expression()?;
                    bit_width = self.fold(&tokens);
                }
                self.skip_trailing_decorations()?;
                if decl.name.is_none() && decl.ops.is_empty() && !bitfield {
                    return Err(self.error_here("member declarator"));
                }

                let (file, line) = decl.position.unwrap_or((specs.file, specs.line));
                let file = self.files[file].clone();
                let ty = self.declared_type(&specs, decl.ops);
                let mut member = Symbol::new(SymbolKind::Member, decl.name, ty, file, line);
                member.bit_width = bit_width;
                members.push(member);

                if self.eat_punct(Punct::Comma)? {
                    continue;
                }
                self.expect_punct(Punct::Semicolon)?;
                break;
            }
        }
        Ok(members)
    }

    fn enum_body(&mut self) -> PResult<Vec<Symbol>> {
        let mut enumerators = Vec::new();
        let mut next_implicit = Some(0i64);

        loop {
            if self.eat_punct(Punct::RBrace)? {
                break;
            }
            let Some(name) = self.peek_ident(0)? else {
                return Err(self.error_here("enumerator"));
            };
            let lexed = self.bump("enumerator")?;

            let value = if self.eat_punct(Punct::Assign)? {
                let tokens = self.collect_expression()?;
                let value = self.fold(&tokens);
                if value.is_none() {
                    trace!("enumerator {} has no constant value", name);
                }
                value
            } else {
                next_implicit
            };
            next_implicit = value.and_then(|v| v.checked_add(1));

            if let Some(value) = value {
                self.state.set_constant(&name, value);
            }

            let int = self.state.arena.alloc(Type::named(TypeKind::Base, "int"));
            let file = self.files[lexed.file].clone();
            let mut symbol =
                Symbol::new(SymbolKind::EnumMember, Some(name), int, file, lexed.token.pos.line);
            symbol.const_int = value;
            enumerators.push(symbol);

            if !self.eat_punct(Punct::Comma)? {
                self.expect_punct(Punct::RBrace)?;
                break;
            }
        }
        Ok(enumerators)
    }

    fn declarator(&mut self, ctx: DeclContext) -> PResult<Declarator> {
        let mut pointers = Vec::new();
        while self.eat_punct(Punct::Star)? || self.eat_punct(Punct::Caret)? {
            let mut quals = TypeQualifiers::empty();
            loop {
                match self.peek_keyword(0)? {
                    Some(Keyword::Const) => quals |= TypeQualifiers::CONST,
                    Some(Keyword::Volatile) => quals |= TypeQualifiers::VOLATILE,
                    Some(Keyword::Restrict) => quals |= TypeQualifiers::RESTRICT,
                    _ => break,
                }
                self.next()?;
            }
            pointers.push(DeclOp::Pointer(quals));
        }

        let mut decl = Declarator::default();
        let mut inner_ops = Vec::new();

        if let Some(name) = self.peek_ident(0)? {
            let lexed = self.bump("identifier")?;
            decl.name = Some(name);
            decl.position = Some((lexed.file, lexed.token.pos.line));
        } else if self.peek_punct(0, Punct::LParen)? && self.nested_declarator_follows(ctx)? {
            self.next()?;
            let inner = self.declarator(ctx)?;
            self.expect_punct(Punct::RParen)?;
            decl.name = inner.name;
            decl.position = inner.position;
            inner_ops = inner.ops;
        }

        let mut suffixes = Vec::new();
        loop {
            if self.eat_punct(Punct::LBracket)? {
                let tokens = self.collect_expression()?;
                self.expect_punct(Punct::RBracket)?;
                suffixes.push(DeclOp::Array(self.fold(&tokens)));
            } else if self.eat_punct(Punct::LParen)? {
                let (params, variadic) = self.parameters()?;
                suffixes.push(DeclOp::Function { params, variadic });
            } else {
                break;
            }
        }

        decl.ops = pointers;
        decl.ops.extend(suffixes.into_iter().rev());
        decl.ops.extend(inner_ops);
        Ok(decl)
    }

    /// Whether the `(` at the cursor opens a parenthesized declarator.
    fn nested_declarator_follows(&mut self, ctx: DeclContext) -> PResult<bool> {
        if self.peek_punct(1, Punct::Star)? || self.peek_punct(1, Punct::Caret)? {
            return Ok(true);
        }
        if ctx == DeclContext::Param {
            return Ok(false);
        }
        Ok(match self.peek_ident(1)? {
            Some(name) => !self.state.typedefs.contains(&name),
            None => false,
        })
    }

    /// Parameter list after a consumed `(`.
    fn parameters(&mut self) -> PResult<(Vec<Symbol>, bool)> {
        if self.eat_punct(Punct::RParen)? {
            return Ok((Vec::new(), false));
        }
        if self.peek_keyword(0)? == Some(Keyword::Void) && self.peek_punct(1, Punct::RParen)? {
            self.next()?;
            self.next()?;
            return Ok((Vec::new(), false));
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.eat_punct(Punct::Ellipsis)? {
                variadic = true;
                self.expect_punct(Punct::RParen)?;
                break;
            }

            let specs = self.specifiers(DeclContext::Param)?;
            let decl = self.declarator(DeclContext::Param)?;
            self.skip_trailing_decorations()?;

            let (file, line) = decl.position.unwrap_or((specs.file, specs.line));
            let file = self.files[file].clone();
            let ty = self.declared_type(&specs, decl.ops);
            params.push(Symbol::new(SymbolKind::Variable, decl.name, ty, file, line));

            if self.eat_punct(Punct::Comma)? {
                continue;
            }
            self.expect_punct(Punct::RParen)?;
            break;
        }
        Ok((params, variadic))
    }

    /// Skip macro decorations between a declarator and its terminator,
    /// e.g. `G_GNUC_CONST` or `G_GNUC_PRINTF (1, 2)`.
    fn skip_trailing_decorations(&mut self) -> PResult<()> {
        while let Some(name) = self.peek_ident(0)? {
            self.next()?;
            if self.peek_punct(0, Punct::LParen)? {
                self.skip_balanced(Punct::LParen, Punct::RParen)?;
            }
            trace!("skipped trailing decoration {}", name);
        }
        Ok(())
    }

    fn name_anonymous_tag(&mut self, specs: &Specifiers, name: &str) {
        let Some(SpecBase::Tag(id)) = &specs.base else {
            return;
        };
        let node = self.state.arena.get(*id);
        if node.name.is_none() && node.is_tagged() {
            self.state.arena.get_mut(*id).name = Some(name.to_string());
        }
    }

    /// Build the type of one declarator from the shared specifiers.
    fn declared_type(&mut self, specs: &Specifiers, ops: Vec<DeclOp>) -> TypeId {
        let arena = &mut self.state.arena;
        let (mut current, fresh) = match &specs.base {
            Some(SpecBase::Fresh(template)) => {
                let mut ty = template.clone();
                ty.qualifiers |= specs.quals;
                (arena.alloc(ty), true)
            }
            Some(SpecBase::Tag(id)) => (*id, false),
            None => {
                let mut ty = Type::named(TypeKind::Base, "int");
                ty.qualifiers = specs.quals;
                (arena.alloc(ty), true)
            }
        };

        let derived = !ops.is_empty();
        for op in ops {
            let ty = match op {
                DeclOp::Pointer(quals) => {
                    let mut ty = Type::derived(TypeKind::Pointer, current);
                    ty.qualifiers = quals;
                    ty
                }
                DeclOp::Array(len) => {
                    let mut ty = Type::derived(TypeKind::Array, current);
                    ty.array_len = len;
                    ty
                }
                DeclOp::Function { params, variadic } => {
                    let mut ty = Type::derived(TypeKind::Function, current);
                    ty.child_list = params;
                    ty.variadic = variadic;
                    ty
                }
            };
            current = arena.alloc(ty);
        }

        if fresh || derived {
            let top = arena.get_mut(current);
            top.storage_class |= specs.storage;
            top.function_specifier |= specs.funcspec;
        }
        current
    }
}

/// Canonical base type from its keywords, e.g. `long unsigned int` → `unsigned long int`.
fn base_type_template(words: &[Keyword]) -> Type {
    let count = |keyword: Keyword| words.iter().filter(|w| **w == keyword).count();
    if count(Keyword::Void) > 0 {
        return Type::new(TypeKind::Void);
    }

    let mut parts = Vec::new();
    if count(Keyword::Unsigned) > 0 {
        parts.push("unsigned");
    } else if count(Keyword::Signed) > 0 {
        parts.push("signed");
    }
    if count(Keyword::Short) > 0 {
        parts.push("short");
    }
    for _ in 0..count(Keyword::Long) {
        parts.push("long");
    }
    for (keyword, spelling) in [
        (Keyword::Char, "char"),
        (Keyword::Int, "int"),
        (Keyword::Float, "float"),
        (Keyword::Double, "double"),
        (Keyword::Bool, "_Bool"),
    ] {
        if count(keyword) > 0 {
            parts.push(spelling);
        }
    }
    if count(Keyword::Complex) > 0 {
        parts.push("_Complex");
    }
    Type::named(TypeKind::Base, parts.join(" "))
}
