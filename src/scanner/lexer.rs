//! Lexer (tokenizer) for C headers.
//!
//! Converts source text into a lazy stream of [`Token`]s. Preprocessor lines
//! are not expanded here; they are split into [`PpLine`] tokens and handed to
//! the parser, which owns the macro table and the conditional stack.
//!
//! In macro-scan mode only `#define`, conditional and line-marker directives
//! are emitted and all other content is skipped without being tokenized.

use std::path::{Path, PathBuf};

use super::errors::{LexError, LexErrorKind};
use super::token::{Keyword, Position, PpLine, Punct, Token, TokenKind};

/// Streaming tokenizer over one source text.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    file: PathBuf,
    at_line_start: bool,
    macro_scan: bool,
    finished: bool,
}

impl Lexer {
    /// Create a lexer for `source`, reporting positions against `file`.
    pub fn new(source: &str, file: impl Into<PathBuf>, macro_scan: bool) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            file: file.into(),
            at_line_start: true,
            macro_scan,
            finished: false,
        }
    }

    /// The file currently being lexed; changes when a line marker is seen.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Current line number.
    pub fn line(&self) -> u32 {
        self.line
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn error(&self, pos: Position, kind: LexErrorKind) -> LexError {
        LexError::new(self.file.clone(), pos.line, pos.column, kind)
    }

    /// Skip a `/* ... */` comment whose opening has already been seen.
    fn skip_block_comment(&mut self, start: Position) -> Result<(), LexError> {
        // consume "/*"
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek_char(0) == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(self.error(start, LexErrorKind::UnterminatedComment)),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Read a `/** ... */` comment and return its body.
    fn read_doc_comment(&mut self, start: Position) -> Result<String, LexError> {
        for _ in 0..3 {
            self.bump();
        }
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('*') if self.peek_char(0) == Some('/') => {
                    self.bump();
                    return Ok(text);
                }
                Some(c) => text.push(c),
                None => return Err(self.error(start, LexErrorKind::UnterminatedComment)),
            }
        }
    }

    /// Read the raw text of a preprocessor line after the `#`.
    ///
    /// Backslash continuations are joined and comments replaced by a space.
    /// The terminating newline is consumed.
    fn read_pp_text(&mut self) -> Result<String, LexError> {
        let mut text = String::new();
        let mut quote: Option<char> = None;

        while let Some(c) = self.peek_char(0) {
            match c {
                '\\' if self.peek_char(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                    continue;
                }
                '\\' if self.peek_char(1) == Some('\r') && self.peek_char(2) == Some('\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    continue;
                }
                '\n' => {
                    self.bump();
                    break;
                }
                _ => {}
            }

            if let Some(q) = quote {
                text.push(c);
                self.bump();
                if c == '\\' {
                    if let Some(escaped) = self.peek_char(0) {
                        if escaped != '\n' {
                            text.push(escaped);
                            self.bump();
                        }
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '"' | '\'' => {
                    quote = Some(c);
                    text.push(c);
                    self.bump();
                }
                '/' if self.peek_char(1) == Some('*') => {
                    let start = self.here();
                    self.skip_block_comment(start)?;
                    text.push(' ');
                }
                '/' if self.peek_char(1) == Some('/') => self.skip_line_comment(),
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }

        Ok(text)
    }

    /// Lex a preprocessor line. The `#` has not been consumed yet.
    fn preprocessor_line(&mut self) -> Result<PpLine, LexError> {
        self.bump();
        let text = self.read_pp_text()?;
        let pp = parse_pp_line(&text);

        if let PpLine::Line { line, file } = &pp {
            if let Some(file) = file {
                self.file = PathBuf::from(file);
            }
            self.line = *line;
        }

        Ok(pp)
    }

    /// Skip to the next line start in macro-scan mode.
    fn skip_macro_scan_content(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek_char(0) {
            match c {
                '\n' => {
                    self.bump();
                    return Ok(());
                }
                '/' if self.peek_char(1) == Some('*') => {
                    let start = self.here();
                    self.skip_block_comment(start)?;
                    // a comment spanning lines leaves us mid-line
                    self.at_line_start = false;
                }
                '/' if self.peek_char(1) == Some('/') => self.skip_line_comment(),
                '"' | '\'' => {
                    self.bump();
                    while let Some(inner) = self.peek_char(0) {
                        if inner == '\n' {
                            break;
                        }
                        self.bump();
                        if inner == '\\' {
                            self.bump();
                        } else if inner == c {
                            break;
                        }
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek_char(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn read_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char(0) {
            let exponent_sign = (c == '+' || c == '-')
                && matches!(text.chars().last(), Some('e' | 'E' | 'p' | 'P'))
                && !is_hex_digit_e(&text);
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let hex = text.starts_with("0x") || text.starts_with("0X");
        let is_float = text.contains('.')
            || (hex && text.contains(['p', 'P']))
            || (!hex && text.contains(['e', 'E']));
        if is_float {
            return Ok(TokenKind::Float(text));
        }

        match parse_int_literal(&text) {
            Some(value) => Ok(TokenKind::Int { value, text }),
            None => Err(self.error(start, LexErrorKind::InvalidNumber(text))),
        }
    }

    fn read_escape(&mut self) -> Option<u32> {
        let c = self.bump()?;
        let value = match c {
            'n' => '\n' as u32,
            't' => '\t' as u32,
            'r' => '\r' as u32,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            'e' => 0x1b,
            'x' => {
                let mut value = 0u32;
                while let Some(d) = self.peek_char(0).and_then(|d| d.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    self.bump();
                }
                value
            }
            'u' | 'U' => {
                let digits = if c == 'u' { 4 } else { 8 };
                let mut value = 0u32;
                for _ in 0..digits {
                    match self.peek_char(0).and_then(|d| d.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                value
            }
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek_char(0).and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                value
            }
            other => other as u32,
        };
        Some(value)
    }

    fn read_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        // opening quote
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char(0) {
                None | Some('\n') => {
                    return Err(self.error(start, LexErrorKind::UnterminatedString));
                }
                Some('"') => {
                    self.bump();
                    return Ok(TokenKind::Str(value));
                }
                Some('\\') => {
                    self.bump();
                    if self.peek_char(0) == Some('\n') {
                        self.bump();
                        continue;
                    }
                    let code = self
                        .read_escape()
                        .ok_or_else(|| self.error(start, LexErrorKind::UnterminatedString))?;
                    value.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn read_char(&mut self, start: Position) -> Result<TokenKind, LexError> {
        // opening quote
        self.bump();
        let mut value: Option<i64> = None;
        loop {
            match self.peek_char(0) {
                None | Some('\n') => {
                    return Err(self.error(start, LexErrorKind::UnterminatedChar));
                }
                Some('\'') => {
                    self.bump();
                    return Ok(TokenKind::Char(value.unwrap_or(0)));
                }
                Some('\\') => {
                    self.bump();
                    let code = self
                        .read_escape()
                        .ok_or_else(|| self.error(start, LexErrorKind::UnterminatedChar))?;
                    value.get_or_insert(i64::from(code));
                }
                Some(c) => {
                    self.bump();
                    value.get_or_insert(i64::from(u32::from(c)));
                }
            }
        }
    }

    fn read_punct(&mut self, start: Position) -> Result<TokenKind, LexError> {
        for punct in Punct::BY_LENGTH {
            let spelling = punct.as_str();
            let matches = spelling
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_char(i) == Some(c));
            if matches {
                for _ in 0..spelling.len() {
                    self.bump();
                }
                return Ok(TokenKind::Punct(*punct));
            }
        }

        let c = self.peek_char(0).unwrap_or('\0');
        Err(self.error(start, LexErrorKind::UnexpectedChar(c)))
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            let Some(c) = self.peek_char(0) else {
                return Ok(None);
            };
            let start = self.here();

            if c == '\n' {
                self.bump();
                continue;
            }
            if c.is_whitespace() {
                self.bump();
                continue;
            }

            if c == '#' && self.at_line_start {
                let pp = self.preprocessor_line()?;
                let emit = !self.macro_scan
                    || matches!(pp, PpLine::Define { .. } | PpLine::Line { .. })
                    || pp.is_conditional();
                if emit {
                    return Ok(Some(Token::new(TokenKind::Preprocessor(pp), start)));
                }
                continue;
            }

            if self.macro_scan {
                self.at_line_start = false;
                self.skip_macro_scan_content()?;
                continue;
            }

            // Anything else ends the "only whitespace so far" state of the line.
            self.at_line_start = false;

            if c == '\\' && matches!(self.peek_char(1), Some('\n')) {
                self.bump();
                self.bump();
                continue;
            }

            if c == '/' && self.peek_char(1) == Some('*') {
                let is_doc = self.peek_char(2) == Some('*') && self.peek_char(3) != Some('/');
                if is_doc {
                    let text = self.read_doc_comment(start)?;
                    self.at_line_start = false;
                    return Ok(Some(Token::new(TokenKind::DocComment(text), start)));
                }
                self.skip_block_comment(start)?;
                self.at_line_start = false;
                continue;
            }
            if c == '/' && self.peek_char(1) == Some('/') {
                self.skip_line_comment();
                continue;
            }

            let kind = if c.is_ascii_alphabetic() || c == '_' || c == '$' {
                let ident = self.read_identifier();
                let prefixed_literal = matches!(ident.as_str(), "L" | "u" | "U" | "u8");
                match self.peek_char(0) {
                    Some('"') if prefixed_literal => self.read_string(start)?,
                    Some('\'') if prefixed_literal && ident != "u8" => self.read_char(start)?,
                    _ => match Keyword::from_ident(&ident) {
                        Some(keyword) => TokenKind::Keyword(keyword),
                        None => TokenKind::Ident(ident),
                    },
                }
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_char(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.read_number(start)?
            } else if c == '"' {
                self.read_string(start)?
            } else if c == '\'' {
                self.read_char(start)?
            } else {
                self.read_punct(start)?
            };

            return Ok(Some(Token::new(kind, start)));
        }
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Tokenize a complete text in normal mode.
pub fn tokenize(source: &str, file: impl Into<PathBuf>) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, file, false).collect()
}

fn is_hex_digit_e(text: &str) -> bool {
    // In hex literals `e`/`E` are digits, so a following sign is an operator.
    (text.starts_with("0x") || text.starts_with("0X")) && !text.contains(['p', 'P'])
}

/// Parse an integer literal spelling, ignoring `u`/`l` suffixes.
pub(crate) fn parse_int_literal(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// Split the text after `#` into a [`PpLine`].
fn parse_pp_line(text: &str) -> PpLine {
    let (directive, rest) = split_word(text);

    if !directive.is_empty() && directive.chars().all(|c| c.is_ascii_digit()) {
        return parse_line_marker(directive, rest);
    }

    match directive {
        "define" => {
            let (name, after) = split_word(rest);
            if let Some(param_text) = after.strip_prefix('(') {
                let (params, body) = match param_text.find(')') {
                    Some(close) => (&param_text[..close], &param_text[close + 1..]),
                    None => (param_text, ""),
                };
                let params = params
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                PpLine::Define {
                    name: name.to_string(),
                    params: Some(params),
                    body: body.trim().to_string(),
                }
            } else {
                PpLine::Define {
                    name: name.to_string(),
                    params: None,
                    body: after.trim().to_string(),
                }
            }
        }
        "undef" => PpLine::Undef(split_word(rest).0.to_string()),
        "if" => PpLine::If(rest.trim().to_string()),
        "ifdef" => PpLine::Ifdef(split_word(rest).0.to_string()),
        "ifndef" => PpLine::Ifndef(split_word(rest).0.to_string()),
        "elif" => PpLine::Elif(rest.trim().to_string()),
        "else" => PpLine::Else,
        "endif" => PpLine::Endif,
        "line" => {
            let (number, after) = split_word(rest);
            parse_line_marker(number, after)
        }
        "pragma" => PpLine::Pragma(rest.trim().to_string()),
        _ => PpLine::Other(text.trim().to_string()),
    }
}

fn parse_line_marker(number: &str, rest: &str) -> PpLine {
    let Ok(line) = number.parse::<u32>() else {
        return PpLine::Other(format!("{} {}", number, rest.trim()));
    };
    let rest = rest.trim();
    let file = rest.strip_prefix('"').and_then(|r| {
        r.find('"').map(|end| r[..end].replace("\\\\", "\\"))
    });
    PpLine::Line { line, file }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.h")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn macro_kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test.h", true)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_declaration() {
        assert_eq!(
            kinds("int add(int a);"),
            vec![
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Ident("add".into()),
                TokenKind::Punct(Punct::LParen),
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::RParen),
                TokenKind::Punct(Punct::Semicolon),
            ]
        );
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = tokenize("int\n  x;", "test.h").unwrap();
        assert_eq!(tokens[0].pos, Position::new(1, 1));
        assert_eq!(tokens[1].pos, Position::new(2, 3));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("0x1F 010 42UL 0b101 1.5f 1e3 0x1p-2"),
            vec![
                TokenKind::Int { value: 31, text: "0x1F".into() },
                TokenKind::Int { value: 8, text: "010".into() },
                TokenKind::Int { value: 42, text: "42UL".into() },
                TokenKind::Int { value: 5, text: "0b101".into() },
                TokenKind::Float("1.5f".into()),
                TokenKind::Float("1e3".into()),
                TokenKind::Float("0x1p-2".into()),
            ]
        );
    }

    #[test]
    fn test_hex_followed_by_minus_is_operator() {
        assert_eq!(
            kinds("0xE-1"),
            vec![
                TokenKind::Int { value: 14, text: "0xE".into() },
                TokenKind::Punct(Punct::Minus),
                TokenKind::Int { value: 1, text: "1".into() },
            ]
        );
    }

    #[test]
    fn test_strings_and_chars() {
        assert_eq!(
            kinds(r#""a\tb" L"w" 'x' '\n' '\x41'"#),
            vec![
                TokenKind::Str("a\tb".into()),
                TokenKind::Str("w".into()),
                TokenKind::Char('x' as i64),
                TokenKind::Char(10),
                TokenKind::Char(0x41),
            ]
        );
    }

    #[test]
    fn test_operators_maximal_munch() {
        assert_eq!(
            kinds("a <<= b ... ->"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::ShlEq),
                TokenKind::Ident("b".into()),
                TokenKind::Punct(Punct::Ellipsis),
                TokenKind::Punct(Punct::Arrow),
            ]
        );
    }

    #[test]
    fn test_comments_skipped_doc_comments_kept() {
        let source = "/* plain */ // line\n/** doc: (skip) */ int x; /**/";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::DocComment(" doc: (skip) ".into()),
                TokenKind::Keyword(Keyword::Int),
                TokenKind::Ident("x".into()),
                TokenKind::Punct(Punct::Semicolon),
            ]
        );
    }

    #[test]
    fn test_preprocessor_lines() {
        let source = "#define FOO 10 /* ten */\n#define MAX(a, b) \\\n  ((a) > (b))\n#ifdef FOO\n#endif\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Preprocessor(PpLine::Define {
                    name: "FOO".into(),
                    params: None,
                    body: "10".into(),
                }),
                TokenKind::Preprocessor(PpLine::Define {
                    name: "MAX".into(),
                    params: Some(vec!["a".into(), "b".into()]),
                    body: "((a) > (b))".into(),
                }),
                TokenKind::Preprocessor(PpLine::Ifdef("FOO".into())),
                TokenKind::Preprocessor(PpLine::Endif),
            ]
        );
    }

    #[test]
    fn test_hash_mid_line_is_not_a_directive() {
        assert_eq!(
            kinds("a # b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::Hash),
                TokenKind::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_line_marker_switches_file() {
        let mut lexer = Lexer::new("# 10 \"other.h\" 1\nint x;", "test.h", false);
        let marker = lexer.next().unwrap().unwrap();
        assert_eq!(
            marker.kind,
            TokenKind::Preprocessor(PpLine::Line {
                line: 10,
                file: Some("other.h".into()),
            })
        );
        let int = lexer.next().unwrap().unwrap();
        assert_eq!(int.pos.line, 10);
        assert_eq!(lexer.file(), Path::new("other.h"));
    }

    #[test]
    fn test_macro_scan_only_emits_macro_lines() {
        let source = "int x = 'unterminated;\n#define A 1\n#include <stdio.h>\n/*\n#define B 2\n*/\n#if A\n#endif\n";
        assert_eq!(
            macro_kinds(source),
            vec![
                TokenKind::Preprocessor(PpLine::Define {
                    name: "A".into(),
                    params: None,
                    body: "1".into(),
                }),
                TokenKind::Preprocessor(PpLine::If("A".into())),
                TokenKind::Preprocessor(PpLine::Endif),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_error() {
        let err = tokenize("char *s = \"abc\n;", "bad.h").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.line, 1);
        assert_eq!(err.file, PathBuf::from("bad.h"));
    }

    #[test]
    fn test_unterminated_char_error() {
        let err = tokenize("\n'a", "bad.h").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedChar);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unexpected_char_error() {
        let err = tokenize("int @x;", "bad.h").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedChar('@'));
        assert_eq!(err.column, 5);
    }

    #[test]
    fn test_lexer_is_fused_after_error() {
        let mut lexer = Lexer::new("@ int", "bad.h", false);
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }
}
