//! Token definitions shared by the lexer, the parser and the constant folder.

use std::fmt;

/// Line/column position of a token (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Token { kind, pos }
    }

    /// Check whether this token is the given punctuator.
    pub fn is_punct(&self, punct: Punct) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == punct)
    }

    /// Check whether this token is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == keyword)
    }

    /// The identifier text, if this is an identifier.
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Token categories.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    /// Integer literal; `value` has the suffix stripped, `text` is the spelling.
    Int { value: u64, text: String },
    Float(String),
    /// String literal contents after escape processing.
    Str(String),
    /// Character literal value.
    Char(i64),
    Punct(Punct),
    /// Body of a `/** ... */` comment, without the delimiters.
    DocComment(String),
    Preprocessor(PpLine),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Keyword(k) => write!(f, "`{}`", k.as_str()),
            TokenKind::Int { text, .. } => write!(f, "integer `{}`", text),
            TokenKind::Float(text) => write!(f, "float `{}`", text),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::Char(c) => write!(f, "character constant {}", c),
            TokenKind::Punct(p) => write!(f, "`{}`", p.as_str()),
            TokenKind::DocComment(_) => write!(f, "doc comment"),
            TokenKind::Preprocessor(_) => write!(f, "preprocessor directive"),
        }
    }
}

/// A preprocessor line, already split into its directive and arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum PpLine {
    Define {
        name: String,
        /// `Some` for function-like macros.
        params: Option<Vec<String>>,
        body: String,
    },
    Undef(String),
    If(String),
    Ifdef(String),
    Ifndef(String),
    Elif(String),
    Else,
    Endif,
    /// `# 12 "foo.h"` linemarker or `#line 12 "foo.h"`.
    Line { line: u32, file: Option<String> },
    Pragma(String),
    Other(String),
}

impl PpLine {
    /// Whether this line takes part in conditional compilation.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self,
            PpLine::If(_)
                | PpLine::Ifdef(_)
                | PpLine::Ifndef(_)
                | PpLine::Elif(_)
                | PpLine::Else
                | PpLine::Endif
        )
    }
}

macro_rules! keywords {
    (@first $first:literal $(, $rest:literal)*) => { $first };
    ($($variant:ident => [$($spelling:literal),+]),+ $(,)?) => {
        /// C keywords, including the GNU alternate spellings found in system headers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant),+
        }

        impl Keyword {
            /// Look up a keyword by spelling.
            pub fn from_ident(s: &str) -> Option<Keyword> {
                match s {
                    $($($spelling)|+ => Some(Keyword::$variant),)+
                    _ => None,
                }
            }

            /// Canonical spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Keyword::$variant => keywords!(@first $($spelling),+),)+
                }
            }
        }
    };
}

keywords! {
    Auto => ["auto"],
    Break => ["break"],
    Case => ["case"],
    Char => ["char"],
    Const => ["const", "__const", "__const__"],
    Continue => ["continue"],
    Default => ["default"],
    Do => ["do"],
    Double => ["double"],
    Else => ["else"],
    Enum => ["enum"],
    Extern => ["extern"],
    Float => ["float"],
    For => ["for"],
    Goto => ["goto"],
    If => ["if"],
    Inline => ["inline", "__inline", "__inline__"],
    Int => ["int"],
    Long => ["long"],
    Register => ["register"],
    Restrict => ["restrict", "__restrict", "__restrict__"],
    Return => ["return"],
    Short => ["short"],
    Signed => ["signed", "__signed", "__signed__"],
    Sizeof => ["sizeof"],
    Static => ["static"],
    Struct => ["struct"],
    Switch => ["switch"],
    Typedef => ["typedef"],
    Union => ["union"],
    Unsigned => ["unsigned"],
    Void => ["void"],
    Volatile => ["volatile", "__volatile", "__volatile__"],
    While => ["while"],
    Bool => ["_Bool"],
    Complex => ["_Complex", "__complex__"],
    Noreturn => ["_Noreturn"],
    ThreadLocal => ["_Thread_local", "__thread"],
    StaticAssert => ["_Static_assert"],
    Attribute => ["__attribute__", "__attribute"],
    Asm => ["asm", "__asm", "__asm__"],
    Declspec => ["__declspec"],
    Extension => ["__extension__"],
}

/// Punctuators and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Arrow,
    Ellipsis,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
    Hash,
    HashHash,
}

impl Punct {
    /// All punctuators ordered longest spelling first, for maximal munch.
    pub(crate) const BY_LENGTH: &'static [Punct] = &[
        Punct::Ellipsis,
        Punct::ShlEq,
        Punct::ShrEq,
        Punct::Arrow,
        Punct::PlusPlus,
        Punct::MinusMinus,
        Punct::Shl,
        Punct::Shr,
        Punct::Le,
        Punct::Ge,
        Punct::EqEq,
        Punct::NotEq,
        Punct::AndAnd,
        Punct::OrOr,
        Punct::PlusEq,
        Punct::MinusEq,
        Punct::StarEq,
        Punct::SlashEq,
        Punct::PercentEq,
        Punct::AmpEq,
        Punct::PipeEq,
        Punct::CaretEq,
        Punct::HashHash,
        Punct::LParen,
        Punct::RParen,
        Punct::LBrace,
        Punct::RBrace,
        Punct::LBracket,
        Punct::RBracket,
        Punct::Semicolon,
        Punct::Comma,
        Punct::Dot,
        Punct::Question,
        Punct::Colon,
        Punct::Plus,
        Punct::Minus,
        Punct::Star,
        Punct::Slash,
        Punct::Percent,
        Punct::Amp,
        Punct::Pipe,
        Punct::Caret,
        Punct::Tilde,
        Punct::Bang,
        Punct::Assign,
        Punct::Lt,
        Punct::Gt,
        Punct::Hash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Semicolon => ";",
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::Arrow => "->",
            Punct::Ellipsis => "...",
            Punct::Question => "?",
            Punct::Colon => ":",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::Bang => "!",
            Punct::Assign => "=",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Shl => "<<",
            Punct::Shr => ">>",
            Punct::PlusPlus => "++",
            Punct::MinusMinus => "--",
            Punct::PlusEq => "+=",
            Punct::MinusEq => "-=",
            Punct::StarEq => "*=",
            Punct::SlashEq => "/=",
            Punct::PercentEq => "%=",
            Punct::AmpEq => "&=",
            Punct::PipeEq => "|=",
            Punct::CaretEq => "^=",
            Punct::ShlEq => "<<=",
            Punct::ShrEq => ">>=",
            Punct::Hash => "#",
            Punct::HashHash => "##",
        }
    }
}
