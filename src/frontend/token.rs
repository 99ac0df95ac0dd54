//! Token definitions for C99

use std::fmt;

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text the token was scanned from (the message for error tokens)
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self { kind, text: text.into(), span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, text: String::new(), span }
    }
}

/// Numeric base of an integer literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Octal,
    Hex,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Octal => 8,
            Radix::Hex => 16,
        }
    }
}

/// Integer literal payload: value plus suffix flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntLiteral {
    pub value: u64,
    pub radix: Radix,
    /// `u`/`U` suffix
    pub unsigned: bool,
    /// Number of `l`/`L` suffixes (0, 1 or 2)
    pub long_count: u8,
}

impl IntLiteral {
    pub fn has_suffix(&self) -> bool {
        self.unsigned || self.long_count > 0
    }
}

/// Suffix of a floating literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatSuffix {
    /// No suffix: `double`
    None,
    /// `f`/`F`: `float`
    Float,
    /// `l`/`L`: `long double`
    Long,
}

/// Floating literal payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLiteral {
    pub value: f64,
    pub suffix: FloatSuffix,
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    Auto,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
    /// _Bool
    Bool,
    /// _Complex
    Complex,
    /// _Imaginary
    Imaginary,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name, function name, typedef name, ...)
    Ident(String),
    /// Integer constant
    IntLit(IntLiteral),
    /// Floating constant
    FloatLit(FloatLiteral),
    /// Character constant (value of the first character)
    CharLit(i64),
    /// String literal with escapes decoded
    StringLit(String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// &
    Amp,
    /// |
    Pipe,
    /// ^
    Caret,
    /// ~
    Tilde,
    /// !
    Bang,
    /// &&
    AmpAmp,
    /// ||
    PipePipe,
    /// <<
    Shl,
    /// >>
    Shr,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// &=
    AmpEq,
    /// |=
    PipeEq,
    /// ^=
    CaretEq,
    /// <<=
    ShlEq,
    /// >>=
    ShrEq,
    /// ->
    Arrow,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ?
    Question,
    /// :
    Colon,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of file
    Eof,
    /// Lexical error; the token text carries the message
    Error,
}

/// The reserved words of C99, in the order of the standard's keyword list
pub const KEYWORDS: [(&str, TokenKind); 37] = [
    ("auto", TokenKind::Auto),
    ("break", TokenKind::Break),
    ("case", TokenKind::Case),
    ("char", TokenKind::Char),
    ("const", TokenKind::Const),
    ("continue", TokenKind::Continue),
    ("default", TokenKind::Default),
    ("do", TokenKind::Do),
    ("double", TokenKind::Double),
    ("else", TokenKind::Else),
    ("enum", TokenKind::Enum),
    ("extern", TokenKind::Extern),
    ("float", TokenKind::Float),
    ("for", TokenKind::For),
    ("goto", TokenKind::Goto),
    ("if", TokenKind::If),
    ("inline", TokenKind::Inline),
    ("int", TokenKind::Int),
    ("long", TokenKind::Long),
    ("register", TokenKind::Register),
    ("restrict", TokenKind::Restrict),
    ("return", TokenKind::Return),
    ("short", TokenKind::Short),
    ("signed", TokenKind::Signed),
    ("sizeof", TokenKind::Sizeof),
    ("static", TokenKind::Static),
    ("struct", TokenKind::Struct),
    ("switch", TokenKind::Switch),
    ("typedef", TokenKind::Typedef),
    ("union", TokenKind::Union),
    ("unsigned", TokenKind::Unsigned),
    ("void", TokenKind::Void),
    ("volatile", TokenKind::Volatile),
    ("while", TokenKind::While),
    ("_Bool", TokenKind::Bool),
    ("_Complex", TokenKind::Complex),
    ("_Imaginary", TokenKind::Imaginary),
];

/// Operators and punctuators, longest first so that a linear scan
/// yields the maximal munch
pub const PUNCTUATORS: [(&str, TokenKind); 46] = [
    ("...", TokenKind::Ellipsis),
    ("<<=", TokenKind::ShlEq),
    (">>=", TokenKind::ShrEq),
    ("->", TokenKind::Arrow),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("<=", TokenKind::Le),
    (">=", TokenKind::Ge),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::Ne),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::StarEq),
    ("/=", TokenKind::SlashEq),
    ("%=", TokenKind::PercentEq),
    ("&=", TokenKind::AmpEq),
    ("|=", TokenKind::PipeEq),
    ("^=", TokenKind::CaretEq),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
    ("!", TokenKind::Bang),
    ("=", TokenKind::Eq),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    (".", TokenKind::Dot),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (",", TokenKind::Comma),
    (";", TokenKind::Semicolon),
];

impl TokenKind {
    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(text, _)| *text == s)
            .map(|(_, kind)| kind.clone())
    }

    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| kind == self)
    }

    /// Keywords that can only begin a declaration: type specifiers,
    /// qualifiers, storage classes and `inline`
    pub fn is_declaration_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Void
                | TokenKind::Char
                | TokenKind::Short
                | TokenKind::Int
                | TokenKind::Long
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Signed
                | TokenKind::Unsigned
                | TokenKind::Bool
                | TokenKind::Complex
                | TokenKind::Imaginary
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Const
                | TokenKind::Volatile
                | TokenKind::Restrict
                | TokenKind::Auto
                | TokenKind::Register
                | TokenKind::Static
                | TokenKind::Extern
                | TokenKind::Typedef
                | TokenKind::Inline
        )
    }

    /// Keywords allowed in a type name (cast, sizeof, parameter): no storage class
    pub fn is_type_name_keyword(&self) -> bool {
        self.is_declaration_keyword()
            && !matches!(
                self,
                TokenKind::Auto
                    | TokenKind::Register
                    | TokenKind::Static
                    | TokenKind::Extern
                    | TokenKind::Typedef
                    | TokenKind::Inline
            )
    }

    /// Check if this token is an assignment operator
    pub fn is_assignment_op(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
        )
    }

    /// Get the precedence of a binary operator (for precedence climbing)
    /// Returns None if not a binary operator
    pub fn binary_precedence(&self) -> Option<u8> {
        match self {
            // Logical OR (lowest)
            TokenKind::PipePipe => Some(1),

            // Logical AND
            TokenKind::AmpAmp => Some(2),

            // Bitwise OR
            TokenKind::Pipe => Some(3),

            // Bitwise XOR
            TokenKind::Caret => Some(4),

            // Bitwise AND
            TokenKind::Amp => Some(5),

            // Equality
            TokenKind::EqEq | TokenKind::Ne => Some(6),

            // Relational
            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(7),

            // Shift
            TokenKind::Shl | TokenKind::Shr => Some(8),

            // Additive
            TokenKind::Plus | TokenKind::Minus => Some(9),

            // Multiplicative (highest for binary)
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(10),

            _ => None,
        }
    }

    /// Human readable description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::IntLit(lit) => format!("integer constant {}", lit.value),
            TokenKind::FloatLit(lit) => format!("floating constant {}", lit.value),
            TokenKind::CharLit(_) => "character constant".to_string(),
            TokenKind::StringLit(_) => "string literal".to_string(),
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Error => "invalid token".to_string(),
            other => format!("'{}'", other),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((text, _)) = KEYWORDS.iter().find(|(_, kind)| kind == self) {
            return write!(f, "{}", text);
        }
        if let Some((text, _)) = PUNCTUATORS.iter().find(|(_, kind)| kind == self) {
            return write!(f, "{}", text);
        }
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::IntLit(lit) => write!(f, "{}", lit.value),
            TokenKind::FloatLit(lit) => write!(f, "{}", lit.value),
            TokenKind::CharLit(value) => write!(f, "'\\x{:02x}'", value),
            TokenKind::StringLit(s) => write!(f, "{:?}", s),
            TokenKind::Eof => write!(f, "<eof>"),
            _ => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword_from_str("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword_from_str("_Bool"), Some(TokenKind::Bool));
        assert_eq!(TokenKind::keyword_from_str("While"), None);
        assert!(TokenKind::Restrict.is_keyword());
        assert!(!TokenKind::Ident("x".to_string()).is_keyword());
    }

    #[test]
    fn test_punctuators_sorted_longest_first() {
        for window in PUNCTUATORS.windows(2) {
            assert!(window[0].0.len() >= window[1].0.len());
        }
    }

    #[test]
    fn test_display_round_trips_operator_text() {
        assert_eq!(TokenKind::ShlEq.to_string(), "<<=");
        assert_eq!(TokenKind::Typedef.to_string(), "typedef");
        assert_eq!(TokenKind::Arrow.describe(), "'->'");
    }

    #[test]
    fn test_type_name_keywords_exclude_storage() {
        assert!(TokenKind::Const.is_type_name_keyword());
        assert!(TokenKind::Unsigned.is_type_name_keyword());
        assert!(!TokenKind::Static.is_type_name_keyword());
        assert!(TokenKind::Static.is_declaration_keyword());
    }
}
