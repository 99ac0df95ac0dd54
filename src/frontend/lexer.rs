//! Lexer for C99
//!
//! Converts source code into a stream of tokens. Comments and
//! preprocessor directive lines are skipped, not interpreted.

use log::{debug, trace};

use crate::frontend::token::{FloatLiteral, FloatSuffix, IntLiteral, Radix, Token, TokenKind, PUNCTUATORS};
use crate::utils::{Error, Result, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: u32,
    /// Current column (1-based)
    column: u32,
    /// Line and column of the current token's first character
    start_line: u32,
    start_column: u32,
    /// True until a token is seen on the current line
    at_line_start: bool,
    /// First lexical error; once set every call returns the same error token
    failure: Option<Error>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            at_line_start: true,
            failure: None,
        }
    }

    /// The error that stopped the lexer, if any
    pub fn error(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character, keeping line/column in sync
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
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

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Mark the current position as the start of a token
    fn begin_token(&mut self) {
        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line, self.start_column)
    }

    fn current_text(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    /// Create a token with the current span and source text
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.current_text(), self.make_span())
    }

    /// Skip whitespace, comments and preprocessor directive lines
    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c' => {
                    self.advance();
                }
                '#' if self.at_line_start => self.skip_directive(),
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment (no nesting in C)
                '/' if self.peek_next() == Some('*') => {
                    self.begin_token();
                    self.advance();
                    self.advance();
                    loop {
                        match (self.peek(), self.peek_next()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => {
                                self.advance();
                            }
                            (None, _) => {
                                return Err(Error::UnterminatedComment { span: self.make_span() });
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip a `#` directive up to the end of its (possibly continued) line
    fn skip_directive(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\\' if self.peek_next() == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '\\' if self.peek_next() == Some('\r')
                    && self.source.get(self.pos + 2) == Some(&'\n') =>
                {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                '\n' => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.current_text();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    fn consume_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    fn invalid_number(&self, reason: impl Into<String>) -> Error {
        Error::InvalidNumber {
            text: self.current_text(),
            reason: reason.into(),
            span: self.make_span(),
        }
    }

    /// Read a number literal (integer or floating)
    fn read_number(&mut self) -> Result<Token> {
        // Hexadecimal integer
        if self.peek() == Some('0') && matches!(self.peek_next(), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let digits = self.consume_while(|c| c.is_ascii_hexdigit());
            if digits.is_empty() {
                return Err(self.invalid_number("missing hexadecimal digits"));
            }
            return self.finish_integer(&digits, Radix::Hex);
        }

        let int_part = self.consume_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        // Fraction
        if self.peek() == Some('.') {
            is_float = true;
            self.advance();
            self.consume_while(|c| c.is_ascii_digit());
        }

        // Exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_next(), Some('+') | Some('-'));
            let digit_at = if signed { self.pos + 2 } else { self.pos + 1 };
            if !self.source.get(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
                return Err(self.invalid_number("exponent has no digits"));
            }
            is_float = true;
            self.advance();
            if signed {
                self.advance();
            }
            self.consume_while(|c| c.is_ascii_digit());
        }

        if is_float {
            return self.finish_float();
        }

        if int_part.len() > 1 && int_part.starts_with('0') {
            if let Some(bad) = int_part.chars().find(|c| *c == '8' || *c == '9') {
                return Err(self.invalid_number(format!("invalid digit '{}' in octal constant", bad)));
            }
            return self.finish_integer(&int_part[1..], Radix::Octal);
        }
        self.finish_integer(&int_part, Radix::Decimal)
    }

    fn finish_integer(&mut self, digits: &str, radix: Radix) -> Result<Token> {
        let suffix = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let (unsigned, long_count) = parse_int_suffix(&suffix)
            .ok_or_else(|| self.invalid_number(format!("invalid suffix '{}' on integer constant", suffix)))?;

        let value = u64::from_str_radix(digits, radix.base()).map_err(|_| Error::IntegerTooLarge {
            text: self.current_text(),
            span: self.make_span(),
        })?;

        Ok(self.make_token(TokenKind::IntLit(IntLiteral {
            value,
            radix,
            unsigned,
            long_count,
        })))
    }

    fn finish_float(&mut self) -> Result<Token> {
        let body = self.current_text();
        let suffix_text = self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let suffix = match suffix_text.as_str() {
            "" => FloatSuffix::None,
            "f" | "F" => FloatSuffix::Float,
            "l" | "L" => FloatSuffix::Long,
            other => {
                return Err(self.invalid_number(format!("invalid suffix '{}' on floating constant", other)));
            }
        };
        let value: f64 = body
            .parse()
            .map_err(|_| self.invalid_number("malformed floating constant"))?;

        Ok(self.make_token(TokenKind::FloatLit(FloatLiteral { value, suffix })))
    }

    /// Decode one escape sequence; the backslash is already consumed
    fn read_escape(&mut self) -> Option<char> {
        let c = self.advance()?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'v' => '\x0b',
            '\\' | '\'' | '"' | '?' => c,
            '0'..='7' => {
                let mut value = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.advance();
                        }
                        None => break,
                    }
                }
                char::from((value & 0xFF) as u8)
            }
            'x' => {
                let mut value: u32 = 0;
                while let Some(d) = self.peek().and_then(|d| d.to_digit(16)) {
                    value = value.wrapping_mul(16).wrapping_add(d);
                    self.advance();
                }
                char::from((value & 0xFF) as u8)
            }
            // Unknown escapes keep the character itself
            other => other,
        };
        Some(decoded)
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Error::UnterminatedString { span: self.make_span() });
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        // Line continuation inside the literal
                        Some('\n') => {
                            self.advance();
                        }
                        None => return Err(Error::UnterminatedString { span: self.make_span() }),
                        Some(_) => {
                            if let Some(c) = self.read_escape() {
                                value.push(c);
                            }
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::StringLit(value)))
    }

    /// Read a character literal; the value is that of the first character
    fn read_char(&mut self) -> Result<Token> {
        self.advance(); // opening quote
        let mut value: Option<i64> = None;

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Error::UnterminatedChar { span: self.make_span() });
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let c = self
                        .read_escape()
                        .ok_or_else(|| Error::UnterminatedChar { span: self.make_span() })?;
                    value.get_or_insert(c as i64);
                }
                Some(c) => {
                    self.advance();
                    value.get_or_insert(c as i64);
                }
            }
        }

        match value {
            Some(v) => Ok(self.make_token(TokenKind::CharLit(v))),
            None => Err(Error::EmptyCharLiteral { span: self.make_span() }),
        }
    }

    /// Check whether `text` appears at the cursor
    fn matches_at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.source.get(self.pos + i) == Some(&c))
    }

    fn read_punctuator(&mut self) -> Result<Token> {
        for (text, kind) in PUNCTUATORS.iter() {
            if self.matches_at(text) {
                for _ in 0..text.len() {
                    self.advance();
                }
                return Ok(self.make_token(kind.clone()));
            }
        }

        let ch = self.advance().unwrap_or('\0');
        Err(Error::UnknownCharacter { ch, span: self.make_span() })
    }

    fn scan(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        self.begin_token();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::eof(self.make_span())),
        };
        self.at_line_start = false;

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_next().map_or(false, |d| d.is_ascii_digit())) {
            return self.read_number();
        }
        match c {
            '"' => self.read_string(),
            '\'' => self.read_char(),
            _ => self.read_punctuator(),
        }
    }

    /// Get the next token. After a lexical error the same error token is
    /// returned on every call and the cursor no longer moves.
    pub fn next_token(&mut self) -> Token {
        if let Some(err) = &self.failure {
            return error_token(err);
        }

        match self.scan() {
            Ok(token) => {
                trace!("token {:?} '{}' at {}", token.kind, token.text, token.span);
                token
            }
            Err(err) => {
                debug!("lexical error: {}", err.render());
                let token = error_token(&err);
                self.failure = Some(err);
                token
            }
        }
    }

    /// Tokenize the entire source. The final token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            if let Some(err) = &self.failure {
                return Err(err.clone());
            }
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        debug!("lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    /// True once the whole input has been consumed
    pub fn is_finished(&self) -> bool {
        self.is_at_end() || self.failure.is_some()
    }
}

fn error_token(err: &Error) -> Token {
    Token::new(TokenKind::Error, err.to_string(), err.span().unwrap_or_default())
}

/// Accepts any order of one `u`/`U` and one `l`, `L`, `ll` or `LL`
fn parse_int_suffix(suffix: &str) -> Option<(bool, u8)> {
    let chars: Vec<char> = suffix.chars().collect();
    let mut unsigned = false;
    let mut long_count = 0u8;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            'u' | 'U' if !unsigned => {
                unsigned = true;
                i += 1;
            }
            'l' | 'L' if long_count == 0 => {
                if chars.get(i + 1) == Some(&chars[i]) {
                    long_count = 2;
                    i += 2;
                } else {
                    long_count = 1;
                    i += 1;
                }
            }
            _ => return None,
        }
    }
    Some((unsigned, long_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::KEYWORDS;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().expect("lexing failed")
    }

    fn int_lit(token: &Token) -> IntLiteral {
        match &token.kind {
            TokenKind::IntLit(lit) => *lit,
            other => panic!("expected integer literal, got {:?}", other),
        }
    }

    #[test]
    fn test_every_keyword_lexes_as_keyword() {
        for (text, kind) in KEYWORDS.iter() {
            let tokens = lex(text);
            assert_eq!(tokens.len(), 2, "keyword {}", text);
            assert_eq!(&tokens[0].kind, kind);
        }
    }

    #[test]
    fn test_identifier_keeps_text() {
        let tokens = lex("counter_2 _Boolean");
        assert_eq!(tokens[0].kind, TokenKind::Ident("counter_2".to_string()));
        assert_eq!(tokens[0].text, "counter_2");
        assert_eq!(tokens[1].kind, TokenKind::Ident("_Boolean".to_string()));
    }

    #[test]
    fn test_decimal_and_hex_integers() {
        let tokens = lex("123 0x1A 0 017");
        let dec = int_lit(&tokens[0]);
        assert_eq!(dec.value, 123);
        assert_eq!(dec.radix, Radix::Decimal);
        assert!(!dec.has_suffix());

        let hex = int_lit(&tokens[1]);
        assert_eq!(hex.value, 26);
        assert_eq!(hex.radix, Radix::Hex);

        assert_eq!(int_lit(&tokens[2]).radix, Radix::Decimal);
        let oct = int_lit(&tokens[3]);
        assert_eq!(oct.value, 15);
        assert_eq!(oct.radix, Radix::Octal);
    }

    #[test]
    fn test_integer_suffixes() {
        let tokens = lex("1u 2L 3ULL 4llu 5lu");
        assert_eq!((int_lit(&tokens[0]).unsigned, int_lit(&tokens[0]).long_count), (true, 0));
        assert_eq!((int_lit(&tokens[1]).unsigned, int_lit(&tokens[1]).long_count), (false, 1));
        assert_eq!((int_lit(&tokens[2]).unsigned, int_lit(&tokens[2]).long_count), (true, 2));
        assert_eq!((int_lit(&tokens[3]).unsigned, int_lit(&tokens[3]).long_count), (true, 2));
        assert_eq!((int_lit(&tokens[4]).unsigned, int_lit(&tokens[4]).long_count), (true, 1));
    }

    #[test]
    fn test_floats() {
        let tokens = lex("3.14 2.5e10 .5f 1e-3L");
        match &tokens[0].kind {
            TokenKind::FloatLit(lit) => {
                assert!((lit.value - 3.14).abs() < 1e-12);
                assert_eq!(lit.suffix, FloatSuffix::None);
            }
            other => panic!("expected float, got {:?}", other),
        }
        match &tokens[1].kind {
            TokenKind::FloatLit(lit) => {
                assert_eq!(lit.value, 2.5e10);
                assert_eq!(lit.suffix, FloatSuffix::None);
            }
            other => panic!("expected float, got {:?}", other),
        }
        assert!(matches!(tokens[2].kind, TokenKind::FloatLit(FloatLiteral { suffix: FloatSuffix::Float, .. })));
        assert!(matches!(tokens[3].kind, TokenKind::FloatLit(FloatLiteral { suffix: FloatSuffix::Long, .. })));
    }

    #[test]
    fn test_maximal_munch() {
        let kinds: Vec<TokenKind> = lex("a<<=b->c...").into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::ShlEq,
                TokenKind::Ident("b".to_string()),
                TokenKind::Arrow,
                TokenKind::Ident("c".to_string()),
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
        let kinds: Vec<TokenKind> = lex("x+++y").into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds[1], TokenKind::PlusPlus);
        assert_eq!(kinds[2], TokenKind::Plus);
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = lex("int a;\n  /* note\n */ // tail\n\treturn");
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 5));
        assert_eq!((tokens[3].span.line, tokens[3].span.column), (4, 2));
        assert_eq!(tokens[3].kind, TokenKind::Return);
    }

    #[test]
    fn test_directives_are_skipped() {
        let tokens = lex("#include <stdio.h>\n#define TWO \\\n  2\nint x;");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].span.line, 4);

        // A '#' in the middle of a line is not a directive
        let mut lexer = Lexer::new("int x = a # b;");
        assert!(matches!(lexer.tokenize(), Err(Error::UnknownCharacter { ch: '#', .. })));
    }

    #[test]
    fn test_escapes() {
        let tokens = lex(r#""a\tb\x41\101\n" '\0' '\''"#);
        assert_eq!(tokens[0].kind, TokenKind::StringLit("a\tbAA\n".to_string()));
        assert_eq!(tokens[1].kind, TokenKind::CharLit(0));
        assert_eq!(tokens[2].kind, TokenKind::CharLit('\'' as i64));
    }

    #[test]
    fn test_unterminated_literals_are_errors() {
        assert!(matches!(Lexer::new("\"abc").tokenize(), Err(Error::UnterminatedString { .. })));
        assert!(matches!(Lexer::new("\"abc\ndef\"").tokenize(), Err(Error::UnterminatedString { .. })));
        assert!(matches!(Lexer::new("'a").tokenize(), Err(Error::UnterminatedChar { .. })));
        assert!(matches!(Lexer::new("''").tokenize(), Err(Error::EmptyCharLiteral { .. })));
        assert!(matches!(Lexer::new("/* open").tokenize(), Err(Error::UnterminatedComment { .. })));
    }

    #[test]
    fn test_error_is_sticky() {
        let mut lexer = Lexer::new("x @ y z");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident("x".to_string()));
        let first = lexer.next_token();
        assert_eq!(first.kind, TokenKind::Error);
        let second = lexer.next_token();
        assert_eq!(second, first);
        assert!(lexer.is_finished());
        assert!(matches!(lexer.error(), Some(Error::UnknownCharacter { ch: '@', .. })));
    }

    #[test]
    fn test_bad_numbers() {
        assert!(matches!(Lexer::new("09").tokenize(), Err(Error::InvalidNumber { .. })));
        assert!(matches!(Lexer::new("12abc").tokenize(), Err(Error::InvalidNumber { .. })));
        assert!(matches!(Lexer::new("1lL").tokenize(), Err(Error::InvalidNumber { .. })));
        assert!(matches!(Lexer::new("1e+").tokenize(), Err(Error::InvalidNumber { .. })));
        assert!(matches!(
            Lexer::new("99999999999999999999999").tokenize(),
            Err(Error::IntegerTooLarge { .. })
        ));
    }
}
