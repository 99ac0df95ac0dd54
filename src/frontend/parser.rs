//! Parser for C99
//!
//! Recursive descent over a pre-lexed token vector with one token of
//! lookahead. Declarations are parsed declarator-first: the specifiers and
//! the first declarator decide between a function definition and a
//! declaration list, so no backtracking is needed. Expression parsing lives
//! in `parser_expr`.

use std::collections::HashMap;

use log::debug;

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::types::Qualifiers;
use crate::utils::{Error, Result, Span};

/// The parser
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    /// Scoped typedef-name set. `true` marks a typedef name, `false` an
    /// ordinary identifier shadowing an outer typedef.
    typedef_scopes: Vec<HashMap<String, bool>>,
}

/// Declaration specifiers shared by every declarator of one declaration
#[derive(Debug, Clone)]
pub(super) struct DeclSpecs {
    pub storage: Option<StorageClass>,
    pub is_inline: bool,
    pub ty: TypeExpr,
}

/// One declarator, kept in source order until it is applied to a base type
#[derive(Debug)]
struct Declarator {
    name: Option<Ident>,
    /// Qualifiers of each `*`, outermost first
    pointers: Vec<(Qualifiers, Span)>,
    suffixes: Vec<DeclSuffix>,
    /// Parenthesized inner declarator: `(*fp)`
    nested: Option<Box<Declarator>>,
}

#[derive(Debug)]
enum DeclSuffix {
    Array {
        size: Option<Box<Expr>>,
        vla: bool,
        span: Span,
    },
    Function {
        params: Vec<Param>,
        variadic: bool,
        prototyped: bool,
        span: Span,
    },
}

/// Type specifier keywords seen so far, validated once the specifier list ends
#[derive(Debug, Default)]
struct SpecifierCounts {
    void: u8,
    bool_: u8,
    char_: u8,
    short: u8,
    int: u8,
    long: u8,
    float: u8,
    double: u8,
    signed: u8,
    unsigned: u8,
}

impl SpecifierCounts {
    fn total(&self) -> u8 {
        self.void
            + self.bool_
            + self.char_
            + self.short
            + self.int
            + self.long
            + self.float
            + self.double
            + self.signed
            + self.unsigned
    }

    fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Fold the multiset into one base type
    fn resolve(&self) -> std::result::Result<BaseType, String> {
        if self.signed > 0 && self.unsigned > 0 {
            return Err("both 'signed' and 'unsigned' in declaration specifiers".to_string());
        }
        let singles = [
            (self.void, "void"),
            (self.bool_, "_Bool"),
            (self.char_, "char"),
            (self.short, "short"),
            (self.int, "int"),
            (self.float, "float"),
            (self.double, "double"),
            (self.signed, "signed"),
            (self.unsigned, "unsigned"),
        ];
        if let Some((_, name)) = singles.iter().find(|(count, _)| *count > 1) {
            return Err(format!("duplicate '{}'", name));
        }
        if self.long > 2 {
            return Err("'long long long' is too long".to_string());
        }

        let total = self.total();
        let sign = self.signed + self.unsigned;
        let unsigned = self.unsigned > 0;
        let invalid = || Err("invalid combination of type specifiers".to_string());

        if self.void > 0 {
            return if total == 1 { Ok(BaseType::Void) } else { invalid() };
        }
        if self.bool_ > 0 {
            return if total == 1 { Ok(BaseType::Bool) } else { invalid() };
        }
        if self.float > 0 {
            return if total == 1 { Ok(BaseType::Float) } else { invalid() };
        }
        if self.double > 0 {
            return match (self.long, total) {
                (0, 1) => Ok(BaseType::Double),
                (1, 2) => Ok(BaseType::LongDouble),
                _ => invalid(),
            };
        }
        if self.char_ > 0 {
            if total != 1 + sign {
                return invalid();
            }
            return Ok(match (self.signed > 0, unsigned) {
                (true, _) => BaseType::SChar,
                (_, true) => BaseType::UChar,
                _ => BaseType::Char,
            });
        }
        if self.short > 0 {
            if self.long > 0 {
                return invalid();
            }
            return Ok(if unsigned { BaseType::UShort } else { BaseType::Short });
        }
        match (self.long, unsigned) {
            (0, false) => Ok(BaseType::Int),
            (0, true) => Ok(BaseType::UInt),
            (1, false) => Ok(BaseType::Long),
            (1, true) => Ok(BaseType::ULong),
            (_, false) => Ok(BaseType::LongLong),
            (_, true) => Ok(BaseType::ULongLong),
        }
    }
}

impl Parser {
    /// Create a new parser from a lexer. Lexical errors surface here.
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let tokens = lexer.tokenize()?;
        Ok(Self::from_tokens(tokens))
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::eof(span));
        }
        Self {
            tokens,
            pos: 0,
            typedef_scopes: vec![HashMap::new()],
        }
    }

    // ==================== Helper Methods ====================

    pub(super) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(super) fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    pub(super) fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Span of the most recently consumed token
    pub(super) fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    pub(super) fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("'{}'", expected),
                got: self.current_kind().describe(),
                span: self.current().span,
            })
        }
    }

    pub(super) fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident::new(name, token.span))
            }
            other => Err(Error::ExpectedIdent {
                got: other.describe(),
                span: token.span,
            }),
        }
    }

    // ==================== Typedef-Name Set ====================

    fn push_scope(&mut self) {
        self.typedef_scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        if self.typedef_scopes.len() > 1 {
            self.typedef_scopes.pop();
        }
    }

    fn declare_name(&mut self, name: &str, is_typedef: bool) {
        if let Some(scope) = self.typedef_scopes.last_mut() {
            scope.insert(name.to_string(), is_typedef);
        }
    }

    /// Whether `name` currently denotes a typedef
    pub fn is_typedef_name(&self, name: &str) -> bool {
        self.typedef_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
            .unwrap_or(false)
    }

    /// Whether `kind` can begin a type name (cast, sizeof, parameter)
    pub(super) fn starts_type_name(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Ident(name) => self.is_typedef_name(name),
            other => other.is_type_name_keyword(),
        }
    }

    /// Whether `kind` can begin a declaration
    fn starts_declaration(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Ident(name) => self.is_typedef_name(name),
            other => other.is_declaration_keyword(),
        }
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete translation unit
    pub fn parse_translation_unit(&mut self) -> Result<TranslationUnit> {
        let mut decls = Vec::new();

        while !self.is_at_end() {
            // Stray semicolons at file scope
            if self.consume(&TokenKind::Semicolon) {
                continue;
            }
            decls.extend(self.parse_declaration(true)?);
        }

        debug!("parsed {} external declarations", decls.len());
        Ok(TranslationUnit { decls })
    }

    /// Parse one declaration: a function definition (file scope only), a
    /// declaration list, a typedef, or a bare struct/union/enum
    fn parse_declaration(&mut self, at_file_scope: bool) -> Result<Vec<Declaration>> {
        let start = self.current().span;
        let specs = self.parse_decl_specifiers(true)?;

        if self.consume(&TokenKind::Semicolon) {
            return Ok(match specs.ty.kind {
                TypeExprKind::Record(spec) => vec![Declaration::Record(spec)],
                TypeExprKind::Enum(spec) => vec![Declaration::Enum(spec)],
                _ => Vec::new(),
            });
        }

        let mut decls = Vec::new();
        loop {
            let declarator = self.parse_declarator(false)?;
            let (name, ty) = apply_declarator(specs.ty.clone(), declarator);
            let name = match name {
                Some(name) => name,
                None => {
                    return Err(Error::ExpectedIdent {
                        got: self.current_kind().describe(),
                        span: self.current().span,
                    })
                }
            };

            if specs.storage == Some(StorageClass::Typedef) {
                self.declare_name(&name.name, true);
                decls.push(Declaration::Typedef(TypedefDecl {
                    span: start.merge(&name.span),
                    name,
                    ty,
                }));
            } else if ty.is_function() {
                self.declare_name(&name.name, false);
                if at_file_scope && decls.is_empty() && self.check(&TokenKind::LBrace) {
                    let body = self.parse_function_body(&ty)?;
                    decls.push(Declaration::Function(FunctionDecl {
                        span: start.merge(&body.span),
                        name,
                        ty,
                        storage: specs.storage,
                        is_inline: specs.is_inline,
                        body: Some(body),
                    }));
                    return Ok(decls);
                }
                decls.push(Declaration::Function(FunctionDecl {
                    span: start.merge(&self.prev_span()),
                    name,
                    ty,
                    storage: specs.storage,
                    is_inline: specs.is_inline,
                    body: None,
                }));
            } else {
                self.declare_name(&name.name, false);
                let init = if self.consume(&TokenKind::Eq) {
                    Some(self.parse_initializer()?)
                } else {
                    None
                };
                decls.push(Declaration::Variable(VarDecl {
                    span: start.merge(&self.prev_span()),
                    name,
                    ty,
                    storage: specs.storage,
                    init,
                }));
            }

            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::Semicolon)?;
        Ok(decls)
    }

    /// Parameters are visible in the body, shadowing outer typedef names
    fn parse_function_body(&mut self, ty: &TypeExpr) -> Result<Block> {
        self.push_scope();
        if let TypeExprKind::Function { params, .. } = &ty.kind {
            for param in params {
                if let Some(name) = &param.name {
                    self.declare_name(&name.name, false);
                }
            }
        }
        let body = self.parse_block();
        self.pop_scope();
        body
    }

    /// Parse declaration specifiers: storage class, qualifiers, `inline`
    /// and the type specifier multiset
    pub(super) fn parse_decl_specifiers(&mut self, allow_storage: bool) -> Result<DeclSpecs> {
        let start = self.current().span;
        let mut storage = None;
        let mut is_inline = false;
        let mut quals = Qualifiers::default();
        let mut counts = SpecifierCounts::default();
        let mut named: Option<TypeExprKind> = None;

        loop {
            let token = self.current().clone();
            let class = match &token.kind {
                TokenKind::Auto => Some(StorageClass::Auto),
                TokenKind::Register => Some(StorageClass::Register),
                TokenKind::Static => Some(StorageClass::Static),
                TokenKind::Extern => Some(StorageClass::Extern),
                TokenKind::Typedef => Some(StorageClass::Typedef),
                _ => None,
            };
            if let Some(class) = class {
                if !allow_storage {
                    return Err(Error::InvalidTypeSpecifier {
                        message: format!("storage class '{}' not allowed here", token.kind),
                        span: token.span,
                    });
                }
                if storage.is_some() {
                    return Err(Error::InvalidTypeSpecifier {
                        message: "multiple storage classes in declaration specifiers".to_string(),
                        span: token.span,
                    });
                }
                storage = Some(class);
                self.advance();
                continue;
            }

            match &token.kind {
                TokenKind::Inline => is_inline = true,
                TokenKind::Const => quals.is_const = true,
                TokenKind::Volatile => quals.is_volatile = true,
                TokenKind::Restrict => quals.is_restrict = true,
                TokenKind::Void => counts.void += 1,
                TokenKind::Bool => counts.bool_ += 1,
                TokenKind::Char => counts.char_ += 1,
                TokenKind::Short => counts.short += 1,
                TokenKind::Int => counts.int += 1,
                TokenKind::Long => counts.long += 1,
                TokenKind::Float => counts.float += 1,
                TokenKind::Double => counts.double += 1,
                TokenKind::Signed => counts.signed += 1,
                TokenKind::Unsigned => counts.unsigned += 1,
                TokenKind::Complex | TokenKind::Imaginary => {
                    return Err(Error::Unsupported {
                        feature: format!("'{}' types", token.kind),
                        span: token.span,
                    });
                }
                TokenKind::Struct | TokenKind::Union | TokenKind::Enum => {
                    if named.is_some() || !counts.is_empty() {
                        return Err(Error::InvalidTypeSpecifier {
                            message: "two or more data types in declaration specifiers".to_string(),
                            span: token.span,
                        });
                    }
                    named = Some(if token.kind == TokenKind::Enum {
                        TypeExprKind::Enum(self.parse_enum_spec()?)
                    } else {
                        TypeExprKind::Record(self.parse_record_spec()?)
                    });
                    continue;
                }
                TokenKind::Ident(name)
                    if named.is_none() && counts.is_empty() && self.is_typedef_name(name) =>
                {
                    named = Some(TypeExprKind::Typedef(name.clone()));
                }
                _ => break,
            }
            self.advance();
        }

        let span = start.merge(&self.prev_span());
        let kind = match named {
            Some(kind) => {
                if !counts.is_empty() {
                    return Err(Error::InvalidTypeSpecifier {
                        message: "two or more data types in declaration specifiers".to_string(),
                        span,
                    });
                }
                kind
            }
            None if counts.is_empty() => {
                return Err(Error::ExpectedType {
                    got: self.current_kind().describe(),
                    span: self.current().span,
                });
            }
            None => {
                let base = counts
                    .resolve()
                    .map_err(|message| Error::InvalidTypeSpecifier { message, span })?;
                TypeExprKind::Base(base)
            }
        };

        Ok(DeclSpecs {
            storage,
            is_inline,
            ty: TypeExpr { kind, quals, span },
        })
    }

    /// Parse `struct`/`union` [tag] [{ members }]
    fn parse_record_spec(&mut self) -> Result<RecordSpec> {
        let start = self.advance();
        let kind = if start.kind == TokenKind::Union {
            RecordKind::Union
        } else {
            RecordKind::Struct
        };

        let tag = if matches!(self.current_kind(), TokenKind::Ident(_)) {
            Some(self.parse_ident()?)
        } else {
            None
        };

        let members = if self.consume(&TokenKind::LBrace) {
            let mut members = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                members.extend(self.parse_member_declaration()?);
            }
            self.expect(TokenKind::RBrace)?;
            Some(members)
        } else {
            None
        };

        if tag.is_none() && members.is_none() {
            return Err(Error::ExpectedIdent {
                got: self.current_kind().describe(),
                span: self.current().span,
            });
        }

        Ok(RecordSpec {
            kind,
            tag,
            members,
            span: start.span.merge(&self.prev_span()),
        })
    }

    /// A member declaration is parsed like a variable declaration list
    fn parse_member_declaration(&mut self) -> Result<Vec<Member>> {
        let start = self.current().span;
        let specs = self.parse_decl_specifiers(false)?;
        let mut members = Vec::new();

        loop {
            if self.check(&TokenKind::Colon) {
                return Err(Error::Unsupported {
                    feature: "bit-field members".to_string(),
                    span: self.current().span,
                });
            }
            let declarator = self.parse_declarator(false)?;
            let (name, ty) = apply_declarator(specs.ty.clone(), declarator);
            if let Some(name) = name {
                if self.check(&TokenKind::Colon) {
                    return Err(Error::Unsupported {
                        feature: "bit-field members".to_string(),
                        span: self.current().span,
                    });
                }
                members.push(Member {
                    span: start.merge(&self.prev_span()),
                    name,
                    ty,
                });
            }
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::Semicolon)?;
        Ok(members)
    }

    /// Parse `enum` [tag] [{ A, B = expr, ... }]
    fn parse_enum_spec(&mut self) -> Result<EnumSpec> {
        let start = self.expect(TokenKind::Enum)?;

        let tag = if matches!(self.current_kind(), TokenKind::Ident(_)) {
            Some(self.parse_ident()?)
        } else {
            None
        };

        let enumerators = if self.consume(&TokenKind::LBrace) {
            let mut enumerators = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                let name = self.parse_ident()?;
                let value = if self.consume(&TokenKind::Eq) {
                    Some(self.parse_conditional()?)
                } else {
                    None
                };
                self.declare_name(&name.name, false);
                enumerators.push(Enumerator {
                    span: name.span.merge(&self.prev_span()),
                    name,
                    value,
                });
                if !self.consume(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace)?;
            Some(enumerators)
        } else {
            None
        };

        if tag.is_none() && enumerators.is_none() {
            return Err(Error::ExpectedIdent {
                got: self.current_kind().describe(),
                span: self.current().span,
            });
        }

        Ok(EnumSpec {
            tag,
            enumerators,
            span: start.span.merge(&self.prev_span()),
        })
    }

    // ==================== Declarators ====================

    /// Parse a declarator. With `allow_abstract` the name may be omitted
    /// (type names and prototype parameters).
    fn parse_declarator(&mut self, allow_abstract: bool) -> Result<Declarator> {
        let mut pointers = Vec::new();
        while self.check(&TokenKind::Star) {
            let star = self.advance();
            let mut quals = Qualifiers::default();
            loop {
                match self.current_kind() {
                    TokenKind::Const => quals.is_const = true,
                    TokenKind::Volatile => quals.is_volatile = true,
                    TokenKind::Restrict => quals.is_restrict = true,
                    _ => break,
                }
                self.advance();
            }
            pointers.push((quals, star.span));
        }

        let mut name = None;
        let mut nested = None;
        match self.current_kind() {
            TokenKind::Ident(_) => name = Some(self.parse_ident()?),
            TokenKind::LParen if self.starts_nested_declarator(allow_abstract) => {
                self.advance();
                nested = Some(Box::new(self.parse_declarator(allow_abstract)?));
                self.expect(TokenKind::RParen)?;
            }
            _ => {}
        }

        let mut suffixes = Vec::new();
        loop {
            if self.check(&TokenKind::LBracket) {
                suffixes.push(self.parse_array_suffix()?);
            } else if self.check(&TokenKind::LParen) {
                suffixes.push(self.parse_function_suffix()?);
            } else {
                break;
            }
        }

        if !allow_abstract && name.is_none() && nested.is_none() {
            return Err(Error::ExpectedIdent {
                got: self.current_kind().describe(),
                span: self.current().span,
            });
        }

        Ok(Declarator {
            name,
            pointers,
            suffixes,
            nested,
        })
    }

    /// `(` opens a nested declarator unless, in an abstract declarator, it
    /// opens a parameter list: `int (*)(int)` vs `int (int)`
    fn starts_nested_declarator(&self, allow_abstract: bool) -> bool {
        if !allow_abstract {
            return true;
        }
        match self.peek_kind() {
            Some(TokenKind::Star) | Some(TokenKind::LParen) | Some(TokenKind::LBracket) => true,
            Some(TokenKind::Ident(name)) => !self.is_typedef_name(name),
            _ => false,
        }
    }

    fn parse_array_suffix(&mut self) -> Result<DeclSuffix> {
        let start = self.expect(TokenKind::LBracket)?;
        // Parameter array qualifiers: `int a[static const 4]`
        while matches!(
            self.current_kind(),
            TokenKind::Static | TokenKind::Const | TokenKind::Volatile | TokenKind::Restrict
        ) {
            self.advance();
        }

        let (size, vla) = if self.check(&TokenKind::RBracket) {
            (None, false)
        } else if self.check(&TokenKind::Star) && self.peek_kind() == Some(&TokenKind::RBracket) {
            self.advance();
            (None, true)
        } else {
            let size = self.parse_assignment()?;
            let vla = !size.is_syntactic_constant();
            (Some(Box::new(size)), vla)
        };

        self.expect(TokenKind::RBracket)?;
        Ok(DeclSuffix::Array {
            size,
            vla,
            span: start.span.merge(&self.prev_span()),
        })
    }

    fn parse_function_suffix(&mut self) -> Result<DeclSuffix> {
        let start = self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        let mut variadic = false;
        let mut prototyped = true;

        if self.check(&TokenKind::RParen) {
            prototyped = false;
        } else if self.check(&TokenKind::Void) && self.peek_kind() == Some(&TokenKind::RParen) {
            self.advance();
        } else {
            // Parameter names live in a prototype scope
            self.push_scope();
            let result = self.parse_param_list(&mut params, &mut variadic);
            self.pop_scope();
            result?;
        }

        self.expect(TokenKind::RParen)?;
        Ok(DeclSuffix::Function {
            params,
            variadic,
            prototyped,
            span: start.span.merge(&self.prev_span()),
        })
    }

    fn parse_param_list(&mut self, params: &mut Vec<Param>, variadic: &mut bool) -> Result<()> {
        loop {
            if self.consume(&TokenKind::Ellipsis) {
                *variadic = true;
                return Ok(());
            }
            let start = self.current().span;
            let specs = self.parse_decl_specifiers(true)?;
            if matches!(
                specs.storage,
                Some(StorageClass::Auto | StorageClass::Static | StorageClass::Extern | StorageClass::Typedef)
            ) {
                return Err(Error::InvalidTypeSpecifier {
                    message: "invalid storage class for parameter".to_string(),
                    span: start,
                });
            }
            let declarator = self.parse_declarator(true)?;
            let (name, ty) = apply_declarator(specs.ty, declarator);
            if let Some(name) = &name {
                self.declare_name(&name.name, false);
            }
            params.push(Param {
                name,
                ty,
                span: start.merge(&self.prev_span()),
            });
            if !self.consume(&TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    /// Parse a type name: specifiers plus an abstract declarator
    pub(super) fn parse_type_name(&mut self) -> Result<TypeExpr> {
        let specs = self.parse_decl_specifiers(false)?;
        let declarator = self.parse_declarator(true)?;
        let (name, ty) = apply_declarator(specs.ty, declarator);
        if let Some(name) = name {
            return Err(Error::UnexpectedToken {
                expected: "')'".to_string(),
                got: format!("identifier '{}'", name.name),
                span: name.span,
            });
        }
        Ok(ty)
    }

    /// Parse an initializer: an assignment expression or a brace list
    pub(super) fn parse_initializer(&mut self) -> Result<Initializer> {
        if !self.check(&TokenKind::LBrace) {
            return Ok(Initializer::Expr(self.parse_assignment()?));
        }

        let start = self.advance();
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if matches!(self.current_kind(), TokenKind::Dot | TokenKind::LBracket) {
                return Err(Error::Unsupported {
                    feature: "designated initializers".to_string(),
                    span: self.current().span,
                });
            }
            items.push(self.parse_initializer()?);
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Initializer::List {
            items,
            span: start.span.merge(&self.prev_span()),
        })
    }

    // ==================== Statements ====================

    /// Parse a compound statement; it opens a typedef-name scope
    pub(super) fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LBrace)?;
        self.push_scope();
        let stmts = self.parse_block_items();
        self.pop_scope();
        let stmts = stmts?;
        self.expect(TokenKind::RBrace)?;

        Ok(Block {
            stmts,
            span: start.span.merge(&self.prev_span()),
        })
    }

    fn parse_block_items(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.current().span;

        match self.current_kind().clone() {
            TokenKind::LBrace => Ok(Stmt::Compound(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty { span: start })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                let cond = self.parse_paren_expr()?;
                let body = self.parse_statement()?;
                Ok(Stmt::While {
                    span: start.merge(&body.span()),
                    cond,
                    body: Box::new(body),
                })
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_statement()?;
                self.expect(TokenKind::While)?;
                let cond = self.parse_paren_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::DoWhile {
                    body: Box::new(body),
                    cond,
                    span: start.merge(&self.prev_span()),
                })
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => {
                self.advance();
                let expr = self.parse_paren_expr()?;
                let body = self.parse_statement()?;
                Ok(Stmt::Switch {
                    span: start.merge(&body.span()),
                    expr,
                    body: Box::new(body),
                })
            }
            TokenKind::Case => {
                self.advance();
                let value = self.parse_conditional()?;
                self.expect(TokenKind::Colon)?;
                let body = self.parse_statement()?;
                Ok(Stmt::Case {
                    span: start.merge(&body.span()),
                    value,
                    body: Box::new(body),
                })
            }
            TokenKind::Default => {
                self.advance();
                self.expect(TokenKind::Colon)?;
                let body = self.parse_statement()?;
                Ok(Stmt::Default {
                    span: start.merge(&body.span()),
                    body: Box::new(body),
                })
            }
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break { span: start })
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue { span: start })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return {
                    value,
                    span: start.merge(&self.prev_span()),
                })
            }
            TokenKind::Goto => {
                self.advance();
                let label = self.parse_ident()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Goto {
                    label,
                    span: start.merge(&self.prev_span()),
                })
            }
            TokenKind::Ident(_) if self.peek_kind() == Some(&TokenKind::Colon) => {
                let label = self.parse_ident()?;
                self.advance(); // ':'
                let body = self.parse_statement()?;
                Ok(Stmt::Labeled {
                    span: start.merge(&body.span()),
                    label,
                    body: Box::new(body),
                })
            }
            kind if self.starts_declaration(&kind) => {
                let decls = self.parse_declaration(false)?;
                Ok(Stmt::Decl {
                    decls,
                    span: start.merge(&self.prev_span()),
                })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr {
                    expr,
                    span: start.merge(&self.prev_span()),
                })
            }
        }
    }

    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::If)?;
        let cond = self.parse_paren_expr()?;
        let then_branch = self.parse_statement()?;

        let else_branch = if self.consume(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        let end = else_branch
            .as_ref()
            .map(|s| s.span())
            .unwrap_or_else(|| then_branch.span());

        Ok(Stmt::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch,
            span: start.span.merge(&end),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        // A declaration in the init clause is scoped to the loop
        self.push_scope();
        let result = self.parse_for_rest(start.span);
        self.pop_scope();
        result
    }

    fn parse_for_rest(&mut self, start: Span) -> Result<Stmt> {
        let init = if self.consume(&TokenKind::Semicolon) {
            None
        } else if self.starts_declaration(&self.current_kind().clone()) {
            Some(ForInit::Decl(self.parse_declaration(false)?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            Some(ForInit::Expr(expr))
        };

        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_statement()?;
        Ok(Stmt::For {
            span: start.merge(&body.span()),
            init,
            cond,
            step,
            body: Box::new(body),
        })
    }
}

/// Build the declared type inside-out: pointers bind to the specifier type,
/// then suffixes apply right to left, then the parenthesized inner
/// declarator wraps the result
fn apply_declarator(base: TypeExpr, declarator: Declarator) -> (Option<Ident>, TypeExpr) {
    let Declarator {
        name,
        pointers,
        suffixes,
        nested,
    } = declarator;

    let mut ty = base;
    for (quals, span) in pointers {
        let span = ty.span.merge(&span);
        ty = TypeExpr {
            kind: TypeExprKind::Pointer(Box::new(ty)),
            quals,
            span,
        };
    }

    for suffix in suffixes.into_iter().rev() {
        ty = match suffix {
            DeclSuffix::Array { size, vla, span } => {
                let span = ty.span.merge(&span);
                TypeExpr::new(
                    TypeExprKind::Array {
                        elem: Box::new(ty),
                        size,
                        vla,
                    },
                    span,
                )
            }
            DeclSuffix::Function {
                params,
                variadic,
                prototyped,
                span,
            } => {
                let span = ty.span.merge(&span);
                TypeExpr::new(
                    TypeExprKind::Function {
                        ret: Box::new(ty),
                        params,
                        variadic,
                        prototyped,
                    },
                    span,
                )
            }
        };
    }

    match nested {
        Some(inner) => apply_declarator(ty, *inner),
        None => (name, ty),
    }
}
