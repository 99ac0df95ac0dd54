//! Error handling for the C99 front-end

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexical Errors ====================

    #[error("unterminated comment")]
    UnterminatedComment { span: Span },

    #[error("unterminated string literal")]
    UnterminatedString { span: Span },

    #[error("unterminated character literal")]
    UnterminatedChar { span: Span },

    #[error("empty character literal")]
    EmptyCharLiteral { span: Span },

    #[error("invalid numeric literal '{text}': {reason}")]
    InvalidNumber { text: String, reason: String, span: Span },

    #[error("integer literal '{text}' is too large")]
    IntegerTooLarge { text: String, span: Span },

    #[error("unknown character '{ch}'")]
    UnknownCharacter { ch: char, span: Span },

    // ==================== Syntax Errors ====================

    #[error("expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected identifier, got {got}")]
    ExpectedIdent { got: String, span: Span },

    #[error("expected type name, got {got}")]
    ExpectedType { got: String, span: Span },

    #[error("expected expression, got {got}")]
    ExpectedExpr { got: String, span: Span },

    #[error("invalid type specifier: {message}")]
    InvalidTypeSpecifier { message: String, span: Span },

    #[error("unsupported construct: {feature}")]
    Unsupported { feature: String, span: Span },

    // ==================== Semantic Errors ====================

    #[error("undefined identifier '{name}'")]
    UndefinedIdentifier { name: String, span: Span },

    #[error("redeclaration of '{name}'")]
    Redeclaration { name: String, span: Span },

    #[error("redefinition of '{name}'")]
    Redefinition { name: String, span: Span },

    #[error("conflicting types for '{name}'")]
    ConflictingTypes { name: String, span: Span },

    #[error("unknown type name '{name}'")]
    UnknownTypeName { name: String, span: Span },

    #[error("incompatible types: expected '{expected}', got '{got}'")]
    TypeMismatch {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("invalid operands to '{op}' ('{left}' and '{right}')")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    #[error("invalid operand to unary '{op}' ('{operand}')")]
    InvalidUnaryOperand { op: String, operand: String, span: Span },

    #[error("wrong number of arguments to '{name}': expected {expected}, got {got}")]
    ArgCountMismatch {
        name: String,
        expected: String,
        got: usize,
        span: Span,
    },

    #[error("argument {index} of '{name}': expected '{expected}', got '{got}'")]
    ArgTypeMismatch {
        name: String,
        index: usize,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("called object of type '{ty}' is not a function")]
    NotCallable { ty: String, span: Span },

    #[error("expression is not assignable (not an lvalue)")]
    NotAnLvalue { span: Span },

    #[error("assignment to read-only location of type '{ty}'")]
    ReadOnlyAssignment { ty: String, span: Span },

    #[error("member access on non-record type '{ty}'")]
    NotARecord { ty: String, span: Span },

    #[error("no member named '{member}' in '{ty}'")]
    UnknownMember { member: String, ty: String, span: Span },

    #[error("duplicate member '{member}'")]
    DuplicateMember { member: String, span: Span },

    #[error("incomplete type '{ty}'")]
    IncompleteType { ty: String, span: Span },

    #[error("invalid cast from '{from}' to '{to}'")]
    InvalidCast { from: String, to: String, span: Span },

    #[error("subscripted value of type '{ty}' is not an array or pointer")]
    NotIndexable { ty: String, span: Span },

    #[error("condition has non-scalar type '{ty}'")]
    NonScalarCondition { ty: String, span: Span },

    #[error("'break' statement not in loop or switch")]
    BreakOutsideLoop { span: Span },

    #[error("'continue' statement not in loop")]
    ContinueOutsideLoop { span: Span },

    #[error("'case' label not within a switch statement")]
    CaseOutsideSwitch { span: Span },

    #[error("'default' label not within a switch statement")]
    DefaultOutsideSwitch { span: Span },

    #[error("multiple default labels in one switch")]
    DuplicateDefault { span: Span },

    #[error("duplicate case value {value}")]
    DuplicateCase { value: i64, span: Span },

    #[error("expression is not an integer constant")]
    NotIntegerConstant { span: Span },

    #[error("switch quantity has non-integer type '{ty}'")]
    NonIntegerSwitch { ty: String, span: Span },

    #[error("'return' with a value in function '{function}' returning void")]
    ReturnValueInVoid { function: String, span: Span },

    #[error("'return' without a value in function '{function}' returning '{ty}'")]
    MissingReturnValue { function: String, ty: String, span: Span },

    #[error("empty label name")]
    EmptyLabel { span: Span },

    #[error("label '{name}' used but not defined")]
    UndefinedLabel { name: String, span: Span },

    #[error("duplicate label '{name}'")]
    DuplicateLabel { name: String, span: Span },

    #[error("invalid array size: {reason}")]
    InvalidArraySize { reason: String, span: Span },

    #[error("invalid initializer: {reason}")]
    InvalidInitializer { reason: String, span: Span },

    #[error("parameter name omitted in definition of '{function}'")]
    UnnamedParameter { function: String, span: Span },

    #[error("variable '{name}' declared void")]
    VoidVariable { name: String, span: Span },

    #[error("invalid declaration: {message}")]
    InvalidDeclaration { message: String, span: Span },

    // ==================== Analysis Summary ====================

    #[error("semantic analysis failed with {errors} error(s), {warnings} warning(s): {message}")]
    AnalysisFailed {
        errors: usize,
        warnings: usize,
        message: String,
    },
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnterminatedComment { span }
            | Self::UnterminatedString { span }
            | Self::UnterminatedChar { span }
            | Self::EmptyCharLiteral { span }
            | Self::InvalidNumber { span, .. }
            | Self::IntegerTooLarge { span, .. }
            | Self::UnknownCharacter { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::ExpectedIdent { span, .. }
            | Self::ExpectedType { span, .. }
            | Self::ExpectedExpr { span, .. }
            | Self::InvalidTypeSpecifier { span, .. }
            | Self::Unsupported { span, .. }
            | Self::UndefinedIdentifier { span, .. }
            | Self::Redeclaration { span, .. }
            | Self::Redefinition { span, .. }
            | Self::ConflictingTypes { span, .. }
            | Self::UnknownTypeName { span, .. }
            | Self::TypeMismatch { span, .. }
            | Self::InvalidOperands { span, .. }
            | Self::InvalidUnaryOperand { span, .. }
            | Self::ArgCountMismatch { span, .. }
            | Self::ArgTypeMismatch { span, .. }
            | Self::NotCallable { span, .. }
            | Self::NotAnLvalue { span }
            | Self::ReadOnlyAssignment { span, .. }
            | Self::NotARecord { span, .. }
            | Self::UnknownMember { span, .. }
            | Self::DuplicateMember { span, .. }
            | Self::IncompleteType { span, .. }
            | Self::InvalidCast { span, .. }
            | Self::NotIndexable { span, .. }
            | Self::NonScalarCondition { span, .. }
            | Self::BreakOutsideLoop { span }
            | Self::ContinueOutsideLoop { span }
            | Self::CaseOutsideSwitch { span }
            | Self::DefaultOutsideSwitch { span }
            | Self::DuplicateDefault { span }
            | Self::DuplicateCase { span, .. }
            | Self::NotIntegerConstant { span }
            | Self::NonIntegerSwitch { span, .. }
            | Self::ReturnValueInVoid { span, .. }
            | Self::MissingReturnValue { span, .. }
            | Self::EmptyLabel { span }
            | Self::UndefinedLabel { span, .. }
            | Self::DuplicateLabel { span, .. }
            | Self::InvalidArraySize { span, .. }
            | Self::InvalidInitializer { span, .. }
            | Self::UnnamedParameter { span, .. }
            | Self::VoidVariable { span, .. }
            | Self::InvalidDeclaration { span, .. } => Some(*span),
            Self::AnalysisFailed { .. } => None,
        }
    }

    /// Whether this error was raised by the lexer
    pub fn is_lexical(&self) -> bool {
        matches!(
            self,
            Self::UnterminatedComment { .. }
                | Self::UnterminatedString { .. }
                | Self::UnterminatedChar { .. }
                | Self::EmptyCharLiteral { .. }
                | Self::InvalidNumber { .. }
                | Self::IntegerTooLarge { .. }
                | Self::UnknownCharacter { .. }
        )
    }

    /// Whether this error was raised by the parser
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedToken { .. }
                | Self::ExpectedIdent { .. }
                | Self::ExpectedType { .. }
                | Self::ExpectedExpr { .. }
                | Self::InvalidTypeSpecifier { .. }
                | Self::Unsupported { .. }
        )
    }

    /// Render as `line:col: error: message`
    pub fn render(&self) -> String {
        match self.span() {
            Some(span) => format!("{}: error: {}", span, self),
            None => format!("error: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_position() {
        let err = Error::UndefinedIdentifier {
            name: "x".to_string(),
            span: Span::new(0, 1, 3, 7),
        };
        assert_eq!(err.render(), "3:7: error: undefined identifier 'x'");
        assert!(!err.is_lexical());
    }

    #[test]
    fn test_summary_has_no_span() {
        let err = Error::AnalysisFailed {
            errors: 2,
            warnings: 0,
            message: "boom".to_string(),
        };
        assert_eq!(err.span(), None);
        assert_eq!(err.render(), "error: semantic analysis failed with 2 error(s), 0 warning(s): boom");
    }

    #[test]
    fn test_stage_classification() {
        let span = Span::new(0, 1, 1, 1);
        let parser_side = Error::InvalidTypeSpecifier {
            message: "both 'float' and 'double'".to_string(),
            span,
        };
        assert!(parser_side.is_syntax());

        let analyzer_side = Error::InvalidDeclaration {
            message: "storage class 'auto' at file scope".to_string(),
            span,
        };
        assert!(!analyzer_side.is_syntax());
        assert!(!analyzer_side.is_lexical());
    }
}
