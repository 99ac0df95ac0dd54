//! Frontend module - Lexer, Parser, Semantic Analysis

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod parser_expr;
pub mod symbols;
pub mod semantic;
pub mod semantic_expr;

pub use semantic::{Analysis, AnalyzerConfig, BuiltinCall, FunctionInfo, SemanticAnalyzer};
