//! C99 front-end
//!
//! Lexer, recursive-descent parser and semantic analyzer. The output is a
//! type-checked AST plus an `Analysis` (resolved symbols, record layouts,
//! builtin calls and diagnostics) for a later code generator.

pub mod diagnostics;
pub mod frontend;
pub mod stdlib;
pub mod types;
pub mod utils;

use log::debug;

pub use diagnostics::{AnalysisReport, BuiltinCallReport, Diagnostic};
pub use frontend::ast::TranslationUnit;
pub use frontend::{Analysis, AnalyzerConfig, SemanticAnalyzer};
pub use utils::{Error, Result, Span};

use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::symbols::SymbolKind;

/// Lex and parse a source string
pub fn parse_source(source: &str) -> Result<TranslationUnit> {
    Parser::new(Lexer::new(source))?.parse_translation_unit()
}

/// Everything one run of the pipeline produced
#[derive(Debug)]
pub struct CheckOutcome {
    pub report: AnalysisReport,
    /// Present when lexing and parsing succeeded
    pub unit: Option<TranslationUnit>,
    /// Present when semantic analysis ran, even if it found errors
    pub analysis: Option<Analysis>,
}

/// Run lexer, parser and analyzer over `source` and collect a report.
/// Lexical and syntax errors stop the pipeline at their stage.
pub fn check_source(source: &str, file_name: &str, config: AnalyzerConfig) -> CheckOutcome {
    let mut report = AnalysisReport::new(file_name);

    debug!("lexing {}", file_name);
    let tokens = match Lexer::new(source).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            report.push(Diagnostic::from_error(&err));
            return CheckOutcome {
                report,
                unit: None,
                analysis: None,
            };
        }
    };
    report.stats.token_count = tokens.len();

    debug!("parsing {}", file_name);
    let unit = match Parser::from_tokens(tokens).parse_translation_unit() {
        Ok(unit) => unit,
        Err(err) => {
            report.push(Diagnostic::from_error(&err));
            return CheckOutcome {
                report,
                unit: None,
                analysis: None,
            };
        }
    };

    debug!("analyzing {}", file_name);
    let mut analyzer = SemanticAnalyzer::new(config);
    // Diagnostics carry the details; the summary error adds nothing
    let _ = analyzer.analyze(&unit);
    let analysis = analyzer.into_analysis();

    for diagnostic in &analysis.diagnostics {
        report.push(diagnostic.clone());
    }
    report.builtin_calls = analysis
        .builtin_calls
        .iter()
        .map(|call| BuiltinCallReport {
            name: call.name.clone(),
            id: call.id,
            line: call.span.line,
            column: call.span.column,
        })
        .collect();
    report.stats.global_count = analysis
        .globals
        .iter()
        .filter(|s| s.kind == SymbolKind::Variable)
        .count();
    report.stats.function_count = analysis.functions.len();
    report.stats.record_count = analysis.registry.len();

    CheckOutcome {
        report,
        unit: Some(unit),
        analysis: Some(analysis),
    }
}
