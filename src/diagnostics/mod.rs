//! Structured diagnostics
//!
//! Machine-readable reports of a front-end run:
//! - one `Diagnostic` per error or warning, with line/column
//! - summary statistics for the translation unit

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::{Error, Span};

// ==================== Diagnostics ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lexical,
    Syntax,
    Semantic,
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    /// 1-based; 0 when the diagnostic has no position
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    /// Create an error diagnostic from a front-end error
    pub fn from_error(error: &Error) -> Self {
        let stage = if error.is_lexical() {
            Stage::Lexical
        } else if error.is_syntax() {
            Stage::Syntax
        } else {
            Stage::Semantic
        };
        let span = error.span().unwrap_or_default();
        Self {
            severity: Severity::Error,
            stage,
            message: error.to_string(),
            line: span.line,
            column: span.column,
        }
    }

    /// Create a semantic warning
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            stage: Stage::Semantic,
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    /// `line:col: severity: message`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}:{}: {}: {}", self.line, self.column, self.severity, self.message)
        }
    }
}

// ==================== Analysis Report ====================

/// A recorded call to a standard-library built-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinCallReport {
    pub name: String,
    pub id: u16,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub token_count: usize,
    pub global_count: usize,
    pub function_count: usize,
    pub record_count: usize,
}

/// Complete report of one front-end run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub success: bool,
    pub source_file: String,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub builtin_calls: Vec<BuiltinCallReport>,
    pub stats: ReportStats,
}

impl AnalysisReport {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            success: true,
            source_file: source_file.into(),
            errors: 0,
            warnings: 0,
            diagnostics: Vec::new(),
            builtin_calls: Vec::new(),
            stats: ReportStats::default(),
        }
    }

    /// Add a diagnostic and update the counters
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                self.errors += 1;
                self.success = false;
            }
            Severity::Warning => self.warnings += 1,
        }
        self.diagnostics.push(diagnostic);
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Serialize to compact JSON
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Plain text rendering, one diagnostic per line plus a summary
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            out.push_str(&format!("{}: {}\n", self.source_file, diagnostic));
        }
        out.push_str(&format!(
            "{}: {} error(s), {} warning(s)\n",
            self.source_file, self.errors, self.warnings
        ));
        out
    }
}
