//! End-to-end tests: source text through lexer, parser and analyzer

use c99_frontend::diagnostics::{Severity, Stage};
use c99_frontend::frontend::ast::{Declaration, Stmt, TypeExprKind};
use c99_frontend::types::CType;
use c99_frontend::{check_source, parse_source, AnalyzerConfig, CheckOutcome};
use pretty_assertions::assert_eq;

fn check(source: &str) -> CheckOutcome {
    check_source(source, "test.c", AnalyzerConfig::default())
}

fn error_messages(outcome: &CheckOutcome) -> Vec<String> {
    outcome
        .report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn test_add_function_end_to_end() {
    let source = "int add(int a, int b) { return a + b; }";

    let unit = parse_source(source).unwrap();
    assert_eq!(unit.decls.len(), 1);
    let func = match &unit.decls[0] {
        Declaration::Function(func) => func,
        other => panic!("expected a function, got {:?}", other),
    };
    assert_eq!(func.name.name, "add");
    assert_eq!(func.params().len(), 2);
    match &func.ty.kind {
        TypeExprKind::Function { params, .. } => {
            for param in params {
                assert!(matches!(param.ty.kind, TypeExprKind::Base(_)));
            }
        }
        other => panic!("expected a function type, got {:?}", other),
    }
    let body = func.body.as_ref().unwrap();
    assert_eq!(body.stmts.len(), 1);
    assert!(matches!(body.stmts[0], Stmt::Return { value: Some(_), .. }));

    let outcome = check(source);
    assert!(outcome.report.success);
    assert_eq!((outcome.report.errors, outcome.report.warnings), (0, 0));
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.function("add").unwrap().return_types, vec![CType::int()]);
    assert_eq!(outcome.report.stats.function_count, 1);
}

#[test]
fn test_typedef_names_in_casts_and_declarations() {
    let source = "
        typedef unsigned long size_type;
        typedef struct point { int x; int y; } point_t;

        size_type area(point_t *p) {
            size_type w = (size_type)p->x;
            return w * (size_type)p->y;
        }
    ";
    let outcome = check(source);
    assert_eq!(error_messages(&outcome), Vec::<String>::new());
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.function("area").unwrap().return_types, vec![CType::ulong()]);
    assert_eq!(outcome.report.stats.record_count, 1);
}

#[test]
fn test_builtin_calls_are_recorded() {
    let source = r#"
        int main(void) {
            char *buf = malloc(16);
            strcpy(buf, "hi");
            printf("%s %lu\n", buf, strlen(buf));
            free(buf);
            return 0;
        }
    "#;
    let outcome = check(source);
    assert!(outcome.report.success);

    let calls: Vec<(String, u16)> = outcome
        .report
        .builtin_calls
        .iter()
        .map(|c| (c.name.clone(), c.id))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("malloc".to_string(), 0x0001),
            ("strcpy".to_string(), 0x0011),
            ("printf".to_string(), 0x0030),
            ("strlen".to_string(), 0x0010),
            ("free".to_string(), 0x0002),
        ]
    );
    assert_eq!(outcome.report.builtin_calls[0].line, 3);
}

#[test]
fn test_goto_undefined_label() {
    let outcome = check("void f(void) {\n  goto missing;\n}\n");
    assert!(!outcome.report.success);
    assert_eq!(error_messages(&outcome), vec!["label 'missing' used but not defined"]);
    let diagnostic = &outcome.report.diagnostics[0];
    assert_eq!((diagnostic.line, diagnostic.column), (2, 8));
    assert_eq!(diagnostic.stage, Stage::Semantic);
}

#[test]
fn test_call_argument_counts() {
    let base = "int add(int a, int b) { return a + b; }\n";
    let ok = check(&format!("{}int main(void) {{ return add(1, 2); }}", base));
    assert!(ok.report.success);

    for call in ["add(1)", "add(1, 2, 3)"] {
        let outcome = check(&format!("{}int main(void) {{ return {}; }}", base, call));
        assert_eq!(outcome.report.errors, 1, "{}", call);
        assert!(error_messages(&outcome)[0].starts_with("wrong number of arguments to 'add'"));
    }
}

#[test]
fn test_break_and_continue_placement() {
    let outcome = check("void f(void) { break; }");
    assert_eq!(error_messages(&outcome), vec!["'break' statement not in loop or switch"]);

    let outcome = check("void f(int x) { switch (x) { case 0: continue; } }");
    assert_eq!(error_messages(&outcome), vec!["'continue' statement not in loop"]);

    let outcome = check("void f(int x) { for (;;) { switch (x) { case 0: continue; } break; } }");
    assert!(outcome.report.success);
}

#[test]
fn test_shadowing_across_scopes() {
    let source = "
        int value = 1;
        double f(void) {
            double value = 2.0;
            { char value = 'c'; value = value + 1; }
            return value;
        }
    ";
    let outcome = check(source);
    assert!(outcome.report.success);
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.global("value").unwrap().ty, CType::int());
    assert_eq!(analysis.function("f").unwrap().return_types, vec![CType::double()]);

    let outcome = check("int f(void) { int x; int x; return 0; }");
    assert!(error_messages(&outcome).contains(&"redeclaration of 'x'".to_string()));
}

#[test]
fn test_errors_do_not_stop_analysis() {
    let source = "
        int f(void) { return undefined_a; }
        int g(void) { int *p = 1.5; return 0; }
        int h(void) { return 0; }
    ";
    let outcome = check(source);
    assert_eq!(outcome.report.errors, 2);
    let analysis = outcome.analysis.unwrap();
    assert!(analysis.function("h").is_some());
    assert!(!analysis.is_success());
}

#[test]
fn test_lexical_and_syntax_errors_stop_the_pipeline() {
    let outcome = check("int main(void) { return \"open; }");
    assert!(outcome.unit.is_none());
    assert_eq!(outcome.report.diagnostics.len(), 1);
    assert_eq!(outcome.report.diagnostics[0].stage, Stage::Lexical);

    let outcome = check("int main(void) { return 1 }");
    assert!(outcome.analysis.is_none());
    assert_eq!(outcome.report.diagnostics[0].stage, Stage::Syntax);
}

#[test]
fn test_unused_warning_and_config() {
    let source = "int main(void) { int unused; return 0; }";
    let outcome = check(source);
    assert!(outcome.report.success);
    assert_eq!(outcome.report.warnings, 1);
    assert_eq!(outcome.report.diagnostics[0].to_string(), "1:22: warning: unused variable 'unused'");

    let quiet = check_source(source, "test.c", AnalyzerConfig { warn_unused: false });
    assert_eq!(quiet.report.warnings, 0);
}

#[test]
fn test_json_report() {
    let outcome = check("int main(void) { return missing; }");
    let json: serde_json::Value = serde_json::from_str(&outcome.report.to_json()).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["source_file"], "test.c");
    assert_eq!(json["diagnostics"][0]["message"], "undefined identifier 'missing'");
    assert_eq!(json["diagnostics"][0]["severity"], "error");
}

#[test]
fn test_linked_list_program() {
    let source = "
        struct node { int value; struct node *next; };

        int sum(struct node *head) {
            int total = 0;
            while (head != 0) {
                total += head->value;
                head = head->next;
            }
            return total;
        }

        enum { LIMIT = 4 };
        int table[LIMIT * 2];

        int main(void) {
            struct node items[LIMIT];
            int i;
            for (i = 0; i < LIMIT; i++) {
                items[i].value = i;
                items[i].next = i + 1 < LIMIT ? &items[i + 1] : 0;
            }
            table[0] = sum(&items[0]);
            switch (table[0]) {
            case 6: return 0;
            default: return 1;
            }
        }
    ";
    let outcome = check(source);
    assert_eq!(error_messages(&outcome), Vec::<String>::new());
    assert_eq!(outcome.report.warnings, 0);
    let analysis = outcome.analysis.unwrap();
    assert_eq!(analysis.global("table").unwrap().ty, CType::array_of(CType::int(), Some(8)));
}
