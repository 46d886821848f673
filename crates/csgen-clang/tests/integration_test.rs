//! Integration tests for C parsing and C# generation.
//!
//! These drive the real libclang front end and are skipped when libclang
//! cannot be loaded.

use csgen_clang::{translate_file, ClangParser, EmitOptions, OutputOptions, TranslationReport, TranslationUnitDriver, DEFAULT_ARGS};
use std::io::Write;

fn translate(source: &str) -> Option<TranslationReport> {
    let parser = match ClangParser::new() {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("skipping: {}", e);
            return None;
        }
    };
    let tree = parser.parse_string(source, "test.c").expect("Failed to parse");
    Some(TranslationUnitDriver::default().run(&tree))
}

fn function_text<'a>(report: &'a TranslationReport, name: &str) -> &'a str {
    report
        .functions
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.text.as_str())
        .unwrap_or_else(|| panic!("function {} not emitted", name))
}

/// Test translating a simple add function.
#[test]
fn test_add_function() {
    let Some(report) = translate("int add(int a, int b) { return a + b; }") else { return };

    assert!(report.is_success());
    assert_eq!(
        function_text(&report, "add"),
        "private static int add(int a, int b)\n{\nreturn (int)(a + b);\n}\n"
    );
}

/// Test pointer truthiness and dereference assignment.
#[test]
fn test_pointer_condition() {
    let Some(report) = translate("void clear(int *p) { if (p) { *p = 0; } }") else { return };

    assert_eq!(
        function_text(&report, "clear"),
        "private static void clear(Pointer<int> p)\n{\nif ((p) != null) {\np.CurrentValue = (int) (0);\n}\n}\n"
    );
}

/// Test an infinite for loop with all clauses absent.
#[test]
fn test_empty_for_loop() {
    let Some(report) = translate("void spin(void) { for (;;) { break; } }") else { return };

    assert_eq!(
        function_text(&report, "spin"),
        "private static void spin()\n{\nfor (; ; ) {\nbreak;\n}\n}\n"
    );
}

/// Test post-increment dereference.
#[test]
fn test_deref_post_increment() {
    let Some(report) = translate("unsigned char next(unsigned char *p) { return *p++; }") else { return };

    assert!(function_text(&report, "next").contains("return (byte)(p.GetAndMove());"));
}

/// Test loops and local declarations.
#[test]
fn test_while_loop_and_locals() {
    let source = r#"
        int count(int n) {
            int c = 0;
            while (n) {
                n--;
                c++;
            }
            return c;
        }
    "#;
    let Some(report) = translate(source) else { return };

    let text = function_text(&report, "count");
    assert!(text.contains("int c = (int)(0);"));
    assert!(text.contains("while ((n) != 0) {\nn--;\nc++;\n}"));
    assert!(text.contains("return (int)(c);"));
}

/// Test that skip-set functions and forward declarations are not emitted.
#[test]
fn test_skip_set_and_forward_declarations() {
    let source = r#"
        int helper(int x);
        int stbi__err(const char *str) { return 0; }
        int helper(int x) { return x; }
    "#;
    let Some(report) = translate(source) else { return };

    let names: Vec<_> = report.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["helper"]);
    assert_eq!(report.skipped, ["stbi__err"]);
}

/// Test the file-based entry point with a wrapped output.
#[test]
fn test_translate_file() {
    if ClangParser::new().is_err() {
        eprintln!("skipping: libclang not available");
        return;
    }

    let mut file = tempfile::Builder::new().suffix(".c").tempfile().unwrap();
    writeln!(file, "void copy(unsigned char *out, unsigned char v) {{ *out = v; }}").unwrap();

    let args = DEFAULT_ARGS.iter().map(|s| s.to_string()).collect();
    let report = translate_file(file.path(), args, EmitOptions::default()).unwrap();

    let rendered = report.render(&OutputOptions {
        namespace: Some("StbSharp".to_string()),
        class: Some("StbImage".to_string()),
    });
    assert!(rendered.starts_with("namespace StbSharp\n{\nunsafe partial class StbImage\n{\n"));
    assert!(rendered.contains("private static void copy(Pointer<byte> output, byte v)"));
    assert!(rendered.contains("out.CurrentValue = (byte) (v);"));
}
