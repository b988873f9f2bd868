use codeshield::language::SupportedLanguage;
use codeshield::pipeline::{ExecutionStrategy, LocalPipeline};
use codeshield::settings::{Intensity, ObfuscationSettings};
use codeshield::strings::decode_payload;
use regex::Regex;

const CALCULATE_TOTAL: &str =
    "function calculateTotal(price, tax) { const total = price + (price * tax); return total; }";

fn settings(language: SupportedLanguage) -> ObfuscationSettings {
    ObfuscationSettings::passthrough(language)
}

fn words(code: &str, word: &str) -> usize {
    Regex::new(&format!(r"\b{word}\b")).unwrap().find_iter(code).count()
}

#[test]
fn renames_calculate_total_consistently() {
    let s = ObfuscationSettings {
        rename_variables: true,
        ..settings(SupportedLanguage::JavaScript)
    };
    let (result, mapping) = LocalPipeline::with_seed(2024).run_with_mapping(CALCULATE_TOTAL, &s);

    assert_eq!(result.strategy, ExecutionStrategy::Local);
    let output = result.output();
    assert!(output.starts_with("// [LOCAL MODE]"));
    assert!(output.contains("(JavaScript)"));

    let body = &result.body;
    for name in ["total", "price", "tax"] {
        assert_eq!(words(body, name), 0, "{name} still present");
    }
    let price = mapping.get("price").unwrap();
    let tax = mapping.get("tax").unwrap();
    let total = mapping.get("total").unwrap();
    assert_eq!(words(body, price), 3);
    assert_eq!(words(body, tax), 2);
    assert_eq!(words(body, total), 2);
    assert!(body.contains("calculateTotal"));

    let expected = format!(
        "function calculateTotal({price}, {tax}) {{ const {total} = {price} + ({price} * {tax}); return {total}; }}"
    );
    assert_eq!(body, &expected);
}

#[test]
fn total_is_literal_decodes_back() {
    let s = ObfuscationSettings {
        string_encryption: true,
        ..settings(SupportedLanguage::JavaScript)
    };
    let result = LocalPipeline::new().run(r#"console.log("Total is:", cartTotal);"#, &s);
    let payload = Regex::new(r#"atob\("([A-Za-z0-9+/=]+)"\)"#)
        .unwrap()
        .captures(&result.body)
        .expect("decode expression present")[1]
        .to_string();
    let profile = SupportedLanguage::JavaScript.profile();
    assert_eq!(decode_payload(&payload, profile.payload_charset).unwrap(), "Total is:");
    assert!(!result.body.contains("Total is:"));
}

#[test]
fn all_passes_off_returns_input_plus_header() {
    let code = "def f(total):\n\n    return 'data'\n";
    for language in SupportedLanguage::all() {
        for intensity in [Intensity::Light, Intensity::Medium] {
            let s = ObfuscationSettings {
                intensity,
                ..settings(language)
            };
            let result = LocalPipeline::new().run(code, &s);
            assert_eq!(result.body, code);
            assert_eq!(result.output(), format!("{}\n{}", result.header, code));
            assert!(!result.header.contains('\n'));
        }
    }
}

#[test]
fn recoded_literals_never_hold_rename_tokens() {
    let code = r#"var total = "total"; var data = 'data ' + total; log('price', price);"#;
    let s = ObfuscationSettings {
        rename_variables: true,
        string_encryption: true,
        ..settings(SupportedLanguage::JavaScript)
    };
    let (result, mapping) = LocalPipeline::with_seed(99).run_with_mapping(code, &s);
    assert!(!mapping.is_empty());

    let charset = SupportedLanguage::JavaScript.profile().payload_charset;
    let payloads: Vec<String> = Regex::new(r#"atob\("([A-Za-z0-9+/=]+)"\)"#)
        .unwrap()
        .captures_iter(&result.body)
        .map(|caps| decode_payload(&caps[1], charset).unwrap())
        .collect();
    assert_eq!(payloads, vec!["total", "data ", "price"]);
    for decoded in &payloads {
        assert!(!mapping.is_generated(decoded.trim()));
    }
}

#[test]
fn strong_python_keeps_indentation() {
    let code = "def f(count):\n\n\n    if count:\n        return 'ok'\n    return None\n";
    let s = ObfuscationSettings {
        intensity: Intensity::Strong,
        ..settings(SupportedLanguage::Python)
    };
    let result = LocalPipeline::new().run(code, &s);
    assert_eq!(
        result.body,
        "def f(count):\n    if count:\n        return 'ok'\n    return None\n"
    );
    assert!(result.header.starts_with("# [LOCAL MODE]"));
}

#[test]
fn strong_javascript_is_single_line() {
    let code = "function f() {\n    const a = 1;\n    return a;\n}";
    let s = ObfuscationSettings {
        intensity: Intensity::Strong,
        ..settings(SupportedLanguage::JavaScript)
    };
    let result = LocalPipeline::new().run(code, &s);
    assert_eq!(result.body, "function f() { const a = 1; return a;\n}");
}

#[test]
fn full_stack_on_python() {
    let code = "total = price * tax\nprint(\"Total is:\", total)\n";
    let s = ObfuscationSettings {
        language: SupportedLanguage::Python,
        intensity: Intensity::Strong,
        rename_variables: true,
        string_encryption: true,
        dead_code_injection: true,
        ..Default::default()
    };
    let (result, mapping) = LocalPipeline::with_seed(5).run_with_mapping(code, &s);
    let report = result.report.clone().unwrap();
    assert_eq!(report.identifiers_renamed, 3);
    assert_eq!(report.literals_recoded, 1);
    assert!(report.dead_code_injected);
    assert!(report.minified);
    assert!(result.body.starts_with("# Protected by CodeShield\n"));
    assert!(result.body.contains("if False: pass\n"));
    assert!(result.body.contains("__import__('base64').b64decode(\"VG90YWwgaXM6\")"));
    assert!(mapping.iter().all(|(_, generated)| generated.starts_with("_var_")));
}

#[test]
fn renaming_skipped_for_php_go_java() {
    let code = "$total = $price + $tax;";
    for language in [SupportedLanguage::Php, SupportedLanguage::Go, SupportedLanguage::Java] {
        let s = ObfuscationSettings {
            rename_variables: true,
            ..settings(language)
        };
        let result = LocalPipeline::new().run(code, &s);
        assert_eq!(result.body, code);
        assert_eq!(result.report.unwrap().identifiers_renamed, 0);
    }
}

#[test]
fn php_output_keeps_open_tag_first_in_code() {
    let code = "<?php\necho \"hello world\";\n";
    let s = ObfuscationSettings {
        string_encryption: true,
        dead_code_injection: true,
        ..settings(SupportedLanguage::Php)
    };
    let result = LocalPipeline::new().run(code, &s);
    assert!(result.header.starts_with("<?php /* [LOCAL MODE]"));
    assert!(result.header.ends_with("?>"));
    assert!(result.body.starts_with("<?php\n/* Protected by CodeShield */"));
    assert!(result.body.contains("echo base64_decode(\"aGVsbG8gd29ybGQ=\");"));
}

#[test]
fn exclusions_apply_locally() {
    let s = ObfuscationSettings {
        rename_variables: true,
        exclusions: "price, tax".into(),
        ..settings(SupportedLanguage::JavaScript)
    };
    let result = LocalPipeline::new().run(CALCULATE_TOTAL, &s);
    assert_eq!(words(&result.body, "price"), 3);
    assert_eq!(words(&result.body, "tax"), 2);
    assert_eq!(words(&result.body, "total"), 0);
}

#[test]
fn separate_runs_draw_fresh_names() {
    let s = ObfuscationSettings {
        rename_variables: true,
        ..settings(SupportedLanguage::JavaScript)
    };
    let (_, first) = LocalPipeline::with_seed(1).run_with_mapping(CALCULATE_TOTAL, &s);
    let (_, second) = LocalPipeline::with_seed(2).run_with_mapping(CALCULATE_TOTAL, &s);
    assert_ne!(first, second);
    let (_, repeat) = LocalPipeline::with_seed(1).run_with_mapping(CALCULATE_TOTAL, &s);
    assert_eq!(first, repeat);
}

#[test]
fn python_fstring_expressions_follow_renames() {
    let code = "total = 3\nprint(f\"Sum: {total}\", \"total\")\n";
    let s = ObfuscationSettings {
        rename_variables: true,
        string_encryption: true,
        ..settings(SupportedLanguage::Python)
    };
    let (result, mapping) = LocalPipeline::with_seed(8).run_with_mapping(code, &s);
    let total = mapping.get("total").unwrap();

    assert!(!result.body.contains("{total}"));
    assert_eq!(
        result.body,
        format!(
            "{total} = 3\nprint(f\"Sum: {{{total}}}\", __import__('base64').b64decode(\"dG90YWw=\").decode('utf-8'))\n"
        )
    );
}

#[test]
fn go_imports_survive_string_recoding() {
    let code = "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println(\"hello\") }\n";
    let s = ObfuscationSettings {
        string_encryption: true,
        ..settings(SupportedLanguage::Go)
    };
    let result = LocalPipeline::new().run(code, &s);
    assert!(result.body.contains("import \"fmt\""));
    assert_eq!(result.report.unwrap().literals_recoded, 1);
}
