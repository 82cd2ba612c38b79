use rstest::rstest;
use similar_asserts::assert_eq;

use super::*;
use crate::scanner::line_col;
use crate::scanner::scan;

fn wrapped(name: &str, value: &str) -> String {
	format!(
		"<span class=\"varmark-ref\" data-variable=\"{name}\" data-value=\"{value}\">{{{{{name}}}}}</span>"
	)
}

// --- Scanner tests ---

#[test]
fn scan_definitions_in_order() {
	let scanned = scan("%%a=2%% %%b=a+3%%");
	assert_eq!(scanned.definitions.len(), 2);
	assert_eq!(scanned.definitions[0].name, "a");
	assert_eq!(scanned.definitions[0].expression, "2");
	assert_eq!(scanned.definitions[0].offset, 0);
	assert_eq!(scanned.definitions[1].name, "b");
	assert_eq!(scanned.definitions[1].expression, "a+3");
	assert_eq!(scanned.definitions[1].offset, 8);
}

#[rstest]
#[case::space_before_name("%% a=1%%")]
#[case::space_before_equals("%%a =1%%")]
#[case::empty_expression("%%a=%%")]
#[case::unterminated("%%a=1")]
#[case::no_equals("%%abc%%")]
#[case::disallowed_expression_char("%%a=1&2%%")]
fn scan_skips_malformed_definitions(#[case] input: &str) {
	let scanned = scan(input);
	assert!(scanned.definitions.is_empty());
}

#[test]
fn scan_resumes_after_failed_candidate() {
	// The first fence opens an invalid candidate; its closing fence then
	// serves as the opener for a valid one.
	let scanned = scan("%%a=%%b=2%%");
	assert_eq!(scanned.definitions.len(), 1);
	assert_eq!(scanned.definitions[0].name, "b");
	assert_eq!(scanned.definitions[0].expression, "2");
}

#[test]
fn scan_definition_after_extra_percent() {
	let scanned = scan("%%%a=1%%");
	assert_eq!(scanned.definitions.len(), 1);
	assert_eq!(scanned.definitions[0].name, "a");
	assert_eq!(scanned.definitions[0].offset, 1);
}

#[test]
fn scan_multiline_expression() {
	let scanned = scan("%%a=1 +\n2%%");
	assert_eq!(scanned.definitions.len(), 1);
	assert_eq!(scanned.definitions[0].expression, "1 +\n2");
}

#[test]
fn scan_references_with_spans() {
	let scanned = scan("x {{a}} y {{b}}");
	assert_eq!(scanned.references.len(), 2);
	assert_eq!(scanned.references[0].name, "a");
	assert_eq!(scanned.references[0].span, 2..7);
	assert_eq!(scanned.references[1].name, "b");
	assert_eq!(scanned.references[1].span, 10..15);
}

#[rstest]
#[case::dotted_name("{{a.b}}")]
#[case::empty_name("{{}}")]
#[case::unterminated("{{a}")]
#[case::space_in_name("{{a b}}")]
fn scan_skips_malformed_references(#[case] input: &str) {
	let scanned = scan(input);
	assert!(scanned.references.is_empty());
}

#[test]
fn scan_reference_inside_extra_braces() {
	let scanned = scan("{{{a}}}");
	assert_eq!(scanned.references.len(), 1);
	assert_eq!(scanned.references[0].name, "a");
	assert_eq!(scanned.references[0].span, 1..6);
}

#[test]
fn line_col_is_one_indexed() {
	let content = "first\nsecond line\nthird";
	assert_eq!(line_col(content, 0), (1, 1));
	assert_eq!(line_col(content, 6), (2, 1));
	assert_eq!(line_col(content, 13), (2, 8));
	assert_eq!(line_col(content, 18), (3, 1));
}

// --- Evaluator tests ---

#[rstest]
#[case::integer("42", Some(42.0))]
#[case::decimal("3.5", Some(3.5))]
#[case::negative(" -2 ", Some(-2.0))]
#[case::double_dot("1.2.3", None)]
#[case::identifier("abc", None)]
#[case::arithmetic("1/2", None)]
#[case::empty("", None)]
#[case::bare_minus("-", None)]
#[case::missing_integral("-.5", None)]
fn numeric_fast_path(#[case] input: &str, #[case] expected: Option<f64>) {
	assert_eq!(numeric_literal(input), expected);
}

#[rstest]
#[case::precedence("1+2*3", 7.0)]
#[case::parens("(1+2)*3", 9.0)]
#[case::division("10/4", 2.5)]
#[case::unary_minus("-(2+3)", -5.0)]
#[case::double_minus("2--3", 5.0)]
#[case::whitespace(" 1 +  2 ", 3.0)]
fn evaluate_arithmetic(#[case] input: &str, #[case] expected: f64) {
	let env = Environment::default();
	assert_eq!(evaluate(input, &env), Ok(expected));
}

#[test]
fn evaluate_substitutes_bound_variables() {
	let mut env = Environment::default();
	env.insert("a".to_string(), Value::Number(2.0));
	assert_eq!(evaluate("a+3", &env), Ok(5.0));
	assert_eq!(evaluate("a*a", &env), Ok(4.0));
}

#[test]
fn evaluate_substitutes_negative_values() {
	let mut env = Environment::default();
	env.insert("a".to_string(), Value::Number(-2.0));
	assert_eq!(evaluate("3-a", &env), Ok(5.0));
}

#[test]
fn evaluate_undefined_variable_fails() {
	let env = Environment::default();
	assert_eq!(
		evaluate("a+3", &env),
		Err(EvalError::UndefinedVariable("a".to_string()))
	);
}

#[rstest]
#[case::literal_zero("1/0")]
#[case::computed_zero("1/(2-2)")]
fn evaluate_division_by_zero_fails(#[case] input: &str) {
	let env = Environment::default();
	assert_eq!(evaluate(input, &env), Err(EvalError::DivisionByZero));
}

#[rstest]
#[case::adjacent_numbers("1 2", EvalError::TrailingInput)]
#[case::unclosed_paren("(1+2", EvalError::UnexpectedEnd)]
#[case::dangling_operator("1+", EvalError::UnexpectedEnd)]
#[case::unrecognized_byte("1 & 2", EvalError::InvalidToken)]
fn evaluate_malformed_expressions_fail(#[case] input: &str, #[case] expected: EvalError) {
	let env = Environment::default();
	assert_eq!(evaluate(input, &env), Err(expected));
}

#[test]
fn evaluate_splices_raw_fallback_values() {
	let mut env = Environment::default();
	env.insert("a".to_string(), Value::Raw("1+2".to_string()));
	// The raw text is spliced verbatim, so precedence applies to the
	// substituted source: `1+2*2`, not `(1+2)*2`.
	assert_eq!(evaluate("a*2", &env), Ok(5.0));
}

// --- Value and environment tests ---

#[rstest]
#[case::integral(Value::Number(5.0), "5")]
#[case::negative_integral(Value::Number(-2.0), "-2")]
#[case::fractional(Value::Number(3.5), "3.5")]
#[case::raw(Value::Raw("a+3".to_string()), "a+3")]
fn value_display(#[case] value: Value, #[case] expected: &str) {
	assert_eq!(value.to_string(), expected);
}

#[test]
fn environment_sees_only_earlier_definitions() {
	let scanned = scan("%%a=2%% %%b=a+3%%");
	let (env, resolved, diagnostics) = Environment::from_definitions(&scanned.definitions);
	assert!(diagnostics.is_empty());
	assert_eq!(env.get("b"), Some(&Value::Number(5.0)));
	assert_eq!(resolved[1].value, Value::Number(5.0));
}

#[test]
fn environment_forward_reference_falls_back_to_raw() {
	let scanned = scan("%%b=a+3%% %%a=2%%");
	let (env, resolved, diagnostics) = Environment::from_definitions(&scanned.definitions);
	// `b` is evaluated before `a` exists, so it keeps its raw expression.
	assert_eq!(env.get("b"), Some(&Value::Raw("a+3".to_string())));
	assert_eq!(env.get("a"), Some(&Value::Number(2.0)));
	assert_eq!(resolved[0].value, Value::Raw("a+3".to_string()));
	assert_eq!(diagnostics.len(), 1);
	assert_eq!(diagnostics[0].name, "b");
	assert!(diagnostics[0].message.contains("undefined variable"));
}

#[test]
fn environment_last_definition_wins() {
	let scanned = scan("%%a=1%% %%a=2%%");
	let (env, resolved, _) = Environment::from_definitions(&scanned.definitions);
	assert_eq!(env.get("a"), Some(&Value::Number(2.0)));
	assert_eq!(resolved.len(), 2);
}

#[test]
fn environment_division_by_zero_recovers() {
	let scanned = scan("%%x=1/0%% %%y=2%%");
	let (env, _, diagnostics) = Environment::from_definitions(&scanned.definitions);
	assert_eq!(env.get("x"), Some(&Value::Raw("1/0".to_string())));
	assert_eq!(env.get("y"), Some(&Value::Number(2.0)));
	assert_eq!(diagnostics.len(), 1);
	assert_eq!(diagnostics[0].message, "division by zero");
}

// --- Engine and reconciler tests ---

#[test]
fn process_wraps_bare_reference() {
	let outcome = process("%%a=2%% {{a}}");
	assert!(outcome.changed);
	assert_eq!(outcome.text, format!("%%a=2%% {}", wrapped("a", "2")));
}

#[test]
fn process_resolves_reference_defined_later_in_text() {
	// All definitions are resolved before any reference substitution.
	let outcome = process("{{a}} %%a=4%%");
	assert_eq!(outcome.text, format!("{} %%a=4%%", wrapped("a", "4")));
}

#[test]
fn process_last_wins_overwrite() {
	let outcome = process("%%a=1%% %%a=2%% {{a}}");
	assert!(outcome.text.ends_with(&wrapped("a", "2")));
}

#[test]
fn process_order_sensitivity() {
	let forward = process("%%a=2%% %%b=a+3%% {{b}}");
	assert!(forward.text.ends_with(&wrapped("b", "5")));
	assert!(forward.diagnostics.is_empty());

	let reversed = process("%%b=a+3%% %%a=2%% {{b}}");
	assert!(reversed.text.ends_with(&wrapped("b", "a+3")));
	assert_eq!(reversed.diagnostics.len(), 1);
}

#[test]
fn process_numeric_fast_path_value() {
	let outcome = process("%%x=3.5%% {{x}}");
	assert!(outcome.text.ends_with(&wrapped("x", "3.5")));
}

#[test]
fn process_division_by_zero_recovery() {
	let outcome = process("%%x=1/0%% %%y=2%% {{x}} {{y}}");
	assert!(outcome.text.contains(&wrapped("x", "1/0")));
	assert!(outcome.text.contains(&wrapped("y", "2")));
	assert_eq!(outcome.diagnostics.len(), 1);
}

#[test]
fn process_unresolved_reference_passes_through() {
	let outcome = process("before {{missing}} after");
	assert!(!outcome.changed);
	assert_eq!(outcome.text, "before {{missing}} after");
	assert_eq!(outcome.unresolved, vec!["missing".to_string()]);
}

#[test]
fn process_no_definitions_or_references_is_exact_noop() {
	let input = "  plain text\twith %\n{ braces } and\r\nnothing else\n";
	let outcome = process(input);
	assert!(!outcome.changed);
	assert_eq!(outcome.text, input);
}

#[test]
fn process_already_reconciled_text_is_unchanged() {
	let input = format!("%%a=2%% {} tail", wrapped("a", "2"));
	let outcome = process(&input);
	assert!(!outcome.changed);
	assert_eq!(outcome.text, input);
}

#[test]
fn process_rewraps_marker_on_value_change() {
	// A marker carrying value 5 is rewritten in place after the definition
	// changes to 7; the closing tag and surrounding text survive verbatim.
	let input = format!("%%a=7%% {} tail", wrapped("a", "5"));
	let outcome = process(&input);
	assert!(outcome.changed);
	assert_eq!(outcome.text, format!("%%a=7%% {} tail", wrapped("a", "7")));
}

#[test]
fn process_strips_wrapper_when_definition_deleted() {
	let input = format!("x {} y", wrapped("a", "5"));
	let outcome = process(&input);
	assert!(outcome.changed);
	assert_eq!(outcome.text, "x {{a}} y");
}

#[test]
fn process_wraps_fresh_when_closing_tag_missing() {
	// A stale opening tag with no closing counterpart fails the dual-
	// signature check, so the reference is wrapped fresh and the stale
	// fragment is left untouched.
	let stale_open = "<span class=\"varmark-ref\" data-variable=\"a\" data-value=\"1\">";
	let input = format!("%%a=2%% {stale_open}{{{{a}}}} x");
	let outcome = process(&input);
	assert_eq!(
		outcome.text,
		format!("%%a=2%% {stale_open}{} x", wrapped("a", "2"))
	);
}

#[test]
fn process_keeps_reference_inside_signature_fragment() {
	// The malformed fragment before {{b}} carries the marker signature and
	// parses as a complete opening tag, but it contains a reference that
	// was already rewritten. Truncating back to it would delete {{a}}'s
	// fresh marker, so {{b}} must be wrapped fresh instead.
	let input = "%%a=1%% %%b=2%% <span class=\"varmark-ref\" {{a}} >{{b}}</span>";
	let outcome = process(input);
	assert!(outcome.text.contains(&wrapped("a", "1")));
	assert!(outcome.text.contains(&wrapped("b", "2")));

	let twice = process(&outcome.text);
	assert_eq!(outcome.text, twice.text);
}

#[test]
fn process_keeps_unresolved_reference_inside_signature_fragment() {
	// Same shape on the unresolved path: the stale-wrapper strip must not
	// fire when the candidate tag's span was not copied through verbatim.
	let input = "%%a=1%% <span class=\"varmark-ref\" {{a}} >{{ghost}}</span>";
	let outcome = process(input);
	assert!(outcome.text.contains(&wrapped("a", "1")));
	assert!(outcome.text.contains("{{ghost}}</span>"));
	assert_eq!(outcome.unresolved, vec!["ghost".to_string()]);
}

#[test]
fn process_ignores_foreign_markup() {
	let input = "%%a=2%% <span class=\"other\" data-x=\"1\">{{a}}</span>";
	let outcome = process(input);
	assert_eq!(
		outcome.text,
		format!("%%a=2%% <span class=\"other\" data-x=\"1\">{}</span>", wrapped("a", "2"))
	);
}

#[test]
fn process_wraps_every_occurrence() {
	let outcome = process("%%a=1%% {{a}} and {{a}}");
	let expected = format!("%%a=1%% {} and {}", wrapped("a", "1"), wrapped("a", "1"));
	assert_eq!(outcome.text, expected);
}

#[rstest]
#[case::bare("%%a=2%% {{a}}")]
#[case::value_and_text("%%a=2%% %%b=a*3%% {{a}} mid {{b}} end")]
#[case::unresolved("{{missing}} and %%a=1%% {{a}}")]
#[case::raw_fallback("%%b=a+3%% {{b}}")]
#[case::half_marker("%%a=2%% <span class=\"varmark-ref\" data-variable=\"a\" data-value=\"9\">{{a}} x")]
#[case::stray_closing("%%a=2%% {{a}}</span>")]
#[case::foreign_markup("%%a=2%% <span class=\"other\">{{a}}</span>")]
#[case::deleted_definition("x <span class=\"varmark-ref\" data-variable=\"a\" data-value=\"5\">{{a}}</span> y")]
#[case::reference_inside_fragment("%%a=1%% %%b=2%% <span class=\"varmark-ref\" {{a}} >{{b}}</span>")]
fn process_is_idempotent(#[case] input: &str) {
	let once = process(input);
	let twice = process(&once.text);
	assert_eq!(once.text, twice.text);
	assert!(!twice.changed);
}

#[test]
fn process_is_idempotent_for_long_names_and_values() {
	// The lookback window widens to the engine's own tag length, so even
	// markers far larger than the base window are found on the next run.
	let name = "n".repeat(400);
	let expression = format!("missing + {}", "1 + ".repeat(120).trim_end_matches(" + "));
	let input = format!("%%{name}={expression}%% {{{{{name}}}}}");

	let once = process(&input);
	assert!(once.changed);
	let twice = process(&once.text);
	assert_eq!(once.text, twice.text);
	assert!(!twice.changed);
}

#[test]
fn process_with_custom_marker_class() {
	let settings = EngineSettings {
		marker: MarkerSyntax::new("note-var"),
		..EngineSettings::default()
	};
	let outcome = process_with_settings("%%a=2%% {{a}}", &settings);
	assert!(outcome.text.contains("class=\"note-var\""));
	assert!(!outcome.text.contains("varmark-ref"));
}

#[test]
fn outcome_reports_resolution_detail() {
	let outcome = process("%%a=2%% %%b=a+3%% {{b}} {{ghost}}");
	assert_eq!(outcome.definitions.len(), 2);
	assert_eq!(outcome.definitions[1].value, Value::Number(5.0));
	assert_eq!(outcome.unresolved, vec!["ghost".to_string()]);
	assert!(!outcome.is_clean());
}

// --- Config tests ---

#[test]
fn config_defaults_when_missing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let config = VarmarkConfig::load_or_default(tmp.path())?;
	assert_eq!(config.marker.class, DEFAULT_MARKER_CLASS);
	assert_eq!(config.lookback, DEFAULT_LOOKBACK);
	assert_eq!(config.watch.debounce_ms, DEFAULT_DEBOUNCE_MS);
	Ok(())
}

#[test]
fn config_loads_from_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("varmark.toml"),
		"lookback = 512\n\n[marker]\nclass = \"note-var\"\n\n[watch]\ndebounce_ms = 50\n",
	)?;

	let config = VarmarkConfig::load_or_default(tmp.path())?;
	assert_eq!(config.marker.class, "note-var");
	assert_eq!(config.lookback, 512);
	assert_eq!(config.watch.debounce_ms, 50);
	Ok(())
}

#[test]
fn config_parse_failure_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("varmark.toml"), "lookback = \"not a number\"")?;

	let result = VarmarkConfig::load(tmp.path());
	assert!(matches!(result, Err(VarmarkError::ConfigParse(_))));
	Ok(())
}
