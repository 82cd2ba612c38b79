use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use varmark_cli::Commands;
use varmark_cli::ListOutputFormat;
use varmark_cli::OutputFormat;
use varmark_cli::VarmarkCli;
use varmark_core::EngineSettings;
use varmark_core::EvalDiagnostic;
use varmark_core::ProcessOutcome;
use varmark_core::VarmarkConfig;
use varmark_core::VarmarkError;
use varmark_core::process_with_settings;
use varmark_core::scanner::line_col;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = VarmarkCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	// Route core tracing to stderr when VARMARK_LOG is set.
	if std::env::var_os("VARMARK_LOG").is_some() {
		tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_env("VARMARK_LOG"))
			.with_writer(std::io::stderr)
			.init();
	}

	let result = match args.command {
		Some(Commands::Process { ref file, write, diff }) => run_process(&args, &file, write, diff),
		Some(Commands::Check { ref files, format }) => run_check(&args, &files, format),
		Some(Commands::List { ref file, format }) => run_list(&args, &file, format),
		Some(Commands::Watch { ref file }) => run_watch(&args, &file),
		None => {
			eprintln!("No subcommand specified. Run `varmark --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<VarmarkError>() {
			Ok(varmark_err) => {
				let report: miette::Report = (*varmark_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

fn resolve_config_root(args: &VarmarkCli) -> PathBuf {
	args.config_root
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_config(args: &VarmarkCli) -> Result<VarmarkConfig, Box<dyn std::error::Error>> {
	let root = resolve_config_root(args);
	let config = VarmarkConfig::load_or_default(&root)?;

	if args.verbose {
		eprintln!(
			"Using marker class `{}`, lookback {} byte(s)",
			config.marker.class, config.lookback
		);
	}

	Ok(config)
}

/// Print warnings for recovered evaluation failures. These never affect
/// the exit code; the failing variable simply keeps its raw expression.
fn print_eval_warnings(content: &str, file: &Path, diagnostics: &[EvalDiagnostic]) {
	for diagnostic in diagnostics {
		let (line, column) = line_col(content, diagnostic.offset);
		eprintln!(
			"{} variable `{}` at {}:{line}:{column} failed to evaluate ({}); showing `{}` instead",
			colored!("warning:", yellow),
			diagnostic.name,
			file.display(),
			diagnostic.message,
			diagnostic.expression,
		);
	}
}

fn run_process(
	args: &VarmarkCli,
	file: &Path,
	write: bool,
	diff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let settings = EngineSettings::from(&config);

	let content = std::fs::read_to_string(file)?;
	let outcome = process_with_settings(&content, &settings);
	print_eval_warnings(&content, file, &outcome.diagnostics);

	if diff {
		if outcome.changed {
			print_diff(&content, &outcome.text);
		} else {
			println!("No changes for {}.", file.display());
		}
		return Ok(());
	}

	if write {
		if outcome.changed {
			std::fs::write(file, &outcome.text)?;
			println!("Updated {}.", file.display());
		} else {
			println!("{} is already up to date.", file.display());
		}
		return Ok(());
	}

	print!("{}", outcome.text);
	Ok(())
}

fn run_check(
	args: &VarmarkCli,
	files: &[PathBuf],
	format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let settings = EngineSettings::from(&config);

	let mut stale: Vec<&PathBuf> = Vec::new();
	let mut outcomes: Vec<(&PathBuf, ProcessOutcome)> = Vec::new();

	for file in files {
		let content = std::fs::read_to_string(file)?;
		let outcome = process_with_settings(&content, &settings);
		print_eval_warnings(&content, file, &outcome.diagnostics);
		if outcome.changed {
			stale.push(file);
		}
		outcomes.push((file, outcome));
	}

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = outcomes
				.iter()
				.map(|(file, outcome)| {
					serde_json::json!({
						"file": file.display().to_string(),
						"stale": outcome.changed,
						"definitions": outcome.definitions.len(),
						"failures": outcome.diagnostics.len(),
						"unresolved": outcome.unresolved,
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": stale.is_empty(),
				"documents": entries,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for file in &stale {
				println!(
					"::warning file={}::Document has out-of-date variable markers",
					file.display()
				);
			}
			if stale.is_empty() {
				println!("All documents are up to date.");
			}
		}
		OutputFormat::Text => {
			if stale.is_empty() {
				println!("Check passed: all variable markers are up to date.");
			} else {
				eprintln!("Check failed.");
				for file in &stale {
					eprintln!("  {} is out of date", file.display());
				}
				eprintln!();
				eprintln!(
					"{} document(s) have stale markers. Run `varmark process --write` to fix.",
					stale.len()
				);
			}
		}
	}

	if !stale.is_empty() {
		process::exit(1);
	}

	Ok(())
}

fn run_list(
	args: &VarmarkCli,
	file: &Path,
	format: ListOutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let settings = EngineSettings::from(&config);

	let content = std::fs::read_to_string(file)?;
	let outcome = process_with_settings(&content, &settings);

	match format {
		ListOutputFormat::Json => {
			let definitions: Vec<serde_json::Value> = outcome
				.definitions
				.iter()
				.map(|definition| {
					let (line, column) = line_col(&content, definition.offset);
					serde_json::json!({
						"name": definition.name,
						"expression": definition.expression,
						"value": definition.value.to_string(),
						"evaluated": matches!(definition.value, varmark_core::Value::Number(_)),
						"line": line,
						"column": column,
					})
				})
				.collect();
			let output = serde_json::json!({
				"file": file.display().to_string(),
				"definitions": definitions,
				"unresolved": outcome.unresolved,
				"stale": outcome.changed,
			});
			println!("{output}");
		}
		ListOutputFormat::Text => {
			if outcome.definitions.is_empty() {
				println!("No variable definitions found.");
			} else {
				println!("{}", colored!("Definitions:", bold));
				for definition in &outcome.definitions {
					let (line, column) = line_col(&content, definition.offset);
					let status = match definition.value {
						varmark_core::Value::Number(_) => "ok",
						varmark_core::Value::Raw(_) => "failed",
						_ => unreachable!(),
					};
					println!(
						"  {} = {} -> {} [{status}] ({line}:{column})",
						definition.name, definition.expression, definition.value
					);
				}
			}

			if !outcome.unresolved.is_empty() {
				println!();
				println!("{}", colored!("Unresolved references:", bold));
				for name in &outcome.unresolved {
					println!("  {{{{{name}}}}}");
				}
			}

			println!();
			println!(
				"{} definition(s), {} unresolved reference(s){}",
				outcome.definitions.len(),
				outcome.unresolved.len(),
				if outcome.changed {
					" (markers are out of date)"
				} else {
					""
				}
			);
		}
	}

	Ok(())
}

fn run_watch(args: &VarmarkCli, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
	let config = load_config(args)?;
	let settings = EngineSettings::from(&config);
	let debounce = Duration::from_millis(config.watch.debounce_ms);

	// Reconcile once up front so the watch starts from a clean state.
	reconcile_file(file, &settings)?;

	println!("Watching {} (press Ctrl+C to stop)", file.display());

	let watch_root = file.parent().filter(|p| !p.as_os_str().is_empty());
	let watch_root = watch_root.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
	let target = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				let relevant = matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) && event
					.paths
					.iter()
					.any(|path| path.canonicalize().is_ok_and(|path| path == target));
				if relevant {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&watch_root, notify::RecursiveMode::NonRecursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within the quiescence window so
		// a burst of editor writes coalesces into a single run.
		while rx.recv_timeout(debounce).is_ok() {}

		if let Err(e) = reconcile_file(file, &settings) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Process a file and rewrite it in place when the reconciled text
/// differs. The diff gate means our own write never triggers a second
/// rewrite.
fn reconcile_file(file: &Path, settings: &EngineSettings) -> Result<(), Box<dyn std::error::Error>> {
	let content = std::fs::read_to_string(file)?;
	let outcome = process_with_settings(&content, settings);
	print_eval_warnings(&content, file, &outcome.diagnostics);

	if outcome.changed {
		std::fs::write(file, &outcome.text)?;
		println!("Updated {}.", file.display());
	}

	Ok(())
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				print!("{}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				print!("{}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				print!(" {change}");
			}
		}
	}
}
