use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Expand inline document variables and keep their annotation markers in sync.",
	long_about = "varmark scans plain-text documents for inline variable definitions \
	              (%%name=expression%%), evaluates each expression in order of appearance, and \
	              wraps every {{name}} reference in an up-to-date annotation marker carrying the \
	              computed value.\n\nRe-running varmark over its own output is always a no-op, so \
	              it is safe to trigger on every editor change.\n\nQuick start:\n  varmark process \
	              notes.md          Print the reconciled document\n  varmark process --write \
	              notes.md  Rewrite the document in place\n  varmark check notes.md            \
	              Verify markers are up to date\n  varmark watch notes.md            Reconcile on \
	              every change"
)]
pub struct VarmarkCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Directory searched for `varmark.toml`. Defaults to the current
	/// working directory.
	#[arg(long, short, global = true)]
	pub config_root: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Reconcile a document and print the result.
	///
	/// Scans the document for definitions and references, evaluates every
	/// expression, and prints the text with all reference markers brought
	/// up to date. Use `--write` to rewrite the file in place instead; the
	/// file is only touched when the reconciled text actually differs.
	Process {
		/// The document to process.
		file: PathBuf,

		/// Rewrite the file in place instead of printing to stdout. The
		/// write is skipped entirely when nothing changed.
		#[arg(long, default_value_t = false)]
		write: bool,

		/// Show a unified diff between the current and reconciled text
		/// instead of the full output.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// Check that documents have up-to-date variable markers.
	///
	/// Exits with a non-zero status code when any document's reconciled
	/// text differs from its current content. Ideal for CI pipelines. Use
	/// `--format` to control the output style.
	Check {
		/// The documents to check.
		#[arg(required = true)]
		files: Vec<PathBuf>,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List a document's definitions, values, and reference status.
	///
	/// Shows every definition in scan order with the value it resolved to,
	/// any evaluation failures, and every reference with whether it
	/// resolved.
	List {
		/// The document to inspect.
		file: PathBuf,

		/// Output format for list results. Use `text` for human-readable
		/// output or `json` for programmatic consumption.
		#[arg(long, value_enum, default_value_t = ListOutputFormat::Text)]
		format: ListOutputFormat,
	},
	/// Watch a document and reconcile it on every change.
	///
	/// Bursts of editor events within the configured quiescence window
	/// (`[watch] debounce_ms` in varmark.toml) coalesce into a single run.
	/// The file is only rewritten when the reconciled text actually
	/// differs, so saves never loop.
	Watch {
		/// The document to watch.
		file: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each stale entry includes
	/// the file path and the counts of definitions and unresolved
	/// references.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` annotations
	/// that appear inline on pull request diffs.
	Github,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListOutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
