use crate::config::VarmarkConfig;
use crate::env::Environment;
use crate::env::EvalDiagnostic;
use crate::env::ResolvedDefinition;
use crate::marker::MarkerSyntax;
use crate::reconciler::DEFAULT_LOOKBACK;
use crate::reconciler::reconcile;
use crate::scanner::scan;

/// Settings for a single engine run, derived from [`VarmarkConfig`] or
/// used directly with the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
	/// The marker vocabulary used when wrapping references.
	pub marker: MarkerSyntax,
	/// Base lookback window (bytes) for detecting existing markers.
	pub lookback: usize,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			marker: MarkerSyntax::default(),
			lookback: DEFAULT_LOOKBACK,
		}
	}
}

impl From<&VarmarkConfig> for EngineSettings {
	fn from(config: &VarmarkConfig) -> Self {
		Self {
			marker: MarkerSyntax::new(&config.marker.class),
			lookback: config.lookback,
		}
	}
}

/// The result of one engine run over a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
	/// The reconciled text. Equal to the input when `changed` is false.
	pub text: String,
	/// Whether the reconciled text differs from the input. The host only
	/// commits a buffer write on an actual diff, so spurious writes never
	/// disturb cursor or undo state.
	pub changed: bool,
	/// Every definition in scan order with the value it resolved to.
	pub definitions: Vec<ResolvedDefinition>,
	/// Evaluation failures recovered during this run.
	pub diagnostics: Vec<EvalDiagnostic>,
	/// Names of references with no matching definition, deduplicated in
	/// order of first appearance.
	pub unresolved: Vec<String>,
}

impl ProcessOutcome {
	/// Returns true when every definition evaluated and every reference
	/// resolved.
	pub fn is_clean(&self) -> bool {
		self.diagnostics.is_empty() && self.unresolved.is_empty()
	}
}

/// Run the full pipeline with default settings.
pub fn process(content: &str) -> ProcessOutcome {
	process_with_settings(content, &EngineSettings::default())
}

/// Run the full pipeline: scan definitions and references, evaluate every
/// definition in order into a fresh environment, then reconcile the
/// reference markers. One run is a pure function of its text input; no
/// state survives between calls, which is what makes repeated runs over
/// the engine's own output byte-identical.
pub fn process_with_settings(content: &str, settings: &EngineSettings) -> ProcessOutcome {
	let scanned = scan(content);
	let (env, definitions, diagnostics) = Environment::from_definitions(&scanned.definitions);
	let text = reconcile(
		content,
		&scanned.references,
		&env,
		&settings.marker,
		settings.lookback,
	);

	let mut unresolved: Vec<String> = Vec::new();
	for reference in &scanned.references {
		if !env.contains(&reference.name) && !unresolved.contains(&reference.name) {
			unresolved.push(reference.name.clone());
		}
	}

	let changed = text != content;
	tracing::debug!(
		definitions = definitions.len(),
		references = scanned.references.len(),
		unresolved = unresolved.len(),
		failures = diagnostics.len(),
		changed,
		"processed document"
	);

	ProcessOutcome {
		text,
		changed,
		definitions,
		diagnostics,
		unresolved,
	}
}
