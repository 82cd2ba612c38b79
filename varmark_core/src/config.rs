use std::path::Path;

use serde::Deserialize;

use crate::VarmarkError;
use crate::VarmarkResult;
use crate::marker::DEFAULT_MARKER_CLASS;
use crate::reconciler::DEFAULT_LOOKBACK;

/// Default quiescence window for the CLI watch command, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["varmark.toml", ".varmark.toml", ".config/varmark.toml"];

/// Configuration loaded from a `varmark.toml` file.
///
/// ```toml
/// lookback = 256
///
/// [marker]
/// class = "varmark-ref"
///
/// [watch]
/// debounce_ms = 200
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VarmarkConfig {
	/// Marker markup configuration.
	#[serde(default)]
	pub marker: MarkerConfig,
	/// Base lookback window (bytes) for detecting existing markers before a
	/// reference. Raise this when hand-written markup routinely separates a
	/// marker's opening tag from its reference.
	#[serde(default = "default_lookback")]
	pub lookback: usize,
	/// Watch-mode configuration for the CLI.
	#[serde(default)]
	pub watch: WatchConfig,
}

impl Default for VarmarkConfig {
	fn default() -> Self {
		Self {
			marker: MarkerConfig::default(),
			lookback: DEFAULT_LOOKBACK,
			watch: WatchConfig::default(),
		}
	}
}

impl VarmarkConfig {
	/// Load configuration from the first candidate file found under `root`.
	/// Returns `Ok(None)` when no config file exists; the caller falls back
	/// to defaults.
	pub fn load(root: &Path) -> VarmarkResult<Option<Self>> {
		for candidate in CONFIG_FILE_CANDIDATES {
			let path = root.join(candidate);
			if !path.is_file() {
				continue;
			}

			let content = std::fs::read_to_string(&path)?;
			let config = toml::from_str(&content)
				.map_err(|error| VarmarkError::ConfigParse(error.to_string()))?;
			return Ok(Some(config));
		}

		Ok(None)
	}

	/// Load configuration or fall back to defaults when no file exists.
	pub fn load_or_default(root: &Path) -> VarmarkResult<Self> {
		Ok(Self::load(root)?.unwrap_or_default())
	}
}

/// Marker markup configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MarkerConfig {
	/// The class token identifying markers owned by this engine. Markup
	/// carrying any other class is never touched.
	#[serde(default = "default_marker_class")]
	pub class: String,
}

impl Default for MarkerConfig {
	fn default() -> Self {
		Self {
			class: DEFAULT_MARKER_CLASS.to_string(),
		}
	}
}

/// Watch-mode configuration for the CLI.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
	/// Quiescence window in milliseconds. Bursts of editor events within
	/// this window coalesce into a single engine run.
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
}

impl Default for WatchConfig {
	fn default() -> Self {
		Self {
			debounce_ms: DEFAULT_DEBOUNCE_MS,
		}
	}
}

fn default_marker_class() -> String {
	DEFAULT_MARKER_CLASS.to_string()
}

fn default_lookback() -> usize {
	DEFAULT_LOOKBACK
}

fn default_debounce_ms() -> u64 {
	DEFAULT_DEBOUNCE_MS
}
