use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum VarmarkError {
	#[error(transparent)]
	#[diagnostic(code(varmark::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(varmark::config_parse),
		help("check that varmark.toml is valid TOML with [marker] and/or [watch] sections")
	)]
	ConfigParse(String),

	#[error("document `{path}` has out-of-date variable markers")]
	#[diagnostic(
		code(varmark::stale_document),
		help("run `varmark process --write` to rewrite the document")
	)]
	StaleDocument { path: String },
}

pub type VarmarkResult<T> = Result<T, VarmarkError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
