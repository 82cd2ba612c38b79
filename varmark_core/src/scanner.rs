use std::ops::Range;

use crate::marker::memstr;

/// An inline variable definition extracted from `%%name=expression%%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
	/// The variable name directly following the opening `%%`.
	pub name: String,
	/// The raw expression text between `=` and the closing `%%`.
	pub expression: String,
	/// Byte offset of the opening `%%` in the document.
	pub offset: usize,
}

/// A symbolic reference `{{name}}` with its byte span in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
	/// The referenced variable name.
	pub name: String,
	/// Byte span covering the full `{{name}}` occurrence.
	pub span: Range<usize>,
}

/// The ordered definitions and references found in a single document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentScan {
	/// Definitions in left-to-right text order. Names are not required to
	/// be unique; later definitions overwrite earlier values at evaluation
	/// time.
	pub definitions: Vec<Definition>,
	/// References in left-to-right text order.
	pub references: Vec<Reference>,
}

/// A word character: ASCII alphanumeric or underscore.
fn is_word(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || byte == b'_'
}

/// A byte allowed inside a definition's expression body: word characters,
/// whitespace, the decimal point, the four arithmetic operators, and
/// parentheses.
fn is_expression_byte(byte: u8) -> bool {
	is_word(byte)
		|| matches!(
			byte,
			b' ' | b'\t' | b'\r' | b'\n' | b'+' | b'-' | b'*' | b'/' | b'(' | b')' | b'.'
		)
}

/// Try to match a full definition whose opening `%%` sits at `start`.
/// Returns the definition and the offset just past its closing `%%`.
fn definition_at(content: &str, start: usize) -> Option<(Definition, usize)> {
	let bytes = content.as_bytes();

	// The name must directly follow the opening fence.
	let name_start = start + 2;
	let mut cursor = name_start;
	while cursor < bytes.len() && is_word(bytes[cursor]) {
		cursor += 1;
	}
	if cursor == name_start || bytes.get(cursor) != Some(&b'=') {
		return None;
	}
	let name_end = cursor;

	// A non-empty expression body terminated by the closing fence.
	let body_start = cursor + 1;
	cursor = body_start;
	while cursor < bytes.len() && is_expression_byte(bytes[cursor]) {
		cursor += 1;
	}
	if cursor == body_start || !bytes[cursor..].starts_with(b"%%") {
		return None;
	}

	let definition = Definition {
		name: content[name_start..name_end].to_string(),
		expression: content[body_start..cursor].to_string(),
		offset: start,
	};

	Some((definition, cursor + 2))
}

/// Try to match a full reference whose opening `{{` sits at `start`.
/// Returns the reference and the offset just past its closing `}}`.
fn reference_at(content: &str, start: usize) -> Option<(Reference, usize)> {
	let bytes = content.as_bytes();

	let name_start = start + 2;
	let mut cursor = name_start;
	while cursor < bytes.len() && is_word(bytes[cursor]) {
		cursor += 1;
	}
	if cursor == name_start || !bytes[cursor..].starts_with(b"}}") {
		return None;
	}

	let end = cursor + 2;
	let reference = Reference {
		name: content[name_start..cursor].to_string(),
		span: start..end,
	};

	Some((reference, end))
}

/// Scan a document for variable definitions and references. Matching is
/// non-overlapping and left to right; a malformed or unterminated
/// candidate produces nothing and scanning resumes one byte after its
/// opening delimiter, so a closing delimiter is free to serve as the next
/// opener. No side effects, no errors.
pub fn scan(content: &str) -> DocumentScan {
	let bytes = content.as_bytes();
	let mut scanned = DocumentScan::default();

	let mut pos = 0;
	while let Some(found) = memstr(&bytes[pos..], b"%%") {
		let start = pos + found;
		match definition_at(content, start) {
			Some((definition, end)) => {
				scanned.definitions.push(definition);
				pos = end;
			}
			None => pos = start + 1,
		}
	}

	pos = 0;
	while let Some(found) = memstr(&bytes[pos..], b"{{") {
		let start = pos + found;
		match reference_at(content, start) {
			Some((reference, end)) => {
				scanned.references.push(reference);
				pos = end;
			}
			None => pos = start + 1,
		}
	}

	scanned
}

/// 1-indexed line and column of a byte offset, for display purposes.
pub fn line_col(content: &str, offset: usize) -> (usize, usize) {
	let offset = offset.min(content.len());
	let before = &content[..offset];
	let line = before.matches('\n').count() + 1;
	let column = before.rfind('\n').map_or(offset, |idx| offset - idx - 1) + 1;
	(line, column)
}
