use crate::env::Environment;
use crate::marker::CLOSING_TAG;
use crate::marker::MarkerSyntax;
use crate::marker::TAG_START;
use crate::marker::rmemstr;
use crate::scanner::Reference;

/// Default lookback window (bytes) searched for an existing opening tag
/// immediately preceding a reference. The effective window for a given
/// reference is never smaller than the opening tag this run would itself
/// emit, so a marker the engine wrote is always found on the next run.
pub const DEFAULT_LOOKBACK: usize = 256;

/// Rewrite the document so every resolved reference is wrapped by exactly
/// one up-to-date marker. A single left-to-right pass rebuilds the output
/// buffer; text outside markers is copied through byte for byte.
///
/// Classification is the dual-signature check: a reference counts as
/// already-wrapped only when the opening signature appears in the lookback
/// window as a complete tag ending at the reference AND the closing tag
/// directly follows the reference. Everything else is bare. Malformed
/// half-markers (one signature missing) are classified as bare and wrapped
/// fresh, leaving the stale fragment untouched rather than corrupting it.
pub fn reconcile(
	source: &str,
	references: &[Reference],
	env: &Environment,
	marker: &MarkerSyntax,
	lookback: usize,
) -> String {
	let mut output = String::with_capacity(source.len());
	let mut cursor = 0;

	for reference in references {
		if reference.span.start < cursor {
			continue;
		}

		output.push_str(&source[cursor..reference.span.start]);
		let reference_text = &source[reference.span.clone()];
		let following = &source[reference.span.end..];

		let Some(value) = env.get(&reference.name) else {
			// Unresolved references stay textually unchanged. If a previous
			// run wrapped this reference and its definition has since been
			// deleted, strip the stale wrapper so the literal text survives.
			let wrapped = marker.has_closing_signature(following)
				.then(|| preceding_tag_start(source, reference.span.start, marker, lookback))
				.flatten()
				.filter(|&tag_start| tail_is_verbatim(&output, source, tag_start, reference.span.start));

			match wrapped {
				Some(tag_start) => {
					output.truncate(output.len() - (reference.span.start - tag_start));
					output.push_str(reference_text);
					cursor = reference.span.end + CLOSING_TAG.len();
				}
				None => {
					output.push_str(reference_text);
					cursor = reference.span.end;
				}
			}
			continue;
		};

		let value_text = value.to_string();
		let opening_tag = marker.opening_tag(&reference.name, &value_text);
		// Widen the window to at least this run's own tag so rewrapping
		// stays idempotent even for long names or raw fallback values.
		let window = lookback.max(opening_tag.len());

		let wrapped = marker.has_closing_signature(following)
			.then(|| preceding_tag_start(source, reference.span.start, marker, window))
			.flatten()
			.filter(|&tag_start| tail_is_verbatim(&output, source, tag_start, reference.span.start));

		match wrapped {
			Some(tag_start) => {
				// Remove the stale opening tag already emitted, then rewrite
				// it with the current value. The pre-existing closing tag is
				// copied through verbatim after the reference.
				output.truncate(output.len() - (reference.span.start - tag_start));
				output.push_str(&opening_tag);
				output.push_str(reference_text);
				cursor = reference.span.end;
			}
			None => {
				output.push_str(&opening_tag);
				output.push_str(reference_text);
				output.push_str(CLOSING_TAG);
				cursor = reference.span.end;
			}
		}
	}

	output.push_str(&source[cursor..]);
	output
}

/// Truncating the output back to a candidate tag's start is only valid
/// when that tag's source span was copied through verbatim. A malformed
/// fragment carrying the marker signature can contain an earlier
/// reference that this run already rewrote; the output tail then differs
/// from the source span and truncation would cut into the rewritten
/// marker. Such a candidate must be treated as bare instead.
fn tail_is_verbatim(output: &str, source: &str, tag_start: usize, reference_start: usize) -> bool {
	output.ends_with(&source[tag_start..reference_start])
}

/// Search the lookback window immediately preceding a reference for the
/// start of one of this engine's opening tags. Returns the tag's byte
/// offset only when the candidate is a complete opening tag that ends
/// exactly at the reference, so unrelated markup further back can never be
/// spliced out.
fn preceding_tag_start(
	source: &str,
	reference_start: usize,
	marker: &MarkerSyntax,
	window: usize,
) -> Option<usize> {
	let window_start = reference_start.saturating_sub(window);
	let window_bytes = &source.as_bytes()[window_start..reference_start];

	// Nearest opening signature before the reference, then backward again
	// to the tag's start delimiter.
	let signature_pos = rmemstr(window_bytes, marker.opening_signature().as_bytes())?;
	let tag_pos = rmemstr(&window_bytes[..signature_pos], TAG_START.as_bytes())?;
	let tag_start = window_start + tag_pos;

	let tag = &source[tag_start..reference_start];
	is_complete_opening_tag(tag).then_some(tag_start)
}

/// A complete opening tag runs from its `<` to a single `>` with no other
/// angle brackets in between. Anything else is a fragment of unrelated or
/// corrupted markup and must not be truncated out of the output.
fn is_complete_opening_tag(tag: &str) -> bool {
	let Some(body) = tag.strip_suffix('>') else {
		return false;
	};

	!body.contains('>') && !body[1..].contains('<')
}
