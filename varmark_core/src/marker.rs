/// Default class token carried by every marker this engine emits.
pub const DEFAULT_MARKER_CLASS: &str = "varmark-ref";

/// Start delimiter of a marker's opening tag, used for the backward
/// search when an existing marker is rewritten in place.
pub const TAG_START: &str = "<span";

/// A marker's closing tag.
pub const CLOSING_TAG: &str = "</span>";

/// The inline markup vocabulary wrapping a resolved reference.
///
/// A wrapped reference looks like:
///
/// ```html
/// <span class="varmark-ref" data-variable="total" data-value="42">{{total}}</span>
/// ```
///
/// The literal reference text stays inside the marker so the host can
/// toggle between showing the value (preview) and the raw reference
/// (editing) without re-running the engine. The class token is the
/// engine's ownership signature: markup without it is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSyntax {
	class: String,
	opening_signature: String,
}

impl Default for MarkerSyntax {
	fn default() -> Self {
		Self::new(DEFAULT_MARKER_CLASS)
	}
}

impl MarkerSyntax {
	pub fn new(class: impl Into<String>) -> Self {
		let class = class.into();
		let opening_signature = format!("class=\"{class}\"");

		Self {
			class,
			opening_signature,
		}
	}

	/// The configured class token.
	pub fn class(&self) -> &str {
		&self.class
	}

	/// The substring that identifies one of this engine's opening tags.
	pub fn opening_signature(&self) -> &str {
		&self.opening_signature
	}

	/// Construct a fresh opening tag carrying the current value. The
	/// attribute payloads come from the scanner's restricted character
	/// classes (`\w` names, `[\w\s+\-*/().]` expressions, or stringified
	/// numbers), none of which can contain quotes or angle brackets, so no
	/// escaping is required.
	pub fn opening_tag(&self, variable: &str, value: &str) -> String {
		format!(
			"<span class=\"{}\" data-variable=\"{variable}\" data-value=\"{value}\">",
			self.class
		)
	}

	/// Whether the text immediately following a reference is this marker's
	/// closing signature.
	pub fn has_closing_signature(&self, following: &str) -> bool {
		following.starts_with(CLOSING_TAG)
	}
}

/// Forward substring search over raw bytes.
pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}

/// Backward substring search over raw bytes, returning the start of the
/// last occurrence.
pub fn rmemstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() || haystack.len() < needle.len() {
		return None;
	}

	haystack
		.windows(needle.len())
		.rposition(|window| window == needle)
}
