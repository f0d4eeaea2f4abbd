//! Request body representation and content classification.

// self
use crate::_prelude::*;

/// Tagged request body shape produced by the template parser.
///
/// The substitution engine and executor match on this exhaustively instead of
/// re-sniffing text at every call site.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
	/// No body declared.
	Empty,
	/// Opaque text; sent verbatim unless the content type says JSON.
	Text(String),
	/// Decoded JSON object or form-encoded pairs, key order preserved.
	Map(JsonMap<String, Value>),
	/// Decoded JSON array.
	List(Vec<Value>),
}
impl Body {
	/// Classifies assembled body text into its structured shape.
	///
	/// JSON-looking text (leading `{`, `[`, or `"`) is decoded as JSON and falls
	/// back to [`Body::Text`] verbatim when the decode fails. Text containing
	/// `=` is treated as form-encoded pairs with percent-decoded keys and
	/// values. Anything else stays opaque.
	pub fn classify(text: &str) -> Self {
		let trimmed = text.trim();

		if trimmed.is_empty() {
			return Self::Empty;
		}
		if trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"') {
			return match decode_json(trimmed) {
				Ok(Value::Object(map)) => Self::Map(map),
				Ok(Value::Array(items)) => Self::List(items),
				// A bare JSON string unquotes; other scalars and failures stay raw.
				Ok(Value::String(text)) => Self::Text(text),
				Ok(_) | Err(_) => Self::Text(trimmed.to_owned()),
			};
		}
		if trimmed.contains('=') {
			return match serde_urlencoded::from_str::<Vec<(String, String)>>(trimmed) {
				Ok(pairs) => Self::Map(
					pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect(),
				),
				Err(_) => Self::Text(trimmed.to_owned()),
			};
		}

		Self::Text(trimmed.to_owned())
	}

	/// Whether the body is [`Body::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}
}

/// Decodes text as a JSON document.
pub fn decode_json(text: &str) -> Result<Value, serde_json::Error> {
	serde_json::from_str(text)
}

/// Coerces a JSON value to the string form used in substitutions and form fields.
///
/// Strings pass through without quotes; every other value renders as compact JSON.
pub fn coerce_string(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}
