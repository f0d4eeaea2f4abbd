//! Parser turning one raw request template into a structured [`ParsedRequest`].
//!
//! Templates use the shell-style command notation operators already know:
//!
//! ```text
//! curl -X POST https://auth.example.org/token \
//!   -H "Content-Type: application/x-www-form-urlencoded" \
//!   -u "{CLIENT_ID}:{CLIENT_SECRET}" \
//!   -d "grant_type=client_credentials" \
//!   "scope=openid"
//! ```
//!
//! Exactly four line classes are recognized: the request line (`curl -X`),
//! header lines (`-H`), body lines (`-d` plus unprefixed continuations), and
//! basic-auth lines (`-u`). An unprefixed line carrying an absolute URL serves
//! as a fallback when the request line omits one. This is deliberately not a
//! general command-line grammar.

// self
use crate::{_prelude::*, error::TemplateError, http::BasicAuth, template::Body};

/// Structured request descriptor produced from one template.
///
/// Built fresh per execution attempt; substitution consumes and rebuilds it, so
/// instances are never shared across steps.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRequest {
	/// Declared HTTP method verb, uppercased by convention in templates.
	pub method: String,
	/// Absolute request URL.
	pub url: String,
	/// Header name/value pairs; insertion order is irrelevant.
	pub headers: HashMap<String, String>,
	/// Structured request body.
	pub body: Body,
	/// Optional basic-auth credential pair.
	pub auth: Option<BasicAuth>,
}

/// Parses a raw template into a [`ParsedRequest`].
///
/// Fails with [`TemplateError::MissingUrl`] when no absolute `http(s)` URL can
/// be determined from either the request line or a fallback line.
pub fn parse_template(template: &str) -> Result<ParsedRequest, TemplateError> {
	let mut method = String::from("GET");
	let mut url = String::new();
	let mut headers = HashMap::new();
	let mut auth = None;
	let mut fragments: Vec<String> = Vec::new();
	let mut in_body = false;

	for raw in split_logical_lines(template) {
		let line = clean_line(raw);

		if line.is_empty() {
			continue;
		}

		if let Some(rest) = line.strip_prefix("curl -X") {
			let mut tokens = rest.split_whitespace();

			if let Some(verb) = tokens.next() {
				method = verb.to_owned();
			}
			if url.is_empty()
				&& let Some(candidate) = tokens.next()
			{
				let candidate = trim_quotes(candidate);

				if has_scheme(candidate) {
					url = candidate.to_owned();
				}
			}
		} else if let Some(rest) = line.strip_prefix("-H") {
			let header = trim_quotes(rest.trim());

			if let Some((name, value)) = header.split_once(':') {
				headers.insert(name.trim().to_owned(), value.trim().to_owned());
			}
		} else if let Some(rest) = line.strip_prefix("-d") {
			fragments.push(trim_quotes(rest.trim()).to_owned());
			in_body = true;
		} else if let Some(rest) = line.strip_prefix("-u") {
			let credentials = trim_quotes(rest.trim());

			if let Some((username, password)) = credentials.split_once(':') {
				auth = Some(BasicAuth {
					username: username.to_owned(),
					password: password.to_owned(),
				});
			}
		} else if in_body && !line.starts_with('-') && !line.starts_with("curl") {
			fragments.push(line.to_owned());
		} else if url.is_empty()
			&& let Some(token) =
				line.split_whitespace().map(trim_quotes).find(|token| has_scheme(token))
		{
			url = token.to_owned();
		}
	}

	if !has_scheme(&url) {
		return Err(TemplateError::MissingUrl { found: url });
	}

	let body = assemble_body(&fragments);

	Ok(ParsedRequest { method, url, headers, body, auth })
}

/// Splits a template into logical lines on the escaped-newline marker or on
/// literal newlines; a template with neither is a single line.
fn split_logical_lines(template: &str) -> Vec<&str> {
	if template.contains("\\n") {
		template.split("\\n").collect()
	} else if template.contains('\n') {
		template.lines().collect()
	} else {
		vec![template]
	}
}

/// Trims whitespace and the trailing `\` continuation marker from one line.
fn clean_line(raw: &str) -> &str {
	let line = raw.trim();

	line.strip_suffix('\\').map(str::trim_end).unwrap_or(line)
}

fn trim_quotes(text: &str) -> &str {
	text.trim_matches(|c| c == '"' || c == '\'')
}

fn has_scheme(text: &str) -> bool {
	text.starts_with("http://") || text.starts_with("https://")
}

/// Joins collected body fragments into the text handed to [`Body::classify`].
///
/// A JSON body (first fragment starting with `{` or `[`) is concatenated
/// verbatim so internal quoting survives; only a dangling shell quote at the
/// very end is dropped. Form fragments lose one layer of surrounding quotes
/// each and are joined with `&` when any of them carries a `=` pair.
fn assemble_body(fragments: &[String]) -> Body {
	let Some(first) = fragments.first() else {
		return Body::Empty;
	};

	if first.trim_start().starts_with(['{', '[']) {
		let mut joined: String = fragments.concat();

		while joined.ends_with(['\'', '"']) {
			// Closing shell quote; valid JSON starting with `{`/`[` never ends on one.
			joined.pop();
		}

		return Body::classify(&joined);
	}

	let cleaned: Vec<&str> =
		fragments.iter().map(|fragment| trim_quotes(fragment.trim())).filter(|f| !f.is_empty()).collect();
	let joined = match cleaned.as_slice() {
		[] => String::new(),
		[single] => (*single).to_owned(),
		many if many.iter().any(|fragment| fragment.contains('=')) => many.join("&"),
		many => many.concat(),
	};

	Body::classify(&joined)
}
