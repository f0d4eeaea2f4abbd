//! Placeholder resolution and substitution over parsed requests.
//!
//! Substitution rules map literal placeholders (`{ACCESS_TOKEN}`) to source
//! references: either `stepId.fieldName` pointing into a recorded step response
//! or the reserved secret name. Resolution failures never abort a step; the
//! placeholder is replaced with a visible `<reference>` marker so the resulting
//! request (and the server's complaint about it) shows exactly what was missing.

// self
use crate::{
	_prelude::*,
	config::StepRules,
	obs,
	plan::StepId,
	session::StepResponse,
	template::{body, Body, ParsedRequest},
};

/// Resolves source references against recorded responses and the secret.
///
/// Borrows the conductor's state snapshot for the duration of one substitution
/// pass; nothing here mutates.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
	responses: &'a HashMap<StepId, StepResponse>,
	secret_name: &'a str,
	secret: Option<&'a str>,
}
impl<'a> Resolver<'a> {
	/// Creates a resolver over a response snapshot.
	pub fn new(
		responses: &'a HashMap<StepId, StepResponse>,
		secret_name: &'a str,
		secret: Option<&'a str>,
	) -> Self {
		Self { responses, secret_name, secret }
	}

	/// Resolves one source reference to its replacement text.
	///
	/// Unresolvable references degrade to `<reference>` rather than failing.
	pub fn resolve(&self, reference: &str) -> String {
		if reference == self.secret_name {
			if self.secret.is_none() {
				obs::warn_degraded("Secret reference used but no secret is set.", reference);
			}

			return self.secret.unwrap_or_default().to_owned();
		}
		if let Some((step, field)) = reference.split_once('.')
			&& let Ok(step) = StepId::new(step)
			&& let Some(value) = self.responses.get(&step).and_then(|response| response.field(field))
		{
			return body::coerce_string(value);
		}

		obs::warn_degraded("Unresolvable substitution reference.", reference);

		format!("<{reference}>")
	}
}

/// Applies a step's substitution rules to its parsed request.
///
/// URL, header, body, and auth rules each touch only their own request part.
/// Body substitution recurses through JSON structure, replacing placeholders
/// inside nested strings while leaving non-string values untouched.
pub fn apply_rules(request: ParsedRequest, rules: &StepRules, resolver: &Resolver) -> ParsedRequest {
	let ParsedRequest { method, mut url, mut headers, mut body, mut auth } = request;

	for (placeholder, reference) in &rules.url {
		if url.contains(placeholder.as_str()) {
			url = url.replace(placeholder.as_str(), &resolver.resolve(reference));
		}
	}
	for (placeholder, reference) in &rules.headers {
		for value in headers.values_mut() {
			if value.contains(placeholder.as_str()) {
				*value = value.replace(placeholder.as_str(), &resolver.resolve(reference));
			}
		}
	}
	if !rules.body.is_empty() {
		body = substitute_body(body, &rules.body, resolver);
	}
	if let Some(credentials) = auth.as_mut() {
		for (placeholder, reference) in &rules.auth {
			if credentials.username.contains(placeholder.as_str()) {
				credentials.username =
					credentials.username.replace(placeholder.as_str(), &resolver.resolve(reference));
			}
			if credentials.password.contains(placeholder.as_str()) {
				credentials.password =
					credentials.password.replace(placeholder.as_str(), &resolver.resolve(reference));
			}
		}
	}

	ParsedRequest { method, url, headers, body, auth }
}

fn substitute_body(body: Body, rules: &HashMap<String, String>, resolver: &Resolver) -> Body {
	match body {
		Body::Empty => Body::Empty,
		Body::Text(text) => Body::Text(substitute_text(text, rules, resolver)),
		Body::Map(map) => Body::Map(
			map.into_iter()
				.map(|(key, value)| (key, substitute_value(value, rules, resolver)))
				.collect(),
		),
		Body::List(items) => Body::List(
			items.into_iter().map(|value| substitute_value(value, rules, resolver)).collect(),
		),
	}
}

fn substitute_value(value: Value, rules: &HashMap<String, String>, resolver: &Resolver) -> Value {
	match value {
		Value::String(text) => Value::String(substitute_text(text, rules, resolver)),
		Value::Array(items) =>
			Value::Array(items.into_iter().map(|item| substitute_value(item, rules, resolver)).collect()),
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(key, value)| (key, substitute_value(value, rules, resolver)))
				.collect(),
		),
		other => other,
	}
}

fn substitute_text(mut text: String, rules: &HashMap<String, String>, resolver: &Resolver) -> String {
	for (placeholder, reference) in rules {
		if text.contains(placeholder.as_str()) {
			text = text.replace(placeholder.as_str(), &resolver.resolve(reference));
		}
	}

	text
}
