//! Step request execution: payload encoding, dispatch, and response
//! normalization.
//!
//! The executor never returns `Err` for server-side failures; transport errors
//! and HTTP error statuses both produce a normalized failure response so the
//! conductor records what happened and leaves the step retryable.

// self
use crate::{
	_prelude::*,
	discovery,
	error::TemplateError,
	http::{FlowTransport, Payload, WireMethod, WireRequest},
	session::StepResponse,
	template::{body, Body, ParsedRequest},
};

/// Executes one fully substituted request and normalizes the reply.
///
/// Returns the success flag (`status < 400` and no transport error) together
/// with the recorded response. `base_url` feeds the `verification_uri` rewrite
/// for servers that return relative device-flow URIs.
pub async fn execute<T>(
	transport: &T,
	base_url: Option<&Url>,
	request: ParsedRequest,
) -> (bool, StepResponse)
where
	T: ?Sized + FlowTransport,
{
	let method = match request.method.as_str() {
		"GET" => WireMethod::Get,
		"POST" => WireMethod::Post,
		other => {
			let e = TemplateError::UnsupportedMethod { method: other.to_owned() };

			return (false, StepResponse::error(e.to_string()));
		},
	};
	let payload = match method {
		WireMethod::Get => Payload::None,
		WireMethod::Post => encode_payload(request.body, content_type(&request.headers)),
	};
	let wire = WireRequest {
		method,
		url: request.url,
		headers: request.headers,
		payload,
		auth: request.auth,
	};
	let reply = match transport.send(wire).await {
		Ok(reply) => reply,
		Err(e) => return (false, StepResponse::error(e.to_string())),
	};
	let mut fields = normalize_body(&reply.body);

	rewrite_verification_uris(&mut fields, base_url);

	let success = reply.status < 400;
	let response =
		StepResponse::from_fields(fields).with_transport_status(reply.status, reply.reason);

	(success, response)
}

fn content_type(headers: &HashMap<String, String>) -> Option<&str> {
	headers
		.iter()
		.find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
		.map(|(_, value)| value.as_str())
}

/// Picks the wire encoding for a `POST` body.
///
/// Structured maps default to form encoding, matching what token endpoints
/// expect, and switch to JSON when a non-form content type is declared.
/// Opaque text is re-decoded as JSON when the content type is JSON, so hand
/// written bodies with odd quoting still serialize canonically.
fn encode_payload(request_body: Body, content_type: Option<&str>) -> Payload {
	// Header values match case-insensitively.
	let content_type = content_type.map(str::to_ascii_lowercase);
	let json_declared =
		content_type.as_deref().is_some_and(|ct| ct.contains("application/json"));
	// An absent content type defaults maps to form encoding; any declared
	// non-form, non-multipart type switches them to JSON.
	let form_declared = content_type
		.as_deref()
		.is_none_or(|ct| ct.contains("form-urlencoded") || ct.contains("multipart/form-data"));

	match request_body {
		Body::Empty => Payload::None,
		Body::Map(map) =>
			if form_declared {
				Payload::Form(
					map.into_iter().map(|(key, value)| (key, body::coerce_string(&value))).collect(),
				)
			} else {
				Payload::Json(Value::Object(map))
			},
		Body::List(items) => Payload::Json(Value::Array(items)),
		Body::Text(text) =>
			if json_declared && let Ok(value) = body::decode_json(&text) {
				Payload::Json(value)
			} else {
				Payload::Raw(text)
			},
	}
}

/// Normalizes a reply body into the recorded field map.
///
/// JSON objects pass through; any other reply (arrays, scalars, plain text,
/// empty bodies) is wrapped under a `response` key.
fn normalize_body(raw: &str) -> JsonMap<String, Value> {
	match body::decode_json(raw) {
		Ok(Value::Object(map)) => map,
		Ok(other) => JsonMap::from_iter([("response".to_owned(), other)]),
		Err(_) => JsonMap::from_iter([("response".to_owned(), Value::String(raw.to_owned()))]),
	}
}

// Some servers return device-flow verification URIs as absolute paths; rewrite
// them onto the server base so operators can follow them directly.
fn rewrite_verification_uris(fields: &mut JsonMap<String, Value>, base_url: Option<&Url>) {
	let Some(base) = base_url else {
		return;
	};

	for (name, value) in fields.iter_mut() {
		if !name.starts_with("verification_uri") {
			continue;
		}
		if let Value::String(uri) = value
			&& uri.starts_with('/')
		{
			*value = Value::String(discovery::join_base(base, uri));
		}
	}
}
