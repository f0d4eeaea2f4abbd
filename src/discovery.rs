//! Authorization server discovery via the RFC 8414 well-known metadata document.
//!
//! Discovery validates the operator-supplied base URL, fetches
//! `/.well-known/oauth-authorization-server`, and decodes the endpoint metadata
//! the template registry substitutes into raw request templates. Absent optional
//! endpoints degrade to configured or built-in default paths; absent required
//! endpoints abort discovery.

// self
use crate::{
	_prelude::*,
	error::DiscoveryError,
	http::{FlowTransport, WireRequest},
	obs,
};

/// Well-known path of the authorization server metadata document.
pub const WELL_KNOWN_PATH: &str = ".well-known/oauth-authorization-server";

/// Named endpoints the conductor knows how to substitute into templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointName {
	/// Issuer identifier.
	Issuer,
	/// Authorization endpoint.
	Authorization,
	/// Token endpoint.
	Token,
	/// Userinfo endpoint.
	Userinfo,
	/// Token introspection endpoint.
	Introspection,
	/// Dynamic client registration endpoint.
	Registration,
	/// RP-initiated logout endpoint.
	EndSession,
	/// JSON Web Key Set document.
	Jwks,
	/// Device authorization endpoint (RFC 8628).
	DeviceAuthorization,
}
impl EndpointName {
	/// Every endpoint name, in metadata-document order.
	pub const ALL: [EndpointName; 9] = [
		EndpointName::Issuer,
		EndpointName::Authorization,
		EndpointName::Token,
		EndpointName::Userinfo,
		EndpointName::Introspection,
		EndpointName::Registration,
		EndpointName::EndSession,
		EndpointName::Jwks,
		EndpointName::DeviceAuthorization,
	];
	/// Endpoints a flow cannot run without.
	pub const REQUIRED: [EndpointName; 4] = [
		EndpointName::Issuer,
		EndpointName::Registration,
		EndpointName::Authorization,
		EndpointName::Token,
	];

	/// Metadata field name (doubles as the `endpoint_defaults` configuration key).
	pub const fn as_str(self) -> &'static str {
		match self {
			EndpointName::Issuer => "issuer",
			EndpointName::Authorization => "authorization_endpoint",
			EndpointName::Token => "token_endpoint",
			EndpointName::Userinfo => "userinfo_endpoint",
			EndpointName::Introspection => "introspection_endpoint",
			EndpointName::Registration => "registration_endpoint",
			EndpointName::EndSession => "end_session_endpoint",
			EndpointName::Jwks => "jwks_uri",
			EndpointName::DeviceAuthorization => "device_authorization_endpoint",
		}
	}

	/// Placeholder token recognized inside raw request templates.
	pub fn placeholder(self) -> String {
		format!("{{{}}}", self.as_str())
	}

	/// Built-in fallback path used when neither discovery nor configuration
	/// supplies the endpoint.
	pub const fn default_path(self) -> &'static str {
		match self {
			EndpointName::Issuer => "",
			EndpointName::Authorization => "/authorize",
			EndpointName::Token => "/token",
			EndpointName::Userinfo => "/userinfo",
			EndpointName::Introspection => "/introspect",
			EndpointName::Registration => "/register",
			EndpointName::EndSession => "/logout",
			EndpointName::Jwks => "/jwks",
			EndpointName::DeviceAuthorization => "/device/authorize",
		}
	}
}
impl Display for EndpointName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Endpoint metadata decoded from the well-known document.
///
/// Every endpoint is optional at the type level; [`EndpointSet::missing_required`]
/// reports which of the mandatory four are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSet {
	/// Issuer identifier URL.
	#[serde(default)]
	pub issuer: Option<String>,
	/// Authorization endpoint URL.
	#[serde(default)]
	pub authorization_endpoint: Option<String>,
	/// Token endpoint URL.
	#[serde(default)]
	pub token_endpoint: Option<String>,
	/// Userinfo endpoint URL.
	#[serde(default)]
	pub userinfo_endpoint: Option<String>,
	/// Introspection endpoint URL.
	#[serde(default)]
	pub introspection_endpoint: Option<String>,
	/// Dynamic client registration endpoint URL.
	#[serde(default)]
	pub registration_endpoint: Option<String>,
	/// End-session (logout) endpoint URL.
	#[serde(default)]
	pub end_session_endpoint: Option<String>,
	/// JWKS document URL.
	#[serde(default)]
	pub jwks_uri: Option<String>,
	/// Device authorization endpoint URL.
	#[serde(default)]
	pub device_authorization_endpoint: Option<String>,
	/// Scopes advertised by the server.
	#[serde(default)]
	pub scopes_supported: Vec<String>,
	/// Response types advertised by the server.
	#[serde(default)]
	pub response_types_supported: Vec<String>,
	/// Grant types advertised by the server.
	#[serde(default)]
	pub grant_types_supported: Vec<String>,
}
impl EndpointSet {
	/// Discovered URL for the named endpoint, if any.
	pub fn get(&self, name: EndpointName) -> Option<&str> {
		let slot = match name {
			EndpointName::Issuer => &self.issuer,
			EndpointName::Authorization => &self.authorization_endpoint,
			EndpointName::Token => &self.token_endpoint,
			EndpointName::Userinfo => &self.userinfo_endpoint,
			EndpointName::Introspection => &self.introspection_endpoint,
			EndpointName::Registration => &self.registration_endpoint,
			EndpointName::EndSession => &self.end_session_endpoint,
			EndpointName::Jwks => &self.jwks_uri,
			EndpointName::DeviceAuthorization => &self.device_authorization_endpoint,
		};

		slot.as_deref()
	}

	/// Required endpoints that the document did not declare.
	pub fn missing_required(&self) -> Vec<&'static str> {
		EndpointName::REQUIRED
			.into_iter()
			.filter(|name| self.get(*name).is_none())
			.map(EndpointName::as_str)
			.collect()
	}
}

/// Parses and normalizes the operator-supplied server base URL.
///
/// Only absolute `http(s)` URLs are accepted; a trailing slash is appended so
/// relative joins behave predictably.
pub fn parse_base_url(raw: &str) -> Result<Url, DiscoveryError> {
	if !raw.starts_with("http://") && !raw.starts_with("https://") {
		return Err(DiscoveryError::InvalidBaseUrl { url: raw.to_owned() });
	}

	let normalized = format!("{}/", raw.trim_end_matches('/'));

	Url::parse(&normalized).map_err(|_| DiscoveryError::InvalidBaseUrl { url: raw.to_owned() })
}

/// Joins an absolute path onto a base URL without double slashes.
pub fn join_base(base: &Url, path: &str) -> String {
	format!("{}{path}", base.as_str().trim_end_matches('/'))
}

/// Fetches and validates the authorization server metadata document.
///
/// Returns the normalized base URL together with the decoded endpoint set.
pub async fn discover<T>(transport: &T, base_url: &str) -> Result<(Url, EndpointSet), DiscoveryError>
where
	T: ?Sized + FlowTransport,
{
	let base = parse_base_url(base_url)?;
	let discovery_url = join_base(&base, &format!("/{WELL_KNOWN_PATH}"));
	let reply = transport.send(WireRequest::get(discovery_url)).await?;

	if reply.status >= 400 {
		return Err(DiscoveryError::Http { status: reply.status, reason: reply.reason });
	}

	let deserializer = &mut serde_json::Deserializer::from_str(&reply.body);
	let endpoints: EndpointSet = serde_path_to_error::deserialize(deserializer)
		.map_err(|source| DiscoveryError::Document { source })?;
	let missing = endpoints.missing_required();

	if !missing.is_empty() {
		return Err(DiscoveryError::MissingEndpoints { missing });
	}

	for name in EndpointName::ALL {
		if endpoints.get(name).is_none() {
			obs::warn_degraded("Endpoint not discovered; defaults will apply.", name.as_str());
		}
	}

	Ok((base, endpoints))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn base_url_requires_http_scheme() {
		assert!(matches!(
			parse_base_url("ftp://example.org"),
			Err(DiscoveryError::InvalidBaseUrl { .. }),
		));
		assert!(matches!(parse_base_url(""), Err(DiscoveryError::InvalidBaseUrl { .. })));

		let base = parse_base_url("https://auth.example.org").expect("HTTPS URL should parse.");

		assert_eq!(base.as_str(), "https://auth.example.org/");
	}

	#[test]
	fn join_base_avoids_double_slashes() {
		let base = parse_base_url("https://auth.example.org/").expect("Base URL should parse.");

		assert_eq!(join_base(&base, "/device"), "https://auth.example.org/device");
	}

	#[test]
	fn missing_required_reports_absent_mandatory_endpoints() {
		let endpoints = EndpointSet {
			issuer: Some("https://auth.example.org".into()),
			token_endpoint: Some("https://auth.example.org/token".into()),
			..EndpointSet::default()
		};
		let missing = endpoints.missing_required();

		assert_eq!(missing, vec!["registration_endpoint", "authorization_endpoint"]);
	}

	#[test]
	fn metadata_document_tolerates_unknown_fields() {
		let document = r#"{
			"issuer": "https://auth.example.org",
			"authorization_endpoint": "https://auth.example.org/authorize",
			"token_endpoint": "https://auth.example.org/token",
			"registration_endpoint": "https://auth.example.org/register",
			"scopes_supported": ["openid", "profile"],
			"claims_parameter_supported": false
		}"#;
		let endpoints: EndpointSet =
			serde_json::from_str(document).expect("Metadata document should decode.");

		assert!(endpoints.missing_required().is_empty());
		assert_eq!(endpoints.scopes_supported, vec!["openid", "profile"]);
		assert_eq!(endpoints.get(EndpointName::DeviceAuthorization), None);
	}
}
