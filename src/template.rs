//! Request template registry.
//!
//! After discovery, raw configuration templates still carry endpoint
//! placeholders such as `{token_endpoint}` and the secret placeholder (by
//! default `{api_key}`). [`TemplateRegistry::generate`] resolves both up front
//! so the parser only ever sees concrete URLs; dynamic placeholders like
//! `{ACCESS_TOKEN}` stay untouched for the substitution engine.

pub mod body;
pub use body::Body;
pub mod parser;
pub use parser::ParsedRequest;

// self
use crate::{
	_prelude::*,
	discovery::{self, EndpointName, EndpointSet},
	obs,
	plan::StepId,
};

/// Per-step request templates with endpoints and the secret already substituted.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
	templates: HashMap<StepId, String>,
}
impl TemplateRegistry {
	/// Generates executable templates from the raw configured ones.
	///
	/// Every endpoint placeholder resolves to the discovered URL when the
	/// metadata document declared it, otherwise to the configured default path
	/// joined onto `base`, otherwise to a built-in fallback path. Blank raw
	/// templates (manual steps) are skipped entirely.
	pub fn generate(
		raw_templates: &HashMap<StepId, String>,
		base: &Url,
		endpoints: &EndpointSet,
		defaults: &HashMap<String, String>,
		secret_name: &str,
		secret: Option<&str>,
	) -> Self {
		let resolved: Vec<(String, String)> = EndpointName::ALL
			.into_iter()
			.map(|name| (name.placeholder(), resolve_endpoint(name, base, endpoints, defaults)))
			.collect();
		let secret_placeholder = format!("{{{secret_name}}}");
		let templates = raw_templates
			.iter()
			.filter(|(_, raw)| !raw.trim().is_empty())
			.map(|(step, raw)| {
				let mut template = raw.clone();

				for (placeholder, url) in &resolved {
					if template.contains(placeholder.as_str()) {
						template = template.replace(placeholder.as_str(), url);
					}
				}
				if template.contains(&secret_placeholder) {
					if secret.is_none() {
						obs::warn_degraded("Secret placeholder found but no secret is set.", step);
					}

					template = template.replace(&secret_placeholder, secret.unwrap_or_default());
				}

				(step.clone(), template)
			})
			.collect();

		Self { templates }
	}

	/// Generated template for `step`, if one exists.
	pub fn get(&self, step: &StepId) -> Option<&str> {
		self.templates.get(step).map(String::as_str)
	}

	/// Number of generated templates.
	pub fn len(&self) -> usize {
		self.templates.len()
	}

	/// Whether no templates were generated.
	pub fn is_empty(&self) -> bool {
		self.templates.is_empty()
	}
}

fn resolve_endpoint(
	name: EndpointName,
	base: &Url,
	endpoints: &EndpointSet,
	defaults: &HashMap<String, String>,
) -> String {
	if let Some(url) = endpoints.get(name) {
		return url.to_owned();
	}

	let path = defaults.get(name.as_str()).map(String::as_str).unwrap_or(name.default_path());

	discovery::join_base(base, path)
}
