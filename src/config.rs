//! Declarative flow configuration: step metadata, execution order, dependency
//! graph, raw request templates, substitution rules, and endpoint defaults.
//!
//! A configuration document is usually authored in YAML:
//!
//! ```yaml
//! steps:
//!   - { id: a, title: Backend Client Registration }
//!   - { id: b, title: Refresh Token Handover, manual: true }
//! execution_order: [a, b]
//! dependencies:
//!   b: [a]
//! request_templates:
//!   a: |
//!     curl -X POST {registration_endpoint} \
//!       -H "Content-Type: application/json" \
//!       -d '{"grant_types": ["client_credentials"]}'
//! ```

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	plan::{ExecutionPlan, StepDefinition, StepId},
};

/// Reference name under which the external secret is resolvable (e.g. `{api_key}`
/// placeholders and `api_key` substitution sources).
pub const DEFAULT_SECRET_NAME: &str = "api_key";

/// Substitution rules for a single step, grouped by the request field they apply to.
///
/// Each map entry associates a literal placeholder (e.g. `{ACCESS_TOKEN}`) with a
/// source reference: either `stepId.fieldName` pointing into a prior step response
/// or the reserved secret name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRules {
	/// Placeholders replaced inside the request URL.
	#[serde(default)]
	pub url: HashMap<String, String>,
	/// Placeholders replaced inside every header value.
	#[serde(default)]
	pub headers: HashMap<String, String>,
	/// Placeholders replaced throughout the request body.
	#[serde(default)]
	pub body: HashMap<String, String>,
	/// Placeholders replaced inside both basic-auth components.
	#[serde(default)]
	pub auth: HashMap<String, String>,
}
impl StepRules {
	/// Whether the rule set contains no rules at all.
	pub fn is_empty(&self) -> bool {
		self.url.is_empty() && self.headers.is_empty() && self.body.is_empty() && self.auth.is_empty()
	}
}

/// Complete declarative description of one token-exchange flow.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FlowConfig {
	/// Step definitions (id, title, manual flag).
	pub steps: Vec<StepDefinition>,
	/// Order in which steps unlock; the first entry starts as a candidate.
	pub execution_order: Vec<StepId>,
	/// Dependency graph: step -> steps that must complete first.
	#[serde(default)]
	pub dependencies: HashMap<StepId, Vec<StepId>>,
	/// Raw request templates per step, with endpoint/secret placeholders intact.
	#[serde(default)]
	pub request_templates: HashMap<StepId, String>,
	/// Substitution rules per step.
	#[serde(default)]
	pub substitution_rules: HashMap<StepId, StepRules>,
	/// Default endpoint paths (by metadata field name) used when discovery omits one.
	#[serde(default)]
	pub endpoint_defaults: HashMap<String, String>,
	/// Reserved source-reference name resolving to the external secret.
	#[serde(default = "default_secret_name")]
	pub secret_name: String,
}
impl FlowConfig {
	/// Parses a YAML configuration document.
	pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
		let deserializer = serde_yaml::Deserializer::from_str(text);

		serde_path_to_error::deserialize(deserializer)
			.map_err(|source| ConfigError::Parse { source })
	}

	/// Builds the validated [`ExecutionPlan`] and checks that every non-manual
	/// step in the execution order carries a request template.
	pub fn plan(&self) -> Result<ExecutionPlan, ConfigError> {
		let plan = ExecutionPlan::new(
			self.steps.clone(),
			self.execution_order.clone(),
			self.dependencies.clone(),
		)?;

		for step in plan.order() {
			if plan.is_manual(step) {
				continue;
			}
			if self.request_templates.get(step).map(|t| t.trim().is_empty()).unwrap_or(true) {
				return Err(ConfigError::MissingTemplate { step: step.to_string() });
			}
		}

		Ok(plan)
	}

	/// Substitution rules for `step`, empty when none are configured.
	pub fn rules_for(&self, step: &StepId) -> StepRules {
		self.substitution_rules.get(step).cloned().unwrap_or_default()
	}
}

fn default_secret_name() -> String {
	DEFAULT_SECRET_NAME.into()
}
