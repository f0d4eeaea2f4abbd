//! Conductor-level error types shared across configuration, templates, and transport.
//!
//! Failures that occur while a step is executing (network errors, HTTP >= 400,
//! undecodable response bodies) deliberately do not surface here; the orchestration
//! boundary absorbs them into failed [`StepOutcome`](crate::conductor::StepOutcome)s
//! so a flow can be retried without tearing the session down.

// self
use crate::_prelude::*;

/// Conductor-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical conductor error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Request template could not be parsed into a request.
	#[error(transparent)]
	Template(#[from] TemplateError),
	/// Authorization server discovery failed.
	#[error(transparent)]
	Discovery(#[from] DiscoveryError),
	/// Transport failure outside of step execution (e.g. during discovery).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The requested step is not part of the execution plan.
	#[error("Step `{step}` is not part of the execution plan.")]
	UnknownStep {
		/// Identifier of the unknown step.
		step: String,
	},
	/// The requested step is a manual, out-of-band action and cannot be executed.
	#[error("Step `{step}` is manual and cannot be executed by the conductor.")]
	ManualStep {
		/// Identifier of the manual step.
		step: String,
	},
	/// The step's dependencies are not satisfied yet.
	#[error("Step `{step}` is blocked by incomplete dependencies.")]
	StepBlocked {
		/// Identifier of the blocked step.
		step: String,
	},
	/// Templates have not been generated; run discovery or install endpoints first.
	#[error("Request templates are not generated yet; discover the server first.")]
	TemplatesNotReady,
}

/// Configuration and validation failures raised while loading a flow.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Flow configuration document could not be deserialized.
	#[error("Flow configuration could not be parsed.")]
	Parse {
		/// Structured parsing failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_yaml::Error>,
	},
	/// Step identifier failed validation.
	#[error(transparent)]
	InvalidStepId(#[from] crate::plan::StepIdError),
	/// The execution order is empty.
	#[error("Execution order must contain at least one step.")]
	EmptyExecutionOrder,
	/// A step identifier appears more than once in the definitions.
	#[error("Step `{step}` is defined more than once.")]
	DuplicateStep {
		/// Duplicated step identifier.
		step: String,
	},
	/// The execution order references an undefined step.
	#[error("Execution order references undefined step `{step}`.")]
	UnknownOrderStep {
		/// Unresolved step identifier.
		step: String,
	},
	/// The dependency graph references an undefined step.
	#[error("Dependency `{dependency}` of step `{step}` is undefined.")]
	UnknownDependency {
		/// Step whose dependency list is invalid.
		step: String,
		/// Unresolved dependency identifier.
		dependency: String,
	},
	/// The dependency graph contains a cycle.
	#[error("Dependency graph contains a cycle through step `{step}`.")]
	DependencyCycle {
		/// Step on the detected cycle.
		step: String,
	},
	/// A non-manual step in the execution order has no request template.
	#[error("Step `{step}` has no request template.")]
	MissingTemplate {
		/// Step lacking a template.
		step: String,
	},
}

/// Template parsing failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TemplateError {
	/// No absolute `http(s)` URL could be determined from the template.
	#[error("Template does not declare an absolute http(s) URL (found `{found}`).")]
	MissingUrl {
		/// Whatever URL-like text was assembled, possibly empty.
		found: String,
	},
	/// The template declares an HTTP method the executor refuses to send.
	#[error("Unsupported HTTP method `{method}`; only GET and POST are allowed.")]
	UnsupportedMethod {
		/// Declared method verb.
		method: String,
	},
}

/// Authorization server discovery failures.
#[derive(Debug, ThisError)]
pub enum DiscoveryError {
	/// The supplied base URL is not an absolute `http(s)` URL.
	#[error("Server URL `{url}` is not a valid http(s) URL.")]
	InvalidBaseUrl {
		/// Rejected base URL.
		url: String,
	},
	/// The discovery endpoint answered with an error status.
	#[error("Discovery endpoint returned HTTP {status} {reason}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Status reason phrase.
		reason: String,
	},
	/// The discovery document could not be decoded.
	#[error("Discovery endpoint returned an invalid metadata document.")]
	Document {
		/// Structured parsing failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The metadata document omits endpoints the flow cannot run without.
	#[error("Discovery document is missing required endpoints: {}.", missing.join(", "))]
	MissingEndpoints {
		/// Names of the absent required endpoints.
		missing: Vec<&'static str>,
	},
	/// Transport-level failure while fetching the metadata document.
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Transport-level failures (network, timeout, TLS).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure or timeout.
	#[error("Network error occurred while sending the request: {source}.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl Into<BoxError>) -> Self {
		Self::Network { source: src.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
