//! Mutable per-flow session state: step statuses, recorded responses, and the
//! promotion rules that drive the flow forward.
//!
//! The conductor owns a session behind a mutex; everything here is synchronous
//! and cheap so locks are never held across request dispatch.

// self
use crate::{
	_prelude::*,
	discovery::EndpointSet,
	plan::{ExecutionPlan, StepId, StepStatus},
};

/// Synthetic response field carrying the HTTP status code.
pub const STATUS_FIELD: &str = "_http_status";
/// Synthetic response field carrying the HTTP reason phrase.
pub const REASON_FIELD: &str = "_http_reason";

/// Normalized response recorded for one step execution.
///
/// Always an ordered field map. Non-object server replies are wrapped under a
/// `response` key and transport failures become an `error` field, so
/// substitution sources can reference any outcome uniformly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepResponse(JsonMap<String, Value>);
impl StepResponse {
	/// Wraps an already-normalized field map.
	pub fn from_fields(fields: JsonMap<String, Value>) -> Self {
		Self(fields)
	}

	/// Builds a failure response from a transport or preparation error message.
	pub fn error(message: impl Into<String>) -> Self {
		let mut fields = JsonMap::new();

		fields.insert("error".into(), Value::String(message.into()));

		Self(fields)
	}

	/// Appends the synthetic status fields recorded alongside every HTTP reply.
	pub fn with_transport_status(mut self, status: u16, reason: impl Into<String>) -> Self {
		self.0.insert(STATUS_FIELD.into(), Value::from(status));
		self.0.insert(REASON_FIELD.into(), Value::String(reason.into()));

		self
	}

	/// Looks up a field by name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// Recorded HTTP status code, if the step reached the server.
	pub fn status(&self) -> Option<u16> {
		self.0.get(STATUS_FIELD).and_then(Value::as_u64).map(|status| status as _)
	}

	/// Recorded HTTP reason phrase, if the step reached the server.
	pub fn reason(&self) -> Option<&str> {
		self.0.get(REASON_FIELD).and_then(Value::as_str)
	}

	/// All recorded fields in insertion order.
	pub fn fields(&self) -> &JsonMap<String, Value> {
		&self.0
	}
}

/// Mutable state of one flow run.
#[derive(Clone, Debug, Default)]
pub struct Session {
	statuses: HashMap<StepId, StepStatus>,
	responses: HashMap<StepId, StepResponse>,
	endpoints: Option<EndpointSet>,
	base_url: Option<Url>,
}
impl Session {
	/// Creates the initial session for `plan`: every step `NotCandidate` except
	/// the first in the execution order, which starts as `Candidate`.
	pub fn new(plan: &ExecutionPlan) -> Self {
		let mut statuses: HashMap<_, _> =
			plan.order().iter().map(|step| (step.clone(), StepStatus::NotCandidate)).collect();

		statuses.insert(plan.first().clone(), StepStatus::Candidate);

		Self { statuses, responses: HashMap::new(), endpoints: None, base_url: None }
	}

	/// Current status of `step`; unknown steps read as `NotCandidate`.
	pub fn status(&self, step: &StepId) -> StepStatus {
		self.statuses.get(step).copied().unwrap_or_default()
	}

	/// Recorded response of `step`, if it has executed.
	pub fn response(&self, step: &StepId) -> Option<&StepResponse> {
		self.responses.get(step)
	}

	/// All recorded responses.
	pub fn responses(&self) -> &HashMap<StepId, StepResponse> {
		&self.responses
	}

	/// Discovered endpoint metadata, once discovery has run.
	pub fn endpoints(&self) -> Option<&EndpointSet> {
		self.endpoints.as_ref()
	}

	/// Normalized server base URL, once discovery has run.
	pub fn base_url(&self) -> Option<&Url> {
		self.base_url.as_ref()
	}

	/// Records the discovery outcome.
	pub fn install_endpoints(&mut self, base_url: Url, endpoints: EndpointSet) {
		self.base_url = Some(base_url);
		self.endpoints = Some(endpoints);
	}

	/// Records the response of one execution attempt, replacing any prior one.
	pub fn record_response(&mut self, step: &StepId, response: StepResponse) {
		self.responses.insert(step.clone(), response);
	}

	/// Whether `step` is unblocked: every dependency is either completed or a
	/// manual step (manual actions happen out of band and never block).
	pub fn can_execute(&self, plan: &ExecutionPlan, step: &StepId) -> bool {
		plan.dependencies(step)
			.iter()
			.all(|dependency| self.status(dependency).is_completed() || plan.is_manual(dependency))
	}

	/// Applies the promotion rules after `step` succeeded.
	///
	/// The step itself becomes `Completed`, its successor in the execution order
	/// is promoted to `Candidate` unless already completed, and any step whose
	/// remaining incomplete dependencies are all manual unlocks as well.
	pub fn advance_on_success(&mut self, plan: &ExecutionPlan, step: &StepId) {
		self.statuses.insert(step.clone(), StepStatus::Completed);

		if let Some(successor) = plan.successor_of(step)
			&& self.status(successor) != StepStatus::Completed
		{
			self.statuses.insert(successor.clone(), StepStatus::Candidate);
		}

		self.promote_manual_bypass(plan);
	}

	/// Resets `step` to `Candidate` after a failed attempt so it can be retried.
	pub fn reset_on_failure(&mut self, step: &StepId) {
		self.statuses.insert(step.clone(), StepStatus::Candidate);
	}

	// Promotes steps gated only by pending manual actions: every non-manual
	// dependency completed, at least one manual dependency not yet completed.
	fn promote_manual_bypass(&mut self, plan: &ExecutionPlan) {
		let unlocked: Vec<StepId> = plan
			.order()
			.iter()
			.filter(|step| self.status(step) == StepStatus::NotCandidate)
			.filter(|step| {
				let dependencies = plan.dependencies(step);

				!dependencies.is_empty()
					&& dependencies.iter().any(|dependency| {
						plan.is_manual(dependency) && !self.status(dependency).is_completed()
					}) && dependencies.iter().all(|dependency| {
						plan.is_manual(dependency) || self.status(dependency).is_completed()
					})
			})
			.cloned()
			.collect();

		for step in unlocked {
			self.statuses.insert(step, StepStatus::Candidate);
		}
	}
}
