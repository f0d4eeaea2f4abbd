//! Step lifecycle states tracked by the session state machine.

// self
use crate::_prelude::*;

/// Lifecycle state of a single step within one orchestration session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
	#[default]
	/// Dependencies are not satisfied; the step cannot run yet.
	NotCandidate,
	/// The step is unlocked and may be executed (or retried after a failure).
	Candidate,
	/// The step executed successfully; only a successful re-run keeps it here.
	Completed,
}
impl StepStatus {
	/// Returns a stable label suitable for logs and UI layers.
	pub const fn as_str(self) -> &'static str {
		match self {
			StepStatus::NotCandidate => "not_candidate",
			StepStatus::Candidate => "candidate",
			StepStatus::Completed => "completed",
		}
	}

	/// Whether the step has completed successfully.
	pub const fn is_completed(self) -> bool {
		matches!(self, StepStatus::Completed)
	}
}
impl Display for StepStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
