//! Validated step identifiers used across the conductor domain.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const STEP_ID_MAX_LEN: usize = 64;

/// Error returned when step identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum StepIdError {
	/// The identifier was empty.
	#[error("Step identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Step identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("Step identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Identifier of a single flow step.
///
/// The shipped token-exchange configurations use single letters (`a`..`j`), but any
/// whitespace-free token works; ordering between steps comes from the execution
/// order, never from the identifier itself.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepId(String);
impl StepId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, StepIdError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for StepId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for StepId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<StepId> for String {
	fn from(value: StepId) -> Self {
		value.0
	}
}
impl TryFrom<String> for StepId {
	type Error = StepIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for StepId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for StepId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Step({})", self.0)
	}
}
impl Display for StepId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for StepId {
	type Err = StepIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), StepIdError> {
	if view.is_empty() {
		return Err(StepIdError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(StepIdError::ContainsWhitespace);
	}
	if view.len() > STEP_ID_MAX_LEN {
		return Err(StepIdError::TooLong { max: STEP_ID_MAX_LEN });
	}

	Ok(())
}
