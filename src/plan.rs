//! Static description of a flow: step definitions, execution order, and the
//! dependency graph. Loaded once from configuration and never mutated afterwards.

pub mod id;
pub mod status;

pub use id::*;
pub use status::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable definition of one flow step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
	/// Step identifier.
	pub id: StepId,
	/// Human-readable title shown by UI layers.
	pub title: String,
	/// Optional longer description.
	#[serde(default)]
	pub description: Option<String>,
	/// Manual steps represent out-of-band human actions; the conductor never
	/// executes them and dependency gating skips them when incomplete.
	#[serde(default)]
	pub manual: bool,
}

/// Validated execution plan: definitions, order, and dependency graph.
///
/// Construction rejects empty orders, duplicate or undefined step references,
/// and cyclic dependency graphs, so the rest of the crate can treat the plan
/// as well-formed.
#[derive(Clone, Debug)]
pub struct ExecutionPlan {
	definitions: HashMap<StepId, StepDefinition>,
	order: Vec<StepId>,
	dependencies: HashMap<StepId, Vec<StepId>>,
}
impl ExecutionPlan {
	/// Builds and validates a plan from its parts.
	pub fn new(
		definitions: Vec<StepDefinition>,
		order: Vec<StepId>,
		dependencies: HashMap<StepId, Vec<StepId>>,
	) -> Result<Self, ConfigError> {
		if order.is_empty() {
			return Err(ConfigError::EmptyExecutionOrder);
		}

		let mut map = HashMap::with_capacity(definitions.len());

		for definition in definitions {
			let step = definition.id.clone();

			if map.insert(step.clone(), definition).is_some() {
				return Err(ConfigError::DuplicateStep { step: step.to_string() });
			}
		}

		let plan = Self { definitions: map, order, dependencies };

		plan.validate()?;

		Ok(plan)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for step in &self.order {
			if !self.definitions.contains_key(step) {
				return Err(ConfigError::UnknownOrderStep { step: step.to_string() });
			}
		}
		for (step, deps) in &self.dependencies {
			if !self.definitions.contains_key(step) {
				return Err(ConfigError::UnknownOrderStep { step: step.to_string() });
			}

			for dependency in deps {
				if !self.definitions.contains_key(dependency) {
					return Err(ConfigError::UnknownDependency {
						step: step.to_string(),
						dependency: dependency.to_string(),
					});
				}
			}
		}

		self.check_acyclic()
	}

	// Iterative DFS with a three-color marking; a back edge is a cycle.
	fn check_acyclic(&self) -> Result<(), ConfigError> {
		#[derive(Clone, Copy, PartialEq)]
		enum Mark {
			Visiting,
			Done,
		}

		let mut marks: HashMap<&StepId, Mark> = HashMap::new();

		for root in self.dependencies.keys() {
			if marks.contains_key(root) {
				continue;
			}

			let mut stack = vec![(root, false)];

			while let Some((step, expanded)) = stack.pop() {
				if expanded {
					marks.insert(step, Mark::Done);

					continue;
				}

				// A node can sit on the stack twice when two parents queued it before
				// either was expanded; only the dependency scan below detects cycles.
				if marks.contains_key(step) {
					continue;
				}

				marks.insert(step, Mark::Visiting);
				stack.push((step, true));

				for dependency in self.dependencies(step) {
					match marks.get(dependency) {
						Some(Mark::Visiting) =>
							return Err(ConfigError::DependencyCycle {
								step: dependency.to_string(),
							}),
						Some(Mark::Done) => {},
						None => stack.push((dependency, false)),
					}
				}
			}
		}

		Ok(())
	}

	/// First step of the execution order; the initial `Candidate`.
	pub fn first(&self) -> &StepId {
		// The constructor rejects empty orders.
		&self.order[0]
	}

	/// Full execution order.
	pub fn order(&self) -> &[StepId] {
		&self.order
	}

	/// Step immediately following `step` in the execution order, if any.
	pub fn successor_of(&self, step: &StepId) -> Option<&StepId> {
		let index = self.order.iter().position(|candidate| candidate == step)?;

		self.order.get(index + 1)
	}

	/// Declared dependencies of `step` (empty when unconstrained).
	pub fn dependencies(&self, step: &StepId) -> &[StepId] {
		self.dependencies.get(step).map(Vec::as_slice).unwrap_or_default()
	}

	/// Definition of `step`, if it exists.
	pub fn definition(&self, step: &StepId) -> Option<&StepDefinition> {
		self.definitions.get(step)
	}

	/// Whether the plan contains `step`.
	pub fn contains(&self, step: &StepId) -> bool {
		self.definitions.contains_key(step)
	}

	/// Whether `step` is declared manual.
	pub fn is_manual(&self, step: &StepId) -> bool {
		self.definitions.get(step).map(|definition| definition.manual).unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn id(value: &str) -> StepId {
		StepId::new(value).expect("Test step identifier should be valid.")
	}

	fn definition(value: &str, manual: bool) -> StepDefinition {
		StepDefinition {
			id: id(value),
			title: format!("Step {value}"),
			description: None,
			manual,
		}
	}

	#[test]
	fn plan_validates_references_and_order() {
		let err = ExecutionPlan::new(vec![definition("a", false)], vec![], HashMap::new())
			.expect_err("Empty execution order should be rejected.");

		assert!(matches!(err, ConfigError::EmptyExecutionOrder));

		let err = ExecutionPlan::new(vec![definition("a", false)], vec![id("b")], HashMap::new())
			.expect_err("Unknown order step should be rejected.");

		assert!(matches!(err, ConfigError::UnknownOrderStep { .. }));

		let err = ExecutionPlan::new(
			vec![definition("a", false)],
			vec![id("a")],
			HashMap::from_iter([(id("a"), vec![id("z")])]),
		)
		.expect_err("Unknown dependency should be rejected.");

		assert!(matches!(err, ConfigError::UnknownDependency { .. }));
	}

	#[test]
	fn plan_rejects_dependency_cycles() {
		let err = ExecutionPlan::new(
			vec![definition("a", false), definition("b", false)],
			vec![id("a"), id("b")],
			HashMap::from_iter([(id("a"), vec![id("b")]), (id("b"), vec![id("a")])]),
		)
		.expect_err("Cyclic graph should be rejected.");

		assert!(matches!(err, ConfigError::DependencyCycle { .. }));
	}

	#[test]
	fn plan_exposes_order_and_successors() {
		let plan = ExecutionPlan::new(
			vec![definition("a", false), definition("b", false), definition("c", true)],
			vec![id("a"), id("b"), id("c")],
			HashMap::from_iter([(id("b"), vec![id("a")])]),
		)
		.expect("Well-formed plan should build.");

		assert_eq!(plan.first(), &id("a"));
		assert_eq!(plan.successor_of(&id("a")), Some(&id("b")));
		assert_eq!(plan.successor_of(&id("c")), None);
		assert_eq!(plan.dependencies(&id("b")), &[id("a")]);
		assert!(plan.dependencies(&id("a")).is_empty());
		assert!(plan.is_manual(&id("c")));
		assert!(!plan.is_manual(&id("a")));
	}
}
