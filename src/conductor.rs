//! Flow conductor: the public orchestration facade.
//!
//! A [`Conductor`] ties the validated plan, the generated templates, and the
//! mutable session together behind one cloneable handle. Clones share state, so
//! a UI task and a worker task can observe the same flow. Locks guard only
//! in-memory state and are never held across request dispatch.

// self
use crate::{
	_prelude::*,
	config::FlowConfig,
	discovery::{self, EndpointSet},
	exec,
	http::FlowTransport,
	obs::{StepSpan, StepStage},
	plan::{ExecutionPlan, StepId, StepStatus},
	session::{Session, StepResponse},
	subst::{self, Resolver},
	template::{parser, TemplateRegistry},
};

/// Conductor backed by the bundled reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestConductor = Conductor<crate::http::ReqwestTransport>;

/// Outcome of one step execution attempt.
///
/// Preparation failures, transport errors, and HTTP error statuses all come
/// back as `success == false` with the recorded response; [`Conductor::run`]
/// returns `Err` only for misuse (unknown, manual, or blocked steps and
/// missing discovery).
#[derive(Clone, Debug)]
pub struct StepOutcome {
	/// Whether the step completed and the flow advanced.
	pub success: bool,
	/// Normalized response recorded for the step.
	pub response: StepResponse,
}

/// Orchestrates one token-exchange flow over a [`FlowTransport`].
#[derive(Debug)]
pub struct Conductor<T>
where
	T: ?Sized + FlowTransport,
{
	config: FlowConfig,
	secret: Option<String>,
	plan: Arc<ExecutionPlan>,
	templates: Arc<Mutex<Option<TemplateRegistry>>>,
	session: Arc<Mutex<Session>>,
	transport: Arc<T>,
}
impl<T> Conductor<T>
where
	T: ?Sized + FlowTransport,
{
	/// Builds a conductor from a validated flow configuration and a transport.
	pub fn with_transport(config: FlowConfig, transport: impl Into<Arc<T>>) -> Result<Self> {
		let plan = config.plan()?;
		let session = Session::new(&plan);

		Ok(Self {
			config,
			secret: None,
			plan: Arc::new(plan),
			templates: Arc::new(Mutex::new(None)),
			session: Arc::new(Mutex::new(session)),
			transport: transport.into(),
		})
	}

	/// Sets the external secret resolvable through the configured secret name.
	pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(secret.into());

		self
	}

	/// The validated execution plan.
	pub fn plan(&self) -> &ExecutionPlan {
		&self.plan
	}

	/// The flow configuration the conductor was built from.
	pub fn config(&self) -> &FlowConfig {
		&self.config
	}

	/// Current status of `step`.
	pub fn status(&self, step: &StepId) -> StepStatus {
		self.session.lock().status(step)
	}

	/// Recorded response of `step`, if it has executed.
	pub fn response(&self, step: &StepId) -> Option<StepResponse> {
		self.session.lock().response(step).cloned()
	}

	/// Whether the dependencies of `step` allow execution right now.
	pub fn can_execute(&self, step: &StepId) -> bool {
		self.session.lock().can_execute(&self.plan, step)
	}

	/// Discovered endpoint metadata, once discovery has run.
	pub fn endpoints(&self) -> Option<EndpointSet> {
		self.session.lock().endpoints().cloned()
	}

	/// Generated template of `step`, once templates exist.
	pub fn template(&self, step: &StepId) -> Option<String> {
		self.templates.lock().as_ref().and_then(|registry| registry.get(step)).map(ToOwned::to_owned)
	}

	/// Runs authorization server discovery and generates the request templates.
	pub async fn discover(&self, base_url: &str) -> Result<EndpointSet> {
		let (base, endpoints) = discovery::discover(&*self.transport, base_url).await?;

		self.install_endpoints(base, endpoints.clone());

		Ok(endpoints)
	}

	/// Installs endpoint metadata directly, bypassing the discovery fetch.
	///
	/// Useful when metadata was obtained out of band or cached from a prior run.
	pub fn install_endpoints(&self, base_url: Url, endpoints: EndpointSet) {
		let registry = TemplateRegistry::generate(
			&self.config.request_templates,
			&base_url,
			&endpoints,
			&self.config.endpoint_defaults,
			&self.config.secret_name,
			self.secret.as_deref(),
		);

		*self.templates.lock() = Some(registry);
		self.session.lock().install_endpoints(base_url, endpoints);
	}

	/// Executes `step`: parse its template, substitute placeholders, dispatch,
	/// record the response, and advance or reset the session.
	///
	/// Returns `Err` only for misuse; execution failures come back as a
	/// [`StepOutcome`] with `success == false` and the step reset to
	/// `Candidate` for retry.
	pub async fn run(&self, step: &StepId) -> Result<StepOutcome> {
		if !self.plan.contains(step) {
			return Err(Error::UnknownStep { step: step.to_string() });
		}
		if self.plan.is_manual(step) {
			return Err(Error::ManualStep { step: step.to_string() });
		}

		let template = self.template(step).ok_or(Error::TemplatesNotReady)?;
		// Snapshot under a short lock; the lock must not span the dispatch await.
		let (responses, base_url) = {
			let session = self.session.lock();

			if !session.can_execute(&self.plan, step) {
				return Err(Error::StepBlocked { step: step.to_string() });
			}

			(session.responses().clone(), session.base_url().cloned())
		};
		let request = {
			let _guard = StepSpan::new(step, StepStage::Prepare).entered();
			let parsed = match parser::parse_template(&template) {
				Ok(parsed) => parsed,
				Err(e) => {
					let response = StepResponse::error(e.to_string());
					let mut session = self.session.lock();

					session.record_response(step, response.clone());
					session.reset_on_failure(step);

					return Ok(StepOutcome { success: false, response });
				},
			};
			let resolver =
				Resolver::new(&responses, &self.config.secret_name, self.secret.as_deref());

			subst::apply_rules(parsed, &self.config.rules_for(step), &resolver)
		};
		let span = StepSpan::new(step, StepStage::Execute);
		let (success, response) =
			span.instrument(exec::execute(&*self.transport, base_url.as_ref(), request)).await;

		{
			let mut session = self.session.lock();

			session.record_response(step, response.clone());

			if success {
				session.advance_on_success(&self.plan, step);
			} else {
				session.reset_on_failure(step);
			}
		}

		Ok(StepOutcome { success, response })
	}
}
impl<T> Clone for Conductor<T>
where
	T: ?Sized + FlowTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			secret: self.secret.clone(),
			plan: self.plan.clone(),
			templates: self.templates.clone(),
			session: self.session.clone(),
			transport: self.transport.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::TransportError,
		http::{TransportFuture, WireReply, WireRequest},
	};

	const FLOW_YAML: &str = r#"
steps:
  - { id: a, title: Client Registration }
  - { id: b, title: Refresh Token Handover, manual: true }
  - { id: c, title: Token Exchange }
execution_order: [a, b, c]
dependencies:
  c: [a]
request_templates:
  a: 'curl -X POST {registration_endpoint} -d "scope=openid"'
  c: 'curl -X POST {token_endpoint} -d "subject_token={TOKEN}"'
substitution_rules:
  c:
    body:
      "{TOKEN}": a.access_token
"#;

	struct StaticTransport {
		body: &'static str,
	}
	impl FlowTransport for StaticTransport {
		fn send(&self, _: WireRequest) -> TransportFuture<'_, WireReply> {
			let body = self.body;

			Box::pin(async move {
				Ok::<_, TransportError>(WireReply {
					status: 200,
					reason: "OK".into(),
					body: body.into(),
				})
			})
		}
	}

	fn conductor(body: &'static str) -> Conductor<StaticTransport> {
		let config = FlowConfig::from_yaml_str(FLOW_YAML).expect("Flow YAML should deserialize.");

		Conductor::with_transport(config, StaticTransport { body })
			.expect("Flow configuration should produce a valid plan.")
	}

	fn id(value: &str) -> StepId {
		StepId::new(value).expect("Test step identifier should be valid.")
	}

	fn install(conductor: &Conductor<StaticTransport>) {
		let base = Url::parse("https://auth.example.org/").expect("Base URL should parse.");

		conductor.install_endpoints(base, EndpointSet::default());
	}

	#[tokio::test]
	async fn run_rejects_misuse() {
		let conductor = conductor("{}");

		assert!(matches!(
			conductor.run(&id("z")).await,
			Err(Error::UnknownStep { .. }),
		));
		assert!(matches!(
			conductor.run(&id("b")).await,
			Err(Error::ManualStep { .. }),
		));
		// Templates are not generated before discovery.
		assert!(matches!(conductor.run(&id("a")).await, Err(Error::TemplatesNotReady)));
	}

	#[tokio::test]
	async fn run_advances_the_session_on_success() {
		let conductor = conductor(r#"{"access_token":"tok-1"}"#);

		install(&conductor);

		let outcome = conductor.run(&id("a")).await.expect("Step a should run.");

		assert!(outcome.success);
		assert_eq!(conductor.status(&id("a")), StepStatus::Completed);
		// b is manual, so it gets promoted as the successor but never blocks c.
		assert_eq!(conductor.status(&id("b")), StepStatus::Candidate);
		assert!(conductor.can_execute(&id("c")));

		let outcome = conductor.run(&id("c")).await.expect("Step c should run.");

		assert!(outcome.success);
		assert_eq!(conductor.status(&id("c")), StepStatus::Completed);
	}

	#[tokio::test]
	async fn blocked_steps_are_refused_until_dependencies_complete() {
		let conductor = conductor("{}");

		install(&conductor);

		assert!(matches!(
			conductor.run(&id("c")).await,
			Err(Error::StepBlocked { .. }),
		));
	}

	#[tokio::test]
	async fn clones_share_session_state() {
		let conductor = conductor(r#"{"access_token":"tok-1"}"#);
		let observer = conductor.clone();

		install(&conductor);
		conductor.run(&id("a")).await.expect("Step a should run.");

		assert_eq!(observer.status(&id("a")), StepStatus::Completed);
		assert_eq!(
			observer
				.response(&id("a"))
				.and_then(|response| response.field("access_token").cloned()),
			Some(Value::String("tok-1".into())),
		);
	}

	#[tokio::test]
	async fn templates_resolve_endpoints_through_defaults() {
		let conductor = conductor("{}");

		install(&conductor);

		let template = conductor.template(&id("c")).expect("Template should be generated.");

		assert!(template.contains("https://auth.example.org/token"));
	}
}
