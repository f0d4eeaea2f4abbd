// crates.io
use httpmock::prelude::*;
// self
use oauth2_conductor::{_preludet::*, config::FlowConfig, plan::StepStatus};

const FLOW_YAML: &str = r#"
steps:
  - { id: a, title: Dynamic Client Registration }
  - { id: b, title: Operator Approval, manual: true }
  - { id: c, title: Device Authorization }
  - { id: d, title: Token Exchange }
  - { id: e, title: Userinfo Lookup }
execution_order: [a, b, c, d, e]
dependencies:
  c: [a]
  d: [a, b, c]
  e: [d]
request_templates:
  a: |
    curl -X POST {registration_endpoint} \
      -H "Content-Type: application/json" \
      -d '{
        "client_name": "conductor-it",
        "grant_types": ["urn:ietf:params:oauth:grant-type:token-exchange"]
      }'
  c: |
    curl -X POST {device_authorization_endpoint} \
      -d "client_id={CLIENT_ID}" \
      "scope=openid"
  d: |
    curl -X POST {token_endpoint} \
      -u "{CLIENT_ID}:{CLIENT_SECRET}" \
      -d "grant_type=urn:ietf:params:oauth:grant-type:token-exchange" \
      "subject_token={DEVICE_CODE}"
  e: |
    curl -X GET {userinfo_endpoint}?access_token={ACCESS_TOKEN} \
      -H "Authorization: Bearer {ACCESS_TOKEN}"
substitution_rules:
  c:
    body:
      "{CLIENT_ID}": a.client_id
  d:
    auth:
      "{CLIENT_ID}": a.client_id
      "{CLIENT_SECRET}": a.client_secret
    body:
      "{DEVICE_CODE}": c.device_code
  e:
    url:
      "{ACCESS_TOKEN}": d.access_token
    headers:
      "{ACCESS_TOKEN}": d.access_token
"#;

fn build_conductor() -> ReqwestTestConductor {
	let config = FlowConfig::from_yaml_str(FLOW_YAML).expect("Flow YAML should deserialize.");

	build_reqwest_test_conductor(config)
}

async fn mock_metadata(server: &MockServer) {
	let metadata = format!(
		r#"{{
			"issuer": "{base}",
			"authorization_endpoint": "{base}/authorize",
			"token_endpoint": "{base}/token",
			"registration_endpoint": "{base}/register",
			"device_authorization_endpoint": "{base}/device",
			"userinfo_endpoint": "{base}/userinfo"
		}}"#,
		base = server.base_url(),
	);

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/.well-known/oauth-authorization-server");
			then.status(200).header("content-type", "application/json").body(metadata);
		})
		.await;
}

#[tokio::test]
async fn full_flow_carries_values_between_steps() {
	let server = MockServer::start_async().await;

	mock_metadata(&server).await;

	let register = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"client_id":"client-123","client_secret":"cs-9"}"#);
		})
		.await;
	let device = server
		.mock_async(|when, then| {
			when.method(POST).path("/device");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"device_code":"dev-42","user_code":"ABCD","verification_uri":"/activate"}"#);
		})
		.await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"at-7","issued_token_type":"urn:ietf:params:oauth:token-type:access_token"}"#);
		})
		.await;
	// Both the query parameter and the header prove end-to-end substitution of
	// the access token issued two steps earlier.
	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/userinfo")
				.query_param("access_token", "at-7")
				.header("authorization", "Bearer at-7");
			then.status(200).header("content-type", "application/json").body(r#"{"sub":"user-1"}"#);
		})
		.await;
	let conductor = build_conductor();

	conductor.discover(&server.base_url()).await.expect("Discovery should succeed.");

	assert_eq!(conductor.status(&step("a")), StepStatus::Candidate);

	let outcome = conductor.run(&step("a")).await.expect("Registration step should run.");

	assert!(outcome.success);
	assert_eq!(conductor.status(&step("a")), StepStatus::Completed);
	// The manual approval step is promoted as the successor but never executed.
	assert_eq!(conductor.status(&step("b")), StepStatus::Candidate);
	assert!(conductor.can_execute(&step("c")));

	let outcome = conductor.run(&step("c")).await.expect("Device step should run.");

	assert!(outcome.success);
	// Relative verification URIs are rewritten onto the server base.
	assert_eq!(
		outcome.response.field("verification_uri").and_then(|value| value.as_str()),
		Some(format!("{}/activate", server.base_url()).as_str()),
	);
	// The pending manual approval does not block the token exchange.
	assert!(conductor.can_execute(&step("d")));

	let outcome = conductor.run(&step("d")).await.expect("Token exchange step should run.");

	assert!(outcome.success);
	assert_eq!(
		outcome.response.field("access_token").and_then(|value| value.as_str()),
		Some("at-7"),
	);
	assert_eq!(outcome.response.status(), Some(200));

	let outcome = conductor.run(&step("e")).await.expect("Userinfo step should run.");

	assert!(outcome.success);
	assert_eq!(outcome.response.field("sub").and_then(|value| value.as_str()), Some("user-1"));

	register.assert_async().await;
	device.assert_async().await;
	token.assert_async().await;
	userinfo.assert_async().await;
}

#[tokio::test]
async fn failed_steps_reset_and_can_be_retried() {
	let server = MockServer::start_async().await;

	mock_metadata(&server).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client"}"#);
		})
		.await;
	let conductor = build_conductor();

	conductor.discover(&server.base_url()).await.expect("Discovery should succeed.");

	let outcome = conductor.run(&step("a")).await.expect("Failed step should not be an Err.");

	assert!(!outcome.success);
	assert_eq!(outcome.response.status(), Some(401));
	assert_eq!(
		outcome.response.field("error").and_then(|value| value.as_str()),
		Some("invalid_client"),
	);
	// The step stays retryable and the failure response is recorded.
	assert_eq!(conductor.status(&step("a")), StepStatus::Candidate);
	assert_eq!(
		conductor.response(&step("a")).as_ref().and_then(|response| response.status()),
		Some(401),
	);

	rejected.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"client_id":"client-123","client_secret":"cs-9"}"#);
		})
		.await;

	let outcome = conductor.run(&step("a")).await.expect("Retried step should run.");

	assert!(outcome.success);
	assert_eq!(conductor.status(&step("a")), StepStatus::Completed);
}

#[tokio::test]
async fn unresolved_references_reach_the_server_as_markers() {
	let server = MockServer::start_async().await;

	mock_metadata(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"client_id":"client-123"}"#);
		})
		.await;

	// Device step substituting from a step that never ran: the placeholder
	// degrades to a visible marker instead of aborting the request.
	let yaml = r#"
steps:
  - { id: a, title: Registration }
  - { id: c, title: Device Authorization }
execution_order: [a, c]
dependencies:
  c: [a]
request_templates:
  a: 'curl -X POST {registration_endpoint} -d "scope=openid"'
  c: |
    curl -X POST {device_authorization_endpoint} \
      -H "X-Client: {CLIENT_ID}" \
      -d "scope=openid"
substitution_rules:
  c:
    headers:
      "{CLIENT_ID}": z.client_id
"#;
	let marker = server
		.mock_async(|when, then| {
			when.method(POST).path("/device").header("x-client", "<z.client_id>");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_request"}"#);
		})
		.await;
	let config = FlowConfig::from_yaml_str(yaml).expect("Flow YAML should deserialize.");
	let conductor = build_reqwest_test_conductor(config);

	conductor.discover(&server.base_url()).await.expect("Discovery should succeed.");
	conductor.run(&step("a")).await.expect("Registration step should run.");

	let outcome = conductor.run(&step("c")).await.expect("Device step should run.");

	assert!(!outcome.success);

	marker.assert_async().await;
}

#[tokio::test]
async fn running_before_discovery_is_refused() {
	let conductor = build_conductor();

	assert!(matches!(conductor.run(&step("a")).await, Err(Error::TemplatesNotReady)));
}

#[tokio::test]
async fn installed_endpoints_bypass_the_discovery_fetch() {
	let server = MockServer::start_async().await;
	let register = server
		.mock_async(|when, then| {
			when.method(POST).path("/register");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"client_id":"client-123"}"#);
		})
		.await;
	let conductor = build_conductor();
	let base = Url::parse(&format!("{}/", server.base_url()))
		.expect("Mock server base URL should parse.");

	// No metadata mock exists; endpoints come from cached metadata and the
	// registration endpoint falls back to the built-in path.
	conductor.install_endpoints(base, Default::default());

	let outcome = conductor.run(&step("a")).await.expect("Registration step should run.");

	assert!(outcome.success);

	register.assert_async().await;
}
