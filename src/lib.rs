//! Template-driven conductor for multi-step OAuth 2.0/OIDC token-exchange flows (RFC 8693) —
//! endpoint discovery, placeholder substitution, and dependency-gated step execution.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod conductor;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exec;
pub mod http;
pub mod obs;
pub mod plan;
pub mod session;
pub mod subst;
pub mod template;
#[cfg(feature = "reqwest")]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests, usable by this crate's integration tests
	//! and by downstream consumers wiring up their own.

	pub use crate::_prelude::*;

	// self
	use crate::{
		conductor::Conductor,
		config::FlowConfig,
		http::ReqwestTransport,
		plan::StepId,
	};

	/// Conductor type alias used by reqwest-backed integration tests.
	pub type ReqwestTestConductor = Conductor<ReqwestTransport>;

	/// Builds a reqwest transport that accepts self-signed certificates, for tests that
	/// target local mock servers.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs a [`Conductor`] backed by the reqwest transport used across integration tests.
	pub fn build_reqwest_test_conductor(config: FlowConfig) -> ReqwestTestConductor {
		Conductor::with_transport(config, test_reqwest_transport())
			.expect("Test flow configuration should produce a valid plan.")
	}

	/// Shorthand for step identifiers inside test fixtures.
	pub fn step(id: &str) -> StepId {
		StepId::new(id).expect("Test step identifier should be valid.")
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {httpmock as _, tokio as _};
