//! Optional observability helpers for step orchestration.
//!
//! Enable the `tracing` feature (on by default) to emit structured spans named
//! `conductor.step` with the `step` and `stage` fields, plus warnings whenever
//! the engine degrades gracefully (unresolved placeholders, endpoint fallbacks).
//! Without the feature every helper compiles down to a no-op.

// self
use crate::{_prelude::*, plan::StepId};

/// Orchestration stages observed per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepStage {
	/// Template parsing and placeholder substitution.
	Prepare,
	/// HTTP dispatch and response normalization.
	Execute,
}
impl StepStage {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StepStage::Prepare => "prepare",
			StepStage::Execute => "execute",
		}
	}
}
impl Display for StepStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStep<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStep<F> = F;

/// A span builder used around step orchestration stages.
#[derive(Clone, Debug)]
pub struct StepSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StepSpan {
	/// Creates a new span tagged with the provided step + stage.
	pub fn new(step: &StepId, stage: StepStage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("conductor.step", step = %step, stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (step, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> StepSpanGuard {
		#[cfg(feature = "tracing")]
		{
			StepSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			StepSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStep<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`StepSpan::entered`].
pub struct StepSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for StepSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StepSpanGuard(..)")
	}
}

/// Records a graceful degradation (the flow continues with a fallback value).
pub(crate) fn warn_degraded(message: &str, subject: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(subject, "{message}");
	#[cfg(not(feature = "tracing"))]
	let _ = (message, subject);
}
