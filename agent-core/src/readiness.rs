//! Process-wide readiness flag.
//!
//! Same shape as `agent_core::readiness::Ready` elsewhere in this stack
//! (referenced from `management::readiness_server`): a cheaply `Clone`-able
//! handle around a single atomic, set by the operator/startup sequence and
//! read by the `/ready` endpoint. That version additionally tracks a set of
//! pending component names; this gateway has exactly one process-wide ready
//! bit, so that bookkeeping is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Default)]
pub struct Ready(Arc<AtomicBool>);

impl Ready {
	pub fn new() -> Self {
		Self(Arc::new(AtomicBool::new(false)))
	}

	pub fn set_ready(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_ready(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}
