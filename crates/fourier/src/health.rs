// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Liveness tracking for the ingress and egress listeners.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Readiness flags shared between the listeners and the liveness probe.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    ingress: Arc<AtomicBool>,
    egress: Arc<AtomicBool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker connection acknowledged and telemetry topic subscribed
    pub fn set_ingress(&self, ready: bool) {
        self.ingress.store(ready, Ordering::SeqCst);
    }

    /// HTTP listener bound
    pub fn set_egress(&self, ready: bool) {
        self.egress.store(ready, Ordering::SeqCst);
    }

    pub fn ingress(&self) -> bool {
        self.ingress.load(Ordering::SeqCst)
    }

    pub fn egress(&self) -> bool {
        self.egress.load(Ordering::SeqCst)
    }

    /// Healthy only once both sides finished startup.
    pub fn is_ready(&self) -> bool {
        self.ingress() && self.egress()
    }
}
