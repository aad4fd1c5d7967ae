//! Routing Test Utilities
//!
//! A scriptable [`GenerationPrimitive`] for exercising routing without any
//! backend. It walks the fallback chain like a real primitive would, records
//! every call, and lets tests mark backends as failing or unavailable.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::primitive::{GenerationOutput, GenerationPrimitive, GenerationRequest, GenerationStatus, StreamEvent};

// ============================================================================
// Call Tracking
// ============================================================================

/// Kind of primitive call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Generate,
    Stream,
}

/// Captured primitive call
#[derive(Clone, Debug)]
pub struct PrimitiveCall {
    pub kind: CallKind,
    pub chain: Vec<String>,
    pub request_id: String,
    pub max_tokens: Option<u32>,
}

// ============================================================================
// Mock Primitive
// ============================================================================

/// Mock generation primitive
#[derive(Debug, Default)]
pub struct MockPrimitive {
    /// Backends whose calls fail
    failing: Mutex<HashSet<String>>,
    /// Backends reported as unavailable
    unavailable: Mutex<HashSet<String>>,
    /// Backends whose streams emit an error after the first token
    broken_streams: Mutex<HashSet<String>>,
    /// Every call, in order
    calls: Mutex<Vec<PrimitiveCall>>,
    /// Every backend attempt, in order
    attempts: Mutex<Vec<String>>,
}

impl MockPrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, backend_id: &str, failing: bool) {
        toggle(&self.failing, backend_id, failing);
    }

    pub fn set_available(&self, backend_id: &str, available: bool) {
        toggle(&self.unavailable, backend_id, !available);
    }

    pub fn set_broken_stream(&self, backend_id: &str, broken: bool) {
        toggle(&self.broken_streams, backend_id, broken);
    }

    pub fn calls(&self) -> Vec<PrimitiveCall> {
        self.calls.lock().clone()
    }

    pub fn generate_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind == CallKind::Generate)
            .count()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    pub fn last_chain(&self) -> Option<Vec<String>> {
        self.calls.lock().last().map(|c| c.chain.clone())
    }

    /// Walk the chain and return the first backend that answers
    fn answering_backend(&self, chain: &[String]) -> Option<String> {
        let failing = self.failing.lock().clone();
        let unavailable = self.unavailable.lock().clone();
        for backend_id in chain {
            self.attempts.lock().push(backend_id.clone());
            if !failing.contains(backend_id) && !unavailable.contains(backend_id) {
                return Some(backend_id.clone());
            }
        }
        None
    }

    fn record_call(&self, kind: CallKind, chain: &[String], request: &GenerationRequest) {
        self.calls.lock().push(PrimitiveCall {
            kind,
            chain: chain.to_vec(),
            request_id: request.request_id.clone(),
            max_tokens: request.max_tokens,
        });
    }
}

fn toggle(set: &Mutex<HashSet<String>>, backend_id: &str, on: bool) {
    let mut set = set.lock();
    if on {
        set.insert(backend_id.to_string());
    } else {
        set.remove(backend_id);
    }
}

/// Canned response text for a backend
pub fn response_text(backend_id: &str) -> String {
    format!("response from {backend_id}")
}

#[async_trait]
impl GenerationPrimitive for MockPrimitive {
    async fn generate(
        &self,
        chain: &[String],
        request: &GenerationRequest,
    ) -> anyhow::Result<GenerationOutput> {
        self.record_call(CallKind::Generate, chain, request);
        match self.answering_backend(chain) {
            Some(backend_id) => Ok(GenerationOutput {
                text: response_text(&backend_id),
                backend_id,
                status: GenerationStatus::Complete,
            }),
            None => anyhow::bail!("all {} backends in chain failed", chain.len()),
        }
    }

    async fn stream(
        &self,
        chain: &[String],
        request: &GenerationRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamEvent>> {
        self.record_call(CallKind::Stream, chain, request);
        let Some(backend_id) = self.answering_backend(chain) else {
            anyhow::bail!("all {} backends in chain failed", chain.len());
        };
        let broken = self.broken_streams.lock().contains(&backend_id);

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let _ = tx.send(StreamEvent::Token("response ".to_string())).await;
            if broken {
                let _ = tx.send(StreamEvent::Error(format!("{backend_id} dropped the stream"))).await;
                return;
            }
            let _ = tx.send(StreamEvent::Token(format!("from {backend_id}"))).await;
            let _ = tx
                .send(StreamEvent::Complete {
                    text: response_text(&backend_id),
                    backend_id,
                })
                .await;
        });
        Ok(rx)
    }

    fn is_available(&self, backend_id: &str) -> bool {
        !self.unavailable.lock().contains(backend_id)
    }
}
