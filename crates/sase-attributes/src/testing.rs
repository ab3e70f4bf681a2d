//! Test doubles

use async_trait::async_trait;
use parking_lot::RwLock;
use sase_common::{AttributeMap, PrincipalKey};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::source::{AttributeSource, SourceError, SourceResult};

enum Script {
    Respond(SourceResult),
    Panic,
}

/// Source with a scripted answer that counts its queries
pub(crate) struct ScriptedSource {
    name: String,
    script: RwLock<Script>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            script: RwLock::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_attrs(name: &str, attributes: AttributeMap) -> Self {
        Self::new(name, Script::Respond(Ok(Some(attributes))))
    }

    pub fn no_match(name: &str) -> Self {
        Self::new(name, Script::Respond(Ok(None)))
    }

    pub fn failing(name: &str) -> Self {
        Self::new(
            name,
            Script::Respond(Err(SourceError::Unavailable(format!("{} is down", name)))),
        )
    }

    pub fn panicking(name: &str) -> Self {
        Self::new(name, Script::Panic)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, result: SourceResult) {
        *self.script.write() = Script::Respond(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttributeSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _principal: &PrincipalKey) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &*self.script.read() {
            Script::Respond(result) => result.clone(),
            Script::Panic => panic!("scripted panic in {}", self.name),
        }
    }
}
