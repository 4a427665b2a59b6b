use std::sync::Arc;

use tokio::sync::mpsc;

use super::response::InvocationResult;
use crate::subprocess::{ChannelListener, ProgressListener, ProgressSample, SharedListener};

pub type StartHook = Box<dyn FnOnce(&str) + Send>;
pub type EndHook = Box<dyn FnOnce(&InvocationResult) + Send>;

/// Per-invocation settings: identifier, progress delivery and lifecycle hooks
#[derive(Default)]
pub struct InvocationOptions {
    pub(crate) id: Option<String>,
    pub(crate) listener: Option<SharedListener>,
    pub(crate) on_start: Option<StartHook>,
    pub(crate) on_end: Option<EndHook>,
}

impl InvocationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `id` instead of a generated UUID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn with_shared_listener(mut self, listener: SharedListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Deliver samples through a channel and return its receiving end
    pub fn with_progress_channel(self) -> (Self, mpsc::UnboundedReceiver<ProgressSample>) {
        let (listener, receiver) = ChannelListener::channel();
        (self.with_listener(listener), receiver)
    }

    /// Called with the identifier once the process has started
    pub fn on_start(mut self, hook: impl FnOnce(&str) + Send + 'static) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Called with the result of a successful (or tolerated) run
    pub fn on_end(mut self, hook: impl FnOnce(&InvocationResult) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl std::fmt::Debug for InvocationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationOptions")
            .field("id", &self.id)
            .field("listener", &self.listener.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}
