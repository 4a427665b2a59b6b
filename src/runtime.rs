//! Process-wide runtime layout
//!
//! [`init`] resolves and validates the bundled runtime once; every
//! [`Supervisor`](crate::Supervisor) built with [`Supervisor::new`](crate::Supervisor::new)
//! reads the stored layout at execution time.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::{RuntimeLayout, SupervisorConfig};
use crate::error::Result;

static LAYOUT: OnceCell<Arc<RuntimeLayout>> = OnceCell::new();

/// Resolve the runtime layout from `config` and store it for the process.
///
/// Runs at most once: later calls return the stored layout and ignore
/// their argument. A failed attempt stores nothing, so it can be retried.
pub fn init(config: &SupervisorConfig) -> Result<Arc<RuntimeLayout>> {
    if let Some(layout) = LAYOUT.get() {
        tracing::debug!("Runtime already initialized, skipping");
        return Ok(Arc::clone(layout));
    }

    let layout = LAYOUT.get_or_try_init(|| {
        let layout = RuntimeLayout::from_config(config);
        layout.prepare()?;
        tracing::info!(
            "Runtime initialized: interpreter={} tool={}",
            layout.interpreter.display(),
            layout.tool.display()
        );
        Ok::<_, crate::error::SupervisorError>(Arc::new(layout))
    })?;
    Ok(Arc::clone(layout))
}

/// The stored layout, if [`init`] has succeeded
pub fn layout() -> Option<Arc<RuntimeLayout>> {
    LAYOUT.get().cloned()
}

pub fn is_initialized() -> bool {
    LAYOUT.get().is_some()
}
