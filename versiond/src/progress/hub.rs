//! Progress hub: live observers plus the debug log

use std::sync::Arc;

use openapi_server::models::ProgressEvent;
use tracing::warn;

use crate::progress::debug_log::DebugLog;
use crate::progress::registry::ObserverRegistry;

pub struct ProgressHub {
    observers: Arc<ObserverRegistry>,
    debug_log: Arc<DebugLog>,
}

impl ProgressHub {
    pub fn new(observers: Arc<ObserverRegistry>, debug_log: Arc<DebugLog>) -> Self {
        Self {
            observers,
            debug_log,
        }
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    pub fn debug_log(&self) -> &Arc<DebugLog> {
        &self.debug_log
    }

    /// Send `event` to every observer and record state changes in the debug log.
    ///
    /// Pure output events are not recorded; they would flush the log quickly.
    pub fn publish(&self, event: &ProgressEvent) {
        if let Err(e) = self.observers.broadcast(event) {
            warn!("Failed to broadcast progress event: {}", e);
        }

        if !event.is_output() || event.status.is_terminal() {
            self.debug_log.push(flatten(event));
        }
    }
}

fn flatten(event: &ProgressEvent) -> String {
    let mut line = format!(
        "[progress] {} {} {}",
        event.repo,
        event.step,
        event.status.as_str()
    );
    if let Some(branch) = &event.branch {
        line.push_str(&format!(" branch={}", branch));
    }
    if let Some(war_path) = &event.war_path {
        line.push_str(&format!(" war={}", war_path));
    }
    if let Some(detail) = &event.detail {
        line.push_str(&format!(" detail={}", detail.replace('\n', " ")));
    }
    line
}
