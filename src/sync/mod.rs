pub mod poller;

/// Returns the sync module name for smoke checks.
pub fn module_name() -> &'static str {
    "sync"
}
