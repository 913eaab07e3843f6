//! Runs in its own test binary: `init_tracing` installs a process-global
//! subscriber, which conflicts with `#[traced_test]` in the lib unit tests.

use genymotion_mcp::observability::init_tracing;
use genymotion_mcp::types::ObservabilityConfig;

#[test]
fn init_tracing_is_idempotent() {
    let config = ObservabilityConfig::default();
    init_tracing(&config);
    init_tracing(&config);
}
