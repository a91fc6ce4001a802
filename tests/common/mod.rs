#![allow(dead_code, unused_imports)]

use std::time::Duration;

pub use onchange_test_utils::builders::{ConfigFileBuilder, TempTree};
pub use onchange_test_utils::fake_backend::{EMULATED, FakeBackend, FakeController, NATIVE};
pub use onchange_test_utils::fake_executor::{RecordingExecutor, Scripted};
pub use onchange_test_utils::{init_tracing, with_timeout};

/// Poll `cond` every 10ms until it holds, panicking after `limit`.
pub async fn wait_for(limit: Duration, what: &str, cond: impl Fn() -> bool) {
    with_timeout(limit, what, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}
