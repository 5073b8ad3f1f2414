//! Commands exposed to the app shell.
//!
//! Every command takes the shared `CoreState` and returns `Result<T, String>`
//! so the bridge can forward the error text to the user as-is. Commands
//! that touch the filesystem heavily run on a blocking thread.

pub mod library;
pub mod premium;
pub mod qr;

use std::sync::Arc;

use crate::core_state::{CoreError, CoreState};

/// Health check command, verifies the core is loaded
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

/// Run `f` against the state on a blocking thread.
pub(crate) async fn run_blocking<T, F>(state: &Arc<CoreState>, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&CoreState) -> Result<T, CoreError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| CoreError::Task(e.to_string()).to_string())?
        .map_err(|e| e.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_returns_ok() {
        assert_eq!(health_check(), "ok");
    }

    #[tokio::test]
    async fn blocking_errors_become_messages() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state_in(dir.path());

        let result: Result<(), String> = run_blocking(&state, |_| Err(CoreError::LockPoisoned)).await;
        assert_eq!(result.unwrap_err(), "Internal lock error");
    }
}
