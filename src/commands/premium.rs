//! Premium flag commands.

use crate::core_state::CoreState;

pub fn is_premium(state: &CoreState) -> Result<bool, String> {
    state.premium().is_premium().map_err(|e| e.to_string())
}

/// Record a completed purchase.
pub fn unlock_premium(state: &CoreState) -> Result<(), String> {
    state.premium().unlock().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::state_in;

    #[test]
    fn unlock_flips_flag() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        assert!(!is_premium(&state).unwrap());
        unlock_premium(&state).unwrap();
        assert!(is_premium(&state).unwrap());
    }
}
