//! Trait abstraction for virtual gamepad output to enable testing

use async_trait::async_trait;
use tracing::{error, warn};

use super::report::{Button, DpadDirection, GamepadOutputState, Stick, TriggerSide};
use crate::error::{BridgeError, Result};

/// Trait for virtual gamepad output devices
///
/// Mutating calls stage values; nothing reaches the device until
/// [`OutputSink::commit`]. Values are already in device convention
/// (stick Y orientation and trigger resolution applied).
#[async_trait]
pub trait OutputSink: Send {
    /// Hold a button down
    fn press(&mut self, button: Button);

    /// Let a button go
    fn release(&mut self, button: Button);

    /// Set an analog trigger, 0.0 to 1.0
    fn set_trigger(&mut self, side: TriggerSide, value: f64);

    /// Set an analog stick, each axis -1.0 to 1.0
    fn set_stick(&mut self, stick: Stick, x: f64, y: f64);

    /// Set the D-pad direction
    fn set_dpad(&mut self, direction: DpadDirection);

    /// Send the staged report to the device
    async fn commit(&mut self) -> Result<()>;

    /// Recreate the device connection, leaving it in a neutral state
    async fn reinitialize(&mut self) -> Result<()>;

    /// Stage a complete report, replacing whatever was staged before
    fn restore(&mut self, state: &GamepadOutputState) {
        for button in Button::ALL {
            if state.buttons.contains(button) {
                self.press(button);
            } else {
                self.release(button);
            }
        }
        self.set_stick(Stick::Left, state.left_stick.x, state.left_stick.y);
        self.set_stick(Stick::Right, state.right_stick.x, state.right_stick.y);
        self.set_trigger(TriggerSide::Left, state.left_trigger);
        self.set_trigger(TriggerSide::Right, state.right_trigger);
        self.set_dpad(state.dpad);
    }
}

/// Commit the staged report, recovering once from a device failure
///
/// On a failed commit the device is reinitialized, `state` is restored on
/// it and the commit is tried again. A second failure is returned as
/// [`BridgeError::OutputDevice`].
///
/// # Arguments
///
/// * `sink` - Output device
/// * `state` - Full report for this frame, used to repopulate the device
pub async fn commit_with_retry<S>(sink: &mut S, state: &GamepadOutputState) -> Result<()>
where
    S: OutputSink + ?Sized,
{
    let first = match sink.commit().await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    warn!("Output commit failed: {}. Reinitializing device", first);

    sink.reinitialize().await.map_err(|e| {
        error!("Output device reinitialization failed: {}", e);
        BridgeError::OutputDevice(format!("reinitialize failed: {}", e))
    })?;

    sink.restore(state);

    sink.commit().await.map_err(|e| {
        error!("Output commit failed after reinitialization: {}", e);
        BridgeError::OutputDevice(format!("commit failed after reinitialize: {}", e))
    })
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSink;
    use super::*;
    use crate::gamepad::report::StickPosition;

    fn sample_state() -> GamepadOutputState {
        let mut state = GamepadOutputState::default();
        state.buttons.insert(Button::South);
        state.buttons.insert(Button::LeftShoulder);
        state.left_stick = StickPosition::new(0.25, -0.5);
        state.right_stick = StickPosition::new(-1.0, 0.75);
        state.set_trigger(TriggerSide::Right, 0.6);
        state.dpad = DpadDirection::SouthWest;
        state
    }

    // ==================== Restore Tests ====================

    #[test]
    fn test_restore_stages_full_state() {
        let mut sink = MockSink::new();
        let state = sample_state();
        sink.restore(&state);
        assert_eq!(*sink.pending.lock().unwrap(), state);
    }

    #[test]
    fn test_restore_releases_stale_buttons() {
        let mut sink = MockSink::new();
        sink.press(Button::Start);
        sink.restore(&sample_state());
        assert!(!sink.pending.lock().unwrap().buttons.contains(Button::Start));
    }

    // ==================== Commit Retry Tests ====================

    #[tokio::test]
    async fn test_commit_succeeds_first_time() {
        let mut sink = MockSink::new();
        sink.restore(&sample_state());

        commit_with_retry(&mut sink, &sample_state()).await.unwrap();

        assert_eq!(sink.get_committed().len(), 1);
        assert_eq!(sink.get_reinit_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_recovers_after_one_failure() {
        let mut sink = MockSink::new();
        let state = sample_state();
        sink.restore(&state);
        sink.fail_next_commits(1);

        commit_with_retry(&mut sink, &state).await.unwrap();

        assert_eq!(sink.get_reinit_count(), 1);
        // Reinitialize wiped the staged report; restore put it back
        assert_eq!(sink.last_committed(), Some(state));
    }

    #[tokio::test]
    async fn test_commit_fails_after_two_failures() {
        let mut sink = MockSink::new();
        sink.fail_next_commits(2);

        let result = commit_with_retry(&mut sink, &sample_state()).await;

        assert!(matches!(result, Err(BridgeError::OutputDevice(_))));
        assert_eq!(sink.get_reinit_count(), 1);
        assert!(sink.get_committed().is_empty());
    }

    #[tokio::test]
    async fn test_commit_fails_when_reinit_fails() {
        let mut sink = MockSink::new();
        sink.fail_next_commits(1);
        sink.set_reinit_error();

        let result = commit_with_retry(&mut sink, &sample_state()).await;

        match result {
            Err(BridgeError::OutputDevice(msg)) => assert!(msg.contains("reinitialize")),
            other => panic!("Expected OutputDevice error, got: {:?}", other),
        }
    }
}
