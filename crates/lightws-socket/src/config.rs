use lightws_frame::FrameConfig;

use crate::registry::DuplicatePolicy;

/// Controls socket dispatch behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// What happens when the same listener is registered twice for one event.
    pub duplicate_policy: DuplicatePolicy,
    /// Frame size limits for both directions.
    pub frame: FrameConfig,
    /// When true, a panicking listener is reported like a failing one and
    /// the remaining listeners still run.
    pub catch_listener_panics: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Ignore,
            frame: FrameConfig::default(),
            catch_listener_panics: true,
        }
    }
}
