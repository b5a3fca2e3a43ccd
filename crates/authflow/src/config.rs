//! Flow configuration.

use std::time::Duration;

/// Configuration for sign-in flow behavior.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use authflow::FlowConfig;
///
/// let config = FlowConfig {
///     sign_in_timeout: Duration::from_secs(60),
///     ..Default::default()
/// };
/// assert_eq!(config.max_challenge_attempts, 3);
/// ```
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Deadline for a password sign-in flow to reach a terminal state.
    ///
    /// Scheduled when the flow initiates; if no terminal state has
    /// superseded it, the flow fails with a timeout error. Default: 2
    /// minutes.
    pub sign_in_timeout: Duration,

    /// Deadline for a hosted-UI flow, which waits on a user-driven
    /// redirect and so gets more room. Default: 5 minutes.
    pub hosted_ui_timeout: Duration,

    /// How many challenge answers may be rejected before the flow fails.
    ///
    /// Rejections below the limit return the flow to awaiting-input;
    /// reaching the limit is terminal. Default: 3.
    pub max_challenge_attempts: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            sign_in_timeout: Duration::from_secs(120),
            hosted_ui_timeout: Duration::from_secs(300),
            max_challenge_attempts: 3,
        }
    }
}
