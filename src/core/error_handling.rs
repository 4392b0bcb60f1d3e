//! Generic error handling utilities
//!
//! Provides unified error logging that works across the error types of every
//! module while keeping domain-specific messages where they help the operator.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// Configuration mistakes (a malformed consumer group, a zero batch size) are
/// actionable and carry a message worth showing verbatim. Synchronisation or
/// runtime failures are not; they get a generic context line and debug detail.
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`. When it returns `false`, `user_message()` returns `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message the user can act on
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// # Arguments
/// * `error` - The error to handle (must implement ContextualError)
/// * `operation_context` - Human-readable description of the operation that failed
///
/// # Examples
/// ```rust,no_run
/// # use popqueue::core::error_handling::log_error_with_context;
/// # use popqueue::config::ConsumerConfig;
/// if let Err(e) = ConsumerConfig::new("bad group!").validate() {
///     // Logs: "FATAL: consumer group 'bad group!' does not match ..."
///     log_error_with_context(&e, "Consumer configuration");
/// }
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

/// Log an error the caller recovers from, at warn level
///
/// The operation context always leads. User-actionable errors follow with
/// their own message, everything else with its display text.
pub fn log_warning_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::warn!("{}: {}", operation_context, user_msg)
        }
        _ => log::warn!("{}: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
