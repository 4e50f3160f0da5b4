/// Centralized logging macros for actor system
///
/// These macros provide consistent logging across all actors with:
/// - Output through the `log` facade (the binary installs `env_logger`)
/// - Consistent formatting with actor context
///
/// Elevator diagnostics carry the `[elevator][name][state][floor]` prefix,
/// built by the caller.
///
/// Log debug-level message
///
/// # Example
/// ```
/// use lift_runtime::actor_debug;
/// actor_debug!("Elevator: {:?} → {:?}", "idle", "in_transit");
/// ```
#[macro_export]
macro_rules! actor_debug {
    ($($arg:tt)*) => {
        $crate::__log::debug!($($arg)*)
    };
}

/// Log info-level message
///
/// Use for important state changes and operator-facing events
#[macro_export]
macro_rules! actor_info {
    ($($arg:tt)*) => {
        $crate::__log::info!($($arg)*)
    };
}

/// Log warning-level message
///
/// Use for recoverable errors and unexpected conditions
#[macro_export]
macro_rules! actor_warn {
    ($($arg:tt)*) => {
        $crate::__log::warn!($($arg)*)
    };
}

/// Log error-level message
///
/// Use for critical errors that should always be visible
#[macro_export]
macro_rules! actor_error {
    ($($arg:tt)*) => {
        $crate::__log::error!($($arg)*)
    };
}
