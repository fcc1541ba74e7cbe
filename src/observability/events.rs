//! Observable events
//!
//! Every log line the crate writes names one of these events.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration applied to the process
    ConfigInstalled,
    /// Schema cross-checks passed
    SchemaValidated,

    // Registry
    /// Function added to a registry
    FunctionRegistered,
    /// Function removed from a registry
    FunctionUnregistered,
    /// Scheduled call dispatched by name
    ScheduledCallDispatched,

    // Invocation
    /// Invocation moved between states
    InvocationState,
    /// Handler failed with a domain error
    InvocationClientError,
    /// Handler died with a defect
    InvocationDefect,
    /// Handler failed with a cause the shim cannot translate
    InvocationUnknownCause,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigInstalled => "CONFIG_INSTALLED",
            Event::SchemaValidated => "SCHEMA_VALIDATED",
            Event::FunctionRegistered => "FUNCTION_REGISTERED",
            Event::FunctionUnregistered => "FUNCTION_UNREGISTERED",
            Event::ScheduledCallDispatched => "SCHEDULED_CALL_DISPATCHED",
            Event::InvocationState => "INVOCATION_STATE",
            Event::InvocationClientError => "INVOCATION_CLIENT_ERROR",
            Event::InvocationDefect => "INVOCATION_DEFECT",
            Event::InvocationUnknownCause => "INVOCATION_UNKNOWN_CAUSE",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::InvocationState | Event::SchemaValidated => Severity::Trace,
            Event::ConfigInstalled
            | Event::FunctionRegistered
            | Event::FunctionUnregistered
            | Event::ScheduledCallDispatched => Severity::Info,
            Event::InvocationClientError => Severity::Warn,
            Event::InvocationDefect | Event::InvocationUnknownCause => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 9] = [
        Event::ConfigInstalled,
        Event::SchemaValidated,
        Event::FunctionRegistered,
        Event::FunctionUnregistered,
        Event::ScheduledCallDispatched,
        Event::InvocationState,
        Event::InvocationClientError,
        Event::InvocationDefect,
        Event::InvocationUnknownCause,
    ];

    #[test]
    fn test_all_events_have_string_representation() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_invocation_severities() {
        assert_eq!(Event::InvocationState.severity(), Severity::Trace);
        assert_eq!(Event::InvocationClientError.severity(), Severity::Warn);
        assert_eq!(Event::InvocationUnknownCause.severity(), Severity::Error);
    }
}
