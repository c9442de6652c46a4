use thiserror::Error;

use crate::control::ControlError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("service unit has no ExecStart line")]
    ConfigUnreadable,

    #[error("failed to persist service unit: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("daemon control failed: {0}")]
    DaemonControl(#[from] ControlError),

    #[error("operation queue is full")]
    Busy,

    #[error("rate limited")]
    RateLimited,

    #[error("membership status unknown: {0}")]
    MembershipUnknown(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_unreadable() {
        let err = Error::ConfigUnreadable;
        assert_eq!(err.to_string(), "service unit has no ExecStart line");
    }

    #[test]
    fn test_error_display_write_failed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = Error::WriteFailed(io_err);
        assert!(err.to_string().contains("failed to persist service unit"));
    }

    #[test]
    fn test_error_display_busy() {
        assert_eq!(Error::Busy.to_string(), "operation queue is full");
    }

    #[test]
    fn test_error_display_rate_limited() {
        assert_eq!(Error::RateLimited.to_string(), "rate limited");
    }

    #[test]
    fn test_error_display_membership_unknown() {
        let err = Error::MembershipUnknown("timeout talking to chat API".to_string());
        assert!(err.to_string().contains("membership status unknown"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_error_display_invalid_secret() {
        let err = Error::InvalidSecret("zz".to_string());
        assert_eq!(err.to_string(), "invalid secret: zz");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_rate_limited_distinguishable_from_control_failure() {
        // Callers pick user messaging off this distinction (retry-soon
        // vs. contact-admin), so the variants must not collapse.
        let limited = Error::RateLimited;
        let control = Error::DaemonControl(ControlError::Failed {
            command: "systemctl start MTProxy".to_string(),
            detail: "exit status 1".to_string(),
        });
        assert!(matches!(limited, Error::RateLimited));
        assert!(matches!(control, Error::DaemonControl(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(Error::Busy)
        }
        assert!(returns_error().is_err());
    }
}
