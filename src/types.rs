use std::fmt;
use std::str::FromStr;

/// What a batch does after one of its commands fails.
///
/// - `Ignore`: log the failure and run the next command.
/// - `Continue`: stop the remaining commands of this batch run, but report
///   success to the caller (a loop simply proceeds with its next iteration).
/// - `Fail`: stop and propagate the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    Ignore,
    Continue,
    Fail,
}

impl OnError {
    /// Parse an optional raw `onerror` value, falling back to `default` when
    /// it is absent or empty.
    pub fn parse_or(value: Option<&str>, default: OnError) -> Result<Self, String> {
        match value {
            None => Ok(default),
            Some(s) if s.is_empty() => Ok(default),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(OnError::Ignore),
            "continue" => Ok(OnError::Continue),
            "fail" => Ok(OnError::Fail),
            other => Err(format!("invalid onerror value: {other}")),
        }
    }
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OnError::Ignore => "ignore",
            OnError::Continue => "continue",
            OnError::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Routing of a child's stdout or stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    /// Forward every chunk to the caller's output sink.
    #[default]
    Pipe,
    /// Discard the stream (`/dev/null`).
    Ignore,
}

impl StdioMode {
    pub fn parse_or_default(value: Option<&str>) -> Result<Self, String> {
        match value {
            None => Ok(StdioMode::Pipe),
            Some(s) if s.is_empty() => Ok(StdioMode::Pipe),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for StdioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pipe" => Ok(StdioMode::Pipe),
            "ignore" => Ok(StdioMode::Ignore),
            other => Err(format!("invalid stdio value: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onerror_defaults_when_missing_or_empty() {
        assert_eq!(OnError::parse_or(None, OnError::Continue), Ok(OnError::Continue));
        assert_eq!(OnError::parse_or(Some(""), OnError::Fail), Ok(OnError::Fail));
        assert_eq!(OnError::parse_or(Some("ignore"), OnError::Fail), Ok(OnError::Ignore));
    }

    #[test]
    fn onerror_rejects_unknown_values() {
        let err = OnError::parse_or(Some("x"), OnError::Fail).unwrap_err();
        assert_eq!(err, "invalid onerror value: x");
    }

    #[test]
    fn stdio_mode_parsing() {
        assert_eq!(StdioMode::parse_or_default(None), Ok(StdioMode::Pipe));
        assert_eq!(StdioMode::parse_or_default(Some("ignore")), Ok(StdioMode::Ignore));
        assert!(
            StdioMode::parse_or_default(Some("unknown"))
                .unwrap_err()
                .contains("invalid stdio")
        );
    }
}
