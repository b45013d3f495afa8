use serde::{Deserialize, Serialize};

/// Outcome class of a single check.
///
/// Ordered by severity so a report's worst outcome is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Ok,
    /// The check could not be evaluated, e.g. it needs the IRFM database
    /// and the run is offline.
    Unavailable,
    Warning,
    Error,
}

impl ResultCode {
    /// Wire code used by sandboxed rules: 0 OK, 1 WARNING, 2 ERROR, 3 UNAVAILABLE.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Warning),
            2 => Some(Self::Error),
            3 => Some(Self::Unavailable),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Error => 2,
            Self::Unavailable => 3,
        }
    }

    pub fn code_name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code_name())
    }
}

/// The outcome of one rule function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub code: ResultCode,
    pub text: String,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, code: ResultCode, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code,
            text: text.into(),
        }
    }

    pub fn ok(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, ResultCode::Ok, text)
    }

    pub fn warning(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, ResultCode::Warning, text)
    }

    pub fn error(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, ResultCode::Error, text)
    }

    pub fn unavailable(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, ResultCode::Unavailable, text)
    }

    pub fn code_name(&self) -> &'static str {
        self.code.code_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        for code in [
            ResultCode::Ok,
            ResultCode::Warning,
            ResultCode::Error,
            ResultCode::Unavailable,
        ] {
            assert_eq!(ResultCode::from_i32(code.as_i32()), Some(code));
        }
        assert_eq!(ResultCode::from_i32(-1), None);
        assert_eq!(ResultCode::from_i32(4), None);
    }

    #[test]
    fn test_severity_order() {
        assert!(ResultCode::Error > ResultCode::Warning);
        assert!(ResultCode::Warning > ResultCode::Unavailable);
        assert!(ResultCode::Unavailable > ResultCode::Ok);
    }

    #[test]
    fn test_serialized_code_names() {
        let result = CheckResult::error("check_x", "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["code"], "ERROR");
        assert_eq!(json["name"], "check_x");
        assert_eq!(result.code_name(), "ERROR");
    }
}
