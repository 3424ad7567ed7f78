use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Code, SQLSTATE and message reported by the server for a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlErrorInfo {
    pub message: String,
    pub code: i64,
    pub sqlstate: Option<String>,
}

impl SqlErrorInfo {
    pub fn new(message: impl Into<String>, code: i64, sqlstate: impl Into<String>) -> Self {
        let sqlstate = sqlstate.into();
        Self {
            message: message.into(),
            code,
            sqlstate: if sqlstate.is_empty() { None } else { Some(sqlstate) },
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: -1,
            sqlstate: None,
        }
    }
}

impl fmt::Display for SqlErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sqlstate {
            Some(state) => write!(f, "{} (code {}, sqlstate {})", self.message, self.code, state),
            None if self.code >= 0 => write!(f, "{} (code {})", self.message, self.code),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Database,
    Data,
    Operational,
    Integrity,
    Internal,
    Programming,
}

#[derive(Debug, Error)]
pub enum AvaticaError {
    #[error("interface error: {message}")]
    Interface { message: String, status: Option<u16> },
    #[error("database error: {0}")]
    Database(SqlErrorInfo),
    #[error("data error: {0}")]
    Data(SqlErrorInfo),
    #[error("operational error: {0}")]
    Operational(SqlErrorInfo),
    #[error("integrity error: {0}")]
    Integrity(SqlErrorInfo),
    #[error("internal error: {0}")]
    Internal(SqlErrorInfo),
    #[error("programming error: {0}")]
    Programming(SqlErrorInfo),
    #[error("max retries exceeded: {0}")]
    MaxRetries(String),
}

pub type Result<T> = std::result::Result<T, AvaticaError>;

impl AvaticaError {
    pub fn interface(message: impl Into<String>) -> Self {
        AvaticaError::Interface {
            message: message.into(),
            status: None,
        }
    }

    pub fn programming(message: impl Into<String>) -> Self {
        AvaticaError::Programming(SqlErrorInfo::message(message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AvaticaError::Internal(SqlErrorInfo::message(message))
    }

    pub fn from_category(category: ErrorCategory, info: SqlErrorInfo) -> Self {
        match category {
            ErrorCategory::Database => AvaticaError::Database(info),
            ErrorCategory::Data => AvaticaError::Data(info),
            ErrorCategory::Operational => AvaticaError::Operational(info),
            ErrorCategory::Integrity => AvaticaError::Integrity(info),
            ErrorCategory::Internal => AvaticaError::Internal(info),
            ErrorCategory::Programming => AvaticaError::Programming(info),
        }
    }

    /// `None` for interface and retry-exhaustion errors, which are not database errors.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            AvaticaError::Database(_) => Some(ErrorCategory::Database),
            AvaticaError::Data(_) => Some(ErrorCategory::Data),
            AvaticaError::Operational(_) => Some(ErrorCategory::Operational),
            AvaticaError::Integrity(_) => Some(ErrorCategory::Integrity),
            AvaticaError::Internal(_) => Some(ErrorCategory::Internal),
            AvaticaError::Programming(_) => Some(ErrorCategory::Programming),
            AvaticaError::Interface { .. } | AvaticaError::MaxRetries(_) => None,
        }
    }

    pub fn sql_info(&self) -> Option<&SqlErrorInfo> {
        match self {
            AvaticaError::Database(info)
            | AvaticaError::Data(info)
            | AvaticaError::Operational(info)
            | AvaticaError::Integrity(info)
            | AvaticaError::Internal(info)
            | AvaticaError::Programming(info) => Some(info),
            AvaticaError::Interface { .. } | AvaticaError::MaxRetries(_) => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AvaticaError::Interface { status, .. } => *status,
            _ => None,
        }
    }
}

// Phoenix SQLExceptionCode classes. Order matters: 22018 must win over 22.
pub const SQLSTATE_ERROR_CLASSES: &[(&str, ErrorCategory)] = &[
    ("08", ErrorCategory::Operational),
    ("22018", ErrorCategory::Integrity),
    ("22", ErrorCategory::Data),
    ("23", ErrorCategory::Integrity),
    ("24", ErrorCategory::Internal),
    ("25", ErrorCategory::Internal),
    ("42", ErrorCategory::Programming),
    ("XLC", ErrorCategory::Operational),
    ("INT", ErrorCategory::Internal),
];

pub fn classify_sqlstate(sqlstate: &str) -> ErrorCategory {
    SQLSTATE_ERROR_CLASSES
        .iter()
        .find(|(prefix, _)| sqlstate.starts_with(prefix))
        .map(|(_, category)| *category)
        .unwrap_or(ErrorCategory::Internal)
}

pub fn sql_error(code: i64, sqlstate: &str, message: impl Into<String>) -> AvaticaError {
    AvaticaError::from_category(
        classify_sqlstate(sqlstate),
        SqlErrorInfo::new(message, code, sqlstate),
    )
}

static SERVER_ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([^ ]+): )?ERROR (\d+) \(([0-9A-Z]{5})\): (.*?) ->")
        .expect("server error pattern is valid")
});

/// Extracts the first `ERROR <code> (<sqlstate>): <message> ->` fragment of a
/// server exception string and classifies it.
pub fn parse_sql_error(text: &str) -> Option<AvaticaError> {
    let captures = SERVER_ERROR_PATTERN.captures(text)?;
    let code = captures.get(2)?.as_str().parse::<i64>().ok()?;
    let sqlstate = captures.get(3)?.as_str();
    let message = captures.get(4)?.as_str();
    Some(sql_error(code, sqlstate, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_prefix_wins() {
        assert_eq!(classify_sqlstate("22018"), ErrorCategory::Integrity);
        assert_eq!(classify_sqlstate("22012"), ErrorCategory::Data);
        assert_eq!(classify_sqlstate("0800"), ErrorCategory::Operational);
        assert_eq!(classify_sqlstate("23505"), ErrorCategory::Integrity);
        assert_eq!(classify_sqlstate("42M03"), ErrorCategory::Programming);
        assert_eq!(classify_sqlstate("XLC01"), ErrorCategory::Operational);
        assert_eq!(classify_sqlstate("INT10"), ErrorCategory::Internal);
        assert_eq!(classify_sqlstate("99999"), ErrorCategory::Internal);
        assert_eq!(classify_sqlstate(""), ErrorCategory::Internal);
    }

    #[test]
    fn server_message_is_extracted() {
        let text = "org.apache.phoenix.schema.TableNotFoundException: ERROR 1012 (42M03): \
                    Table undefined. tableName=FOO -> more detail";
        let err = parse_sql_error(text).expect("match");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
        let info = err.sql_info().expect("info");
        assert_eq!(info.code, 1012);
        assert_eq!(info.sqlstate.as_deref(), Some("42M03"));
        assert_eq!(info.message, "Table undefined. tableName=FOO");
    }

    #[test]
    fn first_match_only() {
        let text = "ERROR 1205 (23000): Duplicate key -> ERROR 201 (22000): Illegal data ->";
        let err = parse_sql_error(text).expect("match");
        assert!(matches!(err, AvaticaError::Integrity(_)));
        assert_eq!(err.sql_info().map(|i| i.code), Some(1205));
    }

    #[test]
    fn unmatched_message_yields_none() {
        assert!(parse_sql_error("java.lang.NullPointerException").is_none());
        assert!(parse_sql_error("ERROR 12 (2300): too short ->").is_none());
    }

    #[test]
    fn display_includes_code_and_state() {
        let err = sql_error(1205, "23000", "Duplicate key");
        assert_eq!(
            err.to_string(),
            "integrity error: Duplicate key (code 1205, sqlstate 23000)"
        );
        assert_eq!(
            AvaticaError::programming("The cursor is already closed.").to_string(),
            "programming error: The cursor is already closed."
        );
    }
}
