//! Non-fatal dataset audit
//!
//! An auditor inspects a freshly loaded dataset and reports risky
//! configurations. Findings are advisory; they never block a load.

use std::fmt;

use serde::Serialize;

use crate::models::record::map_name;
use crate::models::{Record, RecordMap, Session};

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One issue found in a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    pub severity: Severity,
    /// Name of the record the finding is about
    pub record: String,
    pub message: String,
}

impl AuditFinding {
    pub fn new(severity: Severity, record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            record: record.into(),
            message: message.into(),
        }
    }

    /// High and critical findings are surfaced as warnings
    pub fn is_serious(&self) -> bool {
        self.severity >= Severity::High
    }
}

/// Inspects a validated dataset
pub trait DatasetAuditor: Send + Sync {
    fn audit(
        &self,
        sessions: &[RecordMap],
        folders: &[RecordMap],
    ) -> Result<Vec<AuditFinding>, String>;
}

/// Flags risky SSH session settings
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuditor;

impl SessionAuditor {
    fn audit_session(session: &Session, findings: &mut Vec<AuditFinding>) {
        if !session.is_ssh() {
            return;
        }

        if session.auth_type == "password" {
            if session.auth_value.is_empty() {
                findings.push(AuditFinding::new(
                    Severity::Low,
                    &session.name,
                    "Password authentication without a stored password",
                ));
            } else {
                findings.push(AuditFinding::new(
                    Severity::High,
                    &session.name,
                    "Password stored in plain text",
                ));
            }
        }

        if session.user == "root" {
            findings.push(AuditFinding::new(
                Severity::Medium,
                &session.name,
                "Logs in directly as root",
            ));
        }
    }
}

impl DatasetAuditor for SessionAuditor {
    fn audit(
        &self,
        sessions: &[RecordMap],
        _folders: &[RecordMap],
    ) -> Result<Vec<AuditFinding>, String> {
        let mut findings = Vec::new();
        for map in sessions {
            let session = Session::from_map(map).map_err(|e| {
                format!(
                    "Cannot audit session '{}': {}",
                    map_name(map).unwrap_or("?"),
                    e
                )
            })?;
            Self::audit_session(&session, &mut findings);
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_map(session: Session) -> RecordMap {
        session.to_map()
    }

    #[test]
    fn test_plaintext_password_is_high() {
        let mut session = Session::ssh("db", "db.example.com");
        session.auth_type = "password".into();
        session.auth_value = "hunter2".into();

        let findings = SessionAuditor.audit(&[session_map(session)], &[]).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].is_serious());
    }

    #[test]
    fn test_root_and_empty_password() {
        let mut session = Session::ssh("box", "box.example.com");
        session.user = "root".into();
        session.auth_type = "password".into();

        let findings = SessionAuditor.audit(&[session_map(session)], &[]).unwrap();
        let severities: Vec<_> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Low, Severity::Medium]);
        assert!(findings.iter().all(|f| !f.is_serious()));
    }

    #[test]
    fn test_local_sessions_are_ignored() {
        let mut session = Session::local("shell");
        session.user = "root".into();
        assert!(SessionAuditor
            .audit(&[session_map(session)], &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unreadable_session_is_an_error() {
        let map = json!({"name": "x", "port": "not a number"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(SessionAuditor.audit(&[map], &[]).is_err());
    }
}
