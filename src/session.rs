use crate::{error::DesignError, parameters::DesignParameters};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_STATE_PATH: &str = ".primerdesk_state.json";

/// What survives between two command invocations: the parameters and the
/// engine output of the most recent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignSession {
    #[serde(default)]
    pub parameters: DesignParameters,
    #[serde(default)]
    pub last_output: Option<String>,
    #[serde(default)]
    pub last_executable: Option<String>,
    #[serde(default)]
    pub last_run_unix_ms: Option<u64>,
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl DesignSession {
    pub fn record_run(&mut self, parameters: &DesignParameters, executable: &str, output: &str) {
        self.parameters = parameters.clone();
        self.last_output = Some(output.to_string());
        self.last_executable = Some(executable.to_string());
        self.last_run_unix_ms = Some(now_unix_ms());
    }

    pub fn load_from_path(path: &str) -> Result<Self, DesignError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DesignError::io("Could not read state file", path, e))?;
        serde_json::from_str(&text).map_err(|source| DesignError::State {
            path: path.to_string(),
            source,
        })
    }

    /// A missing file is an empty session.
    pub fn load_or_default(path: &str) -> Result<Self, DesignError> {
        if std::path::Path::new(path).exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_path(&self, path: &str) -> Result<(), DesignError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| DesignError::State {
            path: path.to_string(),
            source,
        })?;
        std::fs::write(path, text).map_err(|e| DesignError::io("Could not write state file", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let path = path.to_str().unwrap();

        let params = DesignParameters::default().with_template("ACGT[ACGT]ACGT").unwrap();
        let mut session = DesignSession::default();
        session.record_run(&params, "primer3_core", "PRIMER_PAIR_NUM_RETURNED=0\n=\n");
        session.save_to_path(path).unwrap();

        let back = DesignSession::load_from_path(path).unwrap();
        assert_eq!(back, session);
        assert_eq!(back.parameters.sequence, "ACGTACGTACGT");
        assert!(back.last_run_unix_ms.is_some());
    }

    #[test]
    fn test_missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let session = DesignSession::load_or_default(path.to_str().unwrap()).unwrap();
        assert_eq!(session.last_output, None);
    }

    #[test]
    fn test_garbage_state_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DesignSession::load_from_path(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DesignError::State { .. }));
    }

    #[test]
    fn test_partial_state_uses_defaults() {
        let session: DesignSession = serde_json::from_str(r#"{"last_output":"=\n"}"#).unwrap();
        assert_eq!(session.parameters, DesignParameters::default());
        assert_eq!(session.last_output.as_deref(), Some("=\n"));
    }
}
