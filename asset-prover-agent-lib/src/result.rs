use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outcome of one transaction in a batch, as returned to the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    /// A proof produced without submitting it.
    pub fn proved(tx: impl Into<String>) -> Self {
        Self {
            success: true,
            tx: Some(tx.into()),
            ..Default::default()
        }
    }

    /// A proof that could not be submitted. The proof is kept so the caller
    /// can resubmit it.
    pub fn unsent(tx: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx: Some(tx.into()),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Serializes the result. Once a hash is known the proof payload is
    /// redundant and dropped.
    pub fn encode(&self) -> Result<String> {
        let stripped = JobResult {
            tx: if self.hash.is_some() {
                None
            } else {
                self.tx.clone()
            },
            ..self.clone()
        };
        Ok(serde_json::to_string_pretty(&stripped)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn drops_proof_once_hash_is_known() {
        let result = JobResult {
            success: true,
            tx: Some("{\"proof\":\"...\"}".into()),
            hash: Some("5Jt".into()),
            status: Some("pending".into()),
            error: None,
        };
        let encoded: Value = serde_json::from_str(&result.encode().unwrap()).unwrap();
        assert!(encoded.get("tx").is_none());
        assert_eq!(encoded["hash"], "5Jt");
        assert_eq!(encoded["status"], "pending");
        assert!(encoded.get("error").is_none());
    }

    #[test]
    fn keeps_proof_without_hash() {
        let encoded: Value =
            serde_json::from_str(&JobResult::unsent("{}", "timeout").encode().unwrap()).unwrap();
        assert_eq!(encoded["success"], false);
        assert_eq!(encoded["tx"], "{}");
        assert_eq!(encoded["error"], "timeout");
    }
}
