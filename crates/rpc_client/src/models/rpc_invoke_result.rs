//! Models of `invokefunction` / `invokescript` results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stack item in its JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcStackItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub value: Option<Value>,
}

/// A notification raised during the invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNotification {
    pub contract: String,
    #[serde(rename = "eventname")]
    pub event_name: String,
    #[serde(default)]
    pub state: Option<Value>,
}

/// The result of a test invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcInvokeResult {
    pub script: String,
    pub state: String,
    #[serde(rename = "gasconsumed")]
    pub gas_consumed: String,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub stack: Vec<RpcStackItem>,
    #[serde(default)]
    pub notifications: Vec<RpcNotification>,
}

impl RpcInvokeResult {
    /// Whether the invocation halted cleanly.
    pub fn halted(&self) -> bool {
        self.state == "HALT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_invoke_result() {
        let raw = r#"{
            "script": "EhGTQA==",
            "state": "HALT",
            "gasconsumed": "180",
            "stack": [{"type": "Integer", "value": "3"}]
        }"#;
        let result: RpcInvokeResult = serde_json::from_str(raw).unwrap();
        assert!(result.halted());
        assert_eq!(result.stack[0].item_type, "Integer");
    }

    #[test]
    fn fault_state_is_not_halted() {
        let raw = r#"{"script": "", "state": "FAULT", "gasconsumed": "0", "exception": "gas exhausted"}"#;
        let result: RpcInvokeResult = serde_json::from_str(raw).unwrap();
        assert!(!result.halted());
        assert!(result.exception.unwrap().contains("gas"));
    }
}
