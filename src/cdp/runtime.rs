use serde::{Deserialize, Serialize};

use super::impl_command;

pub type ExecutionContextId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnableReturns {}

impl_command!(EnableParams, "Runtime.enable", EnableReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ExecutionContextId>,
}

impl EvaluateParams {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            return_by_value: Some(true),
            await_promise: Some(true),
            user_gesture: None,
            context_id: None,
        }
    }

    pub fn with_context(mut self, context_id: Option<ExecutionContextId>) -> Self {
        self.context_id = context_id;
        self
    }
}

impl<T: Into<String>> From<T> for EvaluateParams {
    fn from(expr: T) -> Self {
        EvaluateParams::new(expr)
    }
}

/// Mirror object referencing the original JavaScript value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    pub r#type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub text: String,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateReturns {
    pub result: RemoteObject,
    #[serde(default)]
    pub exception_details: Option<ExceptionDetails>,
}

impl_command!(EvaluateParams, "Runtime.evaluate", EvaluateReturns);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
    pub id: ExecutionContextId,
    #[serde(default)]
    pub aux_data: serde_json::Value,
}

impl ExecutionContextDescription {
    /// Whether this is the frame's default world.
    pub fn is_default(&self) -> bool {
        self.aux_data
            .get("isDefault")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventExecutionContextCreated {
    pub context: ExecutionContextDescription,
}

impl EventExecutionContextCreated {
    pub const IDENTIFIER: &'static str = "Runtime.executionContextCreated";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventConsoleApiCalled {
    pub r#type: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

impl EventConsoleApiCalled {
    pub const IDENTIFIER: &'static str = "Runtime.consoleAPICalled";
}
