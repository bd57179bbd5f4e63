use serde::{Deserialize, Serialize};

use super::impl_command;

pub type RequestId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnableReturns {}

impl_command!(EnableParams, "Network.enable", EnableReturns);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub expires: f64,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GetAllCookiesParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetAllCookiesReturns {
    pub cookies: Vec<Cookie>,
}

impl_command!(
    GetAllCookiesParams,
    "Network.getAllCookies",
    GetAllCookiesReturns
);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentBrandVersion {
    pub brand: String,
    pub version: String,
}

/// Mirrors the client hints the browser would report for a real install; must
/// stay coherent with the user agent string itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentMetadata {
    pub brands: Vec<UserAgentBrandVersion>,
    pub full_version: String,
    pub platform: String,
    pub platform_version: String,
    pub architecture: String,
    pub model: String,
    pub mobile: bool,
    pub bitness: String,
    pub wow64: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideParams {
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent_metadata: Option<UserAgentMetadata>,
}

impl SetUserAgentOverrideParams {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: None,
            platform: None,
            user_agent_metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetUserAgentOverrideReturns {}

impl_command!(
    SetUserAgentOverrideParams,
    "Network.setUserAgentOverride",
    SetUserAgentOverrideReturns
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestWillBeSent {
    pub request_id: RequestId,
    /// Resource type, `Document` for top level navigations
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub redirect_response: Option<serde_json::Value>,
}

impl EventRequestWillBeSent {
    pub const IDENTIFIER: &'static str = "Network.requestWillBeSent";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponseReceived {
    pub request_id: RequestId,
}

impl EventResponseReceived {
    pub const IDENTIFIER: &'static str = "Network.responseReceived";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFinished {
    pub request_id: RequestId,
}

impl EventLoadingFinished {
    pub const IDENTIFIER: &'static str = "Network.loadingFinished";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadingFailed {
    pub request_id: RequestId,
    #[serde(default)]
    pub error_text: String,
}

impl EventLoadingFailed {
    pub const IDENTIFIER: &'static str = "Network.loadingFailed";
}
