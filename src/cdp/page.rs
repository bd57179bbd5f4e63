use serde::{Deserialize, Serialize};

use super::impl_command;

pub type FrameId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnableReturns {}

impl_command!(EnableParams, "Page.enable", EnableReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl NavigateParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            referrer: None,
        }
    }
}

impl<T: Into<String>> From<T> for NavigateParams {
    fn from(url: T) -> Self {
        NavigateParams::new(url)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    pub frame_id: FrameId,
    #[serde(default)]
    pub loader_id: Option<String>,
    /// Set when the navigation was rejected outright, e.g. net::ERR_ABORTED
    #[serde(default)]
    pub error_text: Option<String>,
}

impl_command!(NavigateParams, "Page.navigate", NavigateReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentParams {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

impl AddScriptToEvaluateOnNewDocumentParams {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            world_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddScriptToEvaluateOnNewDocumentReturns {
    pub identifier: String,
}

impl_command!(
    AddScriptToEvaluateOnNewDocumentParams,
    "Page.addScriptToEvaluateOnNewDocument",
    AddScriptToEvaluateOnNewDocumentReturns
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    Jpeg,
    Png,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ScreenshotFormat>,
    /// Compression quality [0..100], jpeg only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
}

impl CaptureScreenshotParams {
    pub fn jpeg(quality: u32) -> Self {
        Self {
            format: Some(ScreenshotFormat::Jpeg),
            quality: Some(quality),
        }
    }

    pub fn png() -> Self {
        Self {
            format: Some(ScreenshotFormat::Png),
            quality: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptureScreenshotReturns {
    /// Base64 encoded image data
    pub data: String,
}

impl_command!(
    CaptureScreenshotParams,
    "Page.captureScreenshot",
    CaptureScreenshotReturns
);

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GetNavigationHistoryParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNavigationHistoryReturns {
    pub current_index: i64,
    pub entries: Vec<NavigationEntry>,
}

impl_command!(
    GetNavigationHistoryParams,
    "Page.getNavigationHistory",
    GetNavigationHistoryReturns
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parent_id: Option<FrameId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameStartedLoading {
    pub frame_id: FrameId,
}

impl EventFrameStartedLoading {
    pub const IDENTIFIER: &'static str = "Page.frameStartedLoading";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameStoppedLoading {
    pub frame_id: FrameId,
}

impl EventFrameStoppedLoading {
    pub const IDENTIFIER: &'static str = "Page.frameStoppedLoading";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameNavigated {
    pub frame: Frame,
}

impl EventFrameNavigated {
    pub const IDENTIFIER: &'static str = "Page.frameNavigated";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoadEventFired {
    pub timestamp: f64,
}

impl EventLoadEventFired {
    pub const IDENTIFIER: &'static str = "Page.loadEventFired";
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDomContentEventFired {
    pub timestamp: f64,
}

impl EventDomContentEventFired {
    pub const IDENTIFIER: &'static str = "Page.domContentEventFired";
}
