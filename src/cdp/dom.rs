use serde::{Deserialize, Serialize};

use super::impl_command;

pub type NodeId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct EnableParams {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnableReturns {}

impl_command!(EnableParams, "DOM.enable", EnableReturns);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: NodeId,
    #[serde(default)]
    pub node_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetDocumentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pierce: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetDocumentReturns {
    pub root: Node,
}

impl_command!(GetDocumentParams, "DOM.getDocument", GetDocumentReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorParams {
    pub node_id: NodeId,
    pub selector: String,
}

impl QuerySelectorParams {
    pub fn new(node_id: NodeId, selector: impl Into<String>) -> Self {
        Self {
            node_id,
            selector: selector.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelectorReturns {
    /// 0 when no node matched the selector
    pub node_id: NodeId,
}

impl_command!(
    QuerySelectorParams,
    "DOM.querySelector",
    QuerySelectorReturns
);

/// Quads are [x1, y1, x2, y2, x3, y3, x4, y4] running clockwise from the top
/// left corner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxModel {
    pub content: Vec<f64>,
    pub width: f64,
    pub height: f64,
}

impl BoxModel {
    /// Centre of the content box.
    pub fn content_center(&self) -> (f64, f64) {
        let xs: Vec<f64> = self.content.iter().step_by(2).copied().collect();
        let ys: Vec<f64> = self.content.iter().skip(1).step_by(2).copied().collect();
        let cx = xs.iter().sum::<f64>() / xs.len().max(1) as f64;
        let cy = ys.iter().sum::<f64>() / ys.len().max(1) as f64;
        (cx, cy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBoxModelParams {
    pub node_id: NodeId,
}

impl GetBoxModelParams {
    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetBoxModelReturns {
    pub model: BoxModel,
}

impl_command!(GetBoxModelParams, "DOM.getBoxModel", GetBoxModelReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlParams {
    pub node_id: NodeId,
}

impl GetOuterHtmlParams {
    pub fn new(node_id: NodeId) -> Self {
        Self { node_id }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOuterHtmlReturns {
    pub outer_html: String,
}

impl_command!(GetOuterHtmlParams, "DOM.getOuterHTML", GetOuterHtmlReturns);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFileInputFilesParams {
    pub files: Vec<String>,
    pub node_id: NodeId,
}

impl SetFileInputFilesParams {
    pub fn new(node_id: NodeId, files: Vec<String>) -> Self {
        Self { files, node_id }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetFileInputFilesReturns {}

impl_command!(
    SetFileInputFilesParams,
    "DOM.setFileInputFiles",
    SetFileInputFilesReturns
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_center_is_quad_centroid() {
        let model = BoxModel {
            content: vec![100.0, 100.0, 300.0, 100.0, 300.0, 200.0, 100.0, 200.0],
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(model.content_center(), (200.0, 150.0));
    }
}
