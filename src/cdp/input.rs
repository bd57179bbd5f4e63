use serde::{Deserialize, Serialize};

use super::impl_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    MousePressed,
    MouseReleased,
    MouseMoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
    None,
}

impl MouseButton {
    /// Lenient parse; anything unrecognized falls back to the left button the
    /// way the original did.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "middle" => MouseButton::Middle,
            "right" => MouseButton::Right,
            "none" => MouseButton::None,
            _ => MouseButton::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMouseEventParams {
    pub r#type: MouseEventType,
    pub x: f64,
    pub y: f64,
    pub button: MouseButton,
    pub click_count: i64,
    pub modifiers: i64,
}

impl DispatchMouseEventParams {
    pub fn new(r#type: MouseEventType, x: f64, y: f64) -> Self {
        Self {
            r#type,
            x,
            y,
            button: MouseButton::Left,
            click_count: 1,
            modifiers: 0,
        }
    }

    pub fn button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn click_count(mut self, count: i64) -> Self {
        self.click_count = count;
        self
    }

    pub fn modifiers(mut self, modifiers: i64) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchMouseEventReturns {}

impl_command!(
    DispatchMouseEventParams,
    "Input.dispatchMouseEvent",
    DispatchMouseEventReturns
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
    RawKeyDown,
    Char,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchKeyEventParams {
    pub r#type: KeyEventType,
    pub key: String,
    pub code: String,
    pub text: String,
    pub key_code: i64,
    pub location: i64,
    pub modifiers: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchKeyEventReturns {}

impl_command!(
    DispatchKeyEventParams,
    "Input.dispatchKeyEvent",
    DispatchKeyEventReturns
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertTextParams {
    pub text: String,
}

impl InsertTextParams {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsertTextReturns {}

impl_command!(InsertTextParams, "Input.insertText", InsertTextReturns);
