use std::collections::HashMap;
use std::time::Duration;

use futures_timer::Delay;
use serde_json::Value;

use crate::cdp::dom::{
    GetBoxModelParams, GetDocumentParams, NodeId, QuerySelectorParams, SetFileInputFilesParams,
};
use crate::cdp::input::{
    DispatchKeyEventParams, DispatchMouseEventParams, KeyEventType, MouseButton, MouseEventType,
};
use crate::error::{CdpError, Result};
use crate::keys;
use crate::page::Page;

const SELECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for pointer clicks.
#[derive(Debug, Clone)]
pub struct ClickOptions {
    pub button: MouseButton,
    pub click_count: i64,
    /// Pause between press and release
    pub delay: Duration,
    /// Click even when the element is not visible
    pub force: bool,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            click_count: 1,
            delay: Duration::ZERO,
            force: false,
        }
    }
}

/// Options for typing into an element.
#[derive(Debug, Clone)]
pub struct TypeOptions {
    /// Pause between keystrokes
    pub delay: Duration,
    /// Clear the current value before typing
    pub clear: bool,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(50),
            clear: false,
        }
    }
}

/// Translates high level actions into `Input.*` events and DOM queries.
///
/// Owns the keyboard modifier bitmap of its page; create one per page and
/// never share it across pages.
#[derive(Debug)]
pub struct Input {
    page: Page,
    modifiers: i64,
}

impl Input {
    pub(crate) fn new(page: Page) -> Self {
        Self { page, modifiers: 0 }
    }

    /// Click the element matching `selector` at its content box centre.
    pub async fn click(&mut self, selector: &str) -> Result<()> {
        self.click_with(selector, ClickOptions::default()).await
    }

    pub async fn click_with(&mut self, selector: &str, options: ClickOptions) -> Result<()> {
        if !options.force {
            self.page
                .wait_for_selector(selector, SELECTOR_TIMEOUT)
                .await
                .map_err(|_| {
                    CdpError::Input(format!("element not found or not visible: {selector}"))
                })?;
        }
        let (x, y) = self.click_point(selector).await?;

        self.mouse_event(
            MouseEventType::MousePressed,
            x,
            y,
            options.button,
            options.click_count,
        )
        .await?;
        if !options.delay.is_zero() {
            Delay::new(options.delay).await;
        }
        self.mouse_event(
            MouseEventType::MouseReleased,
            x,
            y,
            options.button,
            options.click_count,
        )
        .await
    }

    pub async fn double_click(&mut self, selector: &str) -> Result<()> {
        self.click_with(
            selector,
            ClickOptions {
                click_count: 2,
                ..Default::default()
            },
        )
        .await
    }

    /// Move the pointer over the element without pressing a button.
    pub async fn hover(&mut self, selector: &str) -> Result<()> {
        let (x, y) = self.click_point(selector).await?;
        self.mouse_event(MouseEventType::MouseMoved, x, y, MouseButton::None, 0)
            .await
    }

    /// Type text into the element, one key event pair per character.
    pub async fn type_text(
        &mut self,
        selector: &str,
        text: &str,
        options: TypeOptions,
    ) -> Result<()> {
        // focus through a real click
        self.click(selector).await?;

        if options.clear {
            let selector_literal = serde_json::to_string(selector)?;
            self.page
                .evaluate(format!(
                    "(function() {{\
                        const el = document.querySelector({selector_literal});\
                        if (el) {{\
                            el.value = '';\
                            el.dispatchEvent(new Event('input', {{ bubbles: true }}));\
                            el.dispatchEvent(new Event('change', {{ bubbles: true }}));\
                        }}\
                    }})()"
                ))
                .await?;
        }

        for c in text.chars() {
            self.press(&c.to_string()).await?;
            if !options.delay.is_zero() {
                Delay::new(options.delay).await;
            }
        }
        Ok(())
    }

    /// Press and release a single key, by name for special keys or as a plain
    /// character.
    pub async fn press(&mut self, key: &str) -> Result<()> {
        self.key_event(KeyEventType::KeyDown, key).await?;
        self.key_event(KeyEventType::KeyUp, key).await
    }

    /// Press a combination like Ctrl+C: all keys down in order, released in
    /// reverse.
    pub async fn press_combo(&mut self, combo: &[&str]) -> Result<()> {
        for key in combo {
            self.key_event(KeyEventType::KeyDown, key).await?;
        }
        for key in combo.iter().rev() {
            self.key_event(KeyEventType::KeyUp, key).await?;
        }
        Ok(())
    }

    /// Select the given values in a `<select>` element.
    pub async fn select(&mut self, selector: &str, values: &[&str]) -> Result<()> {
        let selector_literal = serde_json::to_string(selector)?;
        let values_literal = serde_json::to_string(values)?;
        let script = format!(
            "(function() {{\
                const select = document.querySelector({selector_literal});\
                if (!select) return false;\
                const values = {values_literal};\
                for (const option of Array.from(select.options)) {{\
                    option.selected = values.includes(option.value);\
                }}\
                select.dispatchEvent(new Event('input', {{ bubbles: true }}));\
                select.dispatchEvent(new Event('change', {{ bubbles: true }}));\
                return true;\
            }})()"
        );
        if self.page.evaluate(script).await? != Value::Bool(true) {
            return Err(CdpError::Input(format!(
                "failed to select options in element: {selector}"
            )));
        }
        Ok(())
    }

    /// Check or uncheck a checkbox, dispatching the input and change events a
    /// real interaction would.
    pub async fn check(&mut self, selector: &str, check: bool) -> Result<()> {
        let selector_literal = serde_json::to_string(selector)?;
        let script = format!(
            "(function() {{\
                const checkbox = document.querySelector({selector_literal});\
                if (!checkbox || checkbox.type !== 'checkbox') return false;\
                if (checkbox.checked !== {check}) {{\
                    checkbox.checked = {check};\
                    checkbox.dispatchEvent(new Event('input', {{ bubbles: true }}));\
                    checkbox.dispatchEvent(new Event('change', {{ bubbles: true }}));\
                }}\
                return true;\
            }})()"
        );
        if self.page.evaluate(script).await? != Value::Bool(true) {
            return Err(CdpError::Input(format!(
                "failed to {} checkbox: {selector}",
                if check { "check" } else { "uncheck" }
            )));
        }
        Ok(())
    }

    /// Fill a form field by field, routing each entry by its detected type,
    /// and optionally submit.
    pub async fn fill_form(
        &mut self,
        fields: &HashMap<String, String>,
        submit: bool,
        submit_selector: Option<&str>,
    ) -> Result<()> {
        for (selector, value) in fields {
            let selector_literal = serde_json::to_string(selector)?;
            let kind = self
                .page
                .evaluate(format!(
                    "(function() {{\
                        const el = document.querySelector({selector_literal});\
                        if (!el) return 'not-found';\
                        if (el.tagName === 'SELECT') return 'select';\
                        if (el.tagName === 'TEXTAREA') return 'textarea';\
                        if (el.tagName === 'INPUT') return el.type || 'text';\
                        return 'other';\
                    }})()"
                ))
                .await?;
            match kind.as_str().unwrap_or("not-found") {
                "not-found" => {
                    return Err(CdpError::Input(format!("form field not found: {selector}")))
                }
                "select" => self.select(selector, &[value.as_str()]).await?,
                "checkbox" => {
                    let on = matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on");
                    self.check(selector, on).await?
                }
                "radio" => self.click(selector).await?,
                _ => {
                    self.type_text(
                        selector,
                        value,
                        TypeOptions {
                            clear: true,
                            ..Default::default()
                        },
                    )
                    .await?
                }
            }
        }

        if submit {
            if let Some(submit_selector) = submit_selector {
                self.click(submit_selector).await?;
            } else {
                let submitted = self
                    .page
                    .evaluate(
                        "(function() {\
                            const btn = document.querySelector('button[type=\"submit\"], input[type=\"submit\"]');\
                            if (btn) { btn.click(); return true; }\
                            const form = document.querySelector('form');\
                            if (form) { form.submit(); return true; }\
                            return false;\
                        })()",
                    )
                    .await?;
                if submitted != Value::Bool(true) {
                    return Err(CdpError::Input(
                        "failed to submit form: no submit button found".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Attach local files to a file input.
    pub async fn upload_file(&mut self, selector: &str, files: Vec<String>) -> Result<()> {
        let node_id = self.node_id(selector).await?;
        self.page
            .execute(SetFileInputFilesParams::new(node_id, files))
            .await?;
        Ok(())
    }

    /// Dispatch a raw mouse event at page coordinates.
    pub(crate) async fn raw_mouse_event(
        &mut self,
        r#type: MouseEventType,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: i64,
    ) -> Result<()> {
        self.mouse_event(r#type, x, y, button, click_count).await
    }

    async fn node_id(&self, selector: &str) -> Result<NodeId> {
        let root = self
            .page
            .execute(GetDocumentParams::default())
            .await?
            .result
            .root;
        let node_id = self
            .page
            .execute(QuerySelectorParams::new(root.node_id, selector))
            .await?
            .result
            .node_id;
        if node_id == 0 {
            return Err(CdpError::Input(format!("element not found: {selector}")));
        }
        Ok(node_id)
    }

    async fn click_point(&self, selector: &str) -> Result<(f64, f64)> {
        let node_id = self.node_id(selector).await?;
        let model = self
            .page
            .execute(GetBoxModelParams::new(node_id))
            .await
            .map_err(|_| {
                CdpError::Input(format!("failed to get box model for element: {selector}"))
            })?
            .result
            .model;
        Ok(model.content_center())
    }

    async fn mouse_event(
        &mut self,
        r#type: MouseEventType,
        x: f64,
        y: f64,
        button: MouseButton,
        click_count: i64,
    ) -> Result<()> {
        self.page
            .execute(
                DispatchMouseEventParams::new(r#type, x, y)
                    .button(button)
                    .click_count(click_count)
                    .modifiers(self.modifiers),
            )
            .await?;
        Ok(())
    }

    async fn key_event(&mut self, r#type: KeyEventType, key: &str) -> Result<()> {
        let (key_name, code, key_code, text) = match keys::special_key(key) {
            Some(def) => (def.key.to_string(), def.code.to_string(), def.key_code, String::new()),
            None => {
                let mut chars = key.chars();
                let (first, rest) = (chars.next(), chars.next());
                match (first, rest) {
                    (Some(c), None) => (
                        key.to_string(),
                        keys::code_for_char(c),
                        c as i64,
                        key.to_string(),
                    ),
                    _ => (key.to_string(), key.to_string(), 0, String::new()),
                }
            }
        };

        if let Some(bit) = keys::modifier_bit(&key_name) {
            match r#type {
                KeyEventType::KeyDown => self.modifiers |= bit,
                KeyEventType::KeyUp => self.modifiers &= !bit,
                _ => {}
            }
        }

        self.page
            .execute(DispatchKeyEventParams {
                r#type,
                key: key_name,
                code,
                text,
                key_code,
                location: 0,
                modifiers: self.modifiers,
            })
            .await?;
        Ok(())
    }
}
