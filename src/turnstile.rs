//! Cloudflare Turnstile detection and solving.
//!
//! A script injected into every new document watches for the widget and for
//! challenge pages, and reports what it finds over the console. The console
//! is the one intentional control channel between page scripts and this
//! crate; the parser tolerates interleaved author logs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_timer::Delay;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cdp::input::{MouseButton, MouseEventType};
use crate::cdp::runtime::EventConsoleApiCalled;
use crate::error::{CdpError, Result};
use crate::page::Page;

/// Synthetic signal emitted through the page emitter whenever the detector
/// reports a new widget or challenge page.
pub const DETECTED_SIGNAL: &str = "turnstile-detected";

const DETECTED_PREFIX: &str = "CDP-TURNSTILE-DETECTED:";
const INTERCEPTED_PREFIX: &str = "CDP-TURNSTILE-INTERCEPTED";
const SOLVED_PREFIX: &str = "CDP-TURNSTILE-SOLVED:";

/// Runs in every new document: intercepts `turnstile.render`, scans the DOM
/// for widget surfaces and challenge page markers, and reports findings as
/// `CDP-TURNSTILE-*` console lines. Also installs the in-page solution
/// helper `_cdp_apply_turnstile_solution`.
pub const DETECTION_SCRIPT: &str = r#"
(function() {
    // challenge pages like to clear the console right when it gets useful
    console.originalClear = console.clear;
    console.clear = function() {
        console.log('Console clear was intercepted');
        console.originalClear();
    };

    const report = () => {
        console.log('CDP-TURNSTILE-DETECTED:' + JSON.stringify(window._cdp_turnstile));
    };

    const checkForTurnstilePage = () => {
        if (typeof window._cf_chl_opt !== 'undefined' && !window._cdp_turnstile) {
            window._cdp_turnstile = {
                type: 'challenge_page',
                detected: true,
                cf_chl_opt: JSON.parse(JSON.stringify(window._cf_chl_opt))
            };
            report();
        }

        const rayIdElement = document.querySelector('[class*="ray-id"]');
        if (rayIdElement) {
            const rayId = rayIdElement.textContent.trim();
            if (!window._cdp_turnstile) {
                window._cdp_turnstile = { type: 'challenge_page', detected: true };
            }
            if (window._cdp_turnstile.rayId !== rayId) {
                window._cdp_turnstile.rayId = rayId;
                report();
            }
        }
    };

    checkForTurnstilePage();

    const interceptTurnstile = () => {
        if (!window.turnstile) return;
        if (!window.turnstile._original_render) {
            window.turnstile._original_render = window.turnstile.render;
        }

        window.turnstile.render = function(container, params) {
            window._cdp_turnstile = {
                type: 'standalone',
                detected: true,
                params: {
                    sitekey: params.sitekey,
                    pageurl: window.location.href,
                    action: params.action || '',
                    cData: params.cData || '',
                    chlPageData: params.chlPageData || '',
                    theme: params.theme || 'light',
                    tabindex: params.tabindex || 0
                }
            };
            window._cdp_turnstile_callback = params.callback;
            report();
            // never actually render: the rendered widget would observe us
            return '_turnstile_dummy_widget_id';
        };

        if (!window.turnstile._original_getResponse) {
            window.turnstile._original_getResponse = window.turnstile.getResponse;
        }
        window.turnstile.getResponse = function(widgetId) {
            if (window._cdp_turnstile && window._cdp_turnstile.solved) {
                return window._cdp_turnstile.token;
            }
            return '';
        };

        console.log('CDP-TURNSTILE-INTERCEPTED');
    };

    const turnstileCheckInterval = setInterval(() => {
        if (window.turnstile) {
            interceptTurnstile();
            clearInterval(turnstileCheckInterval);
        }
    }, 50);

    const widgetPosition = (element) => {
        const rect = element.getBoundingClientRect();
        return {
            x: rect.left,
            y: rect.top,
            width: rect.width,
            height: rect.height,
            centerX: rect.left + rect.width / 2,
            centerY: rect.top + rect.height / 2
        };
    };

    const findTurnstileCheckbox = () => {
        const selectors = [
            'iframe[src*="challenges.cloudflare.com"]',
            'iframe[src*="turnstile"]',
            'iframe.cf-turnstile',
            'div[class*="turnstile"]',
            'div[data-sitekey]'
        ];

        for (const selector of selectors) {
            const element = document.querySelector(selector);
            if (!element) continue;
            if (!window._cdp_turnstile) {
                window._cdp_turnstile = {
                    type: 'checkbox',
                    detected: true,
                    frameId: element.tagName === 'IFRAME' ? (element.id || '') : undefined,
                    elementId: element.tagName === 'IFRAME' ? undefined : (element.id || ''),
                    position: widgetPosition(element)
                };
                report();
            }
            return true;
        }
        return false;
    };

    findTurnstileCheckbox();

    const observer = new MutationObserver((mutations) => {
        for (const mutation of mutations) {
            if (mutation.type !== 'childList') continue;
            const iframe = Array.from(mutation.addedNodes).find(
                node => node.tagName === 'IFRAME' &&
                (node.src || '').includes('challenges.cloudflare.com')
            );
            if (iframe) {
                if (!window._cdp_turnstile) {
                    window._cdp_turnstile = {
                        type: 'iframe',
                        detected: true,
                        src: iframe.src,
                        position: widgetPosition(iframe)
                    };
                    report();
                }
            } else {
                findTurnstileCheckbox();
            }
        }
        checkForTurnstilePage();
    });

    observer.observe(document.documentElement, {
        childList: true,
        subtree: true
    });

    window._cdp_apply_turnstile_solution = function(token) {
        if (!window._cdp_turnstile) {
            console.error('No Turnstile challenge detected to solve');
            return false;
        }

        try {
            if (window._cdp_turnstile.type === 'standalone' && window._cdp_turnstile_callback) {
                window._cdp_turnstile_callback(token);
                window._cdp_turnstile.solved = true;
                window._cdp_turnstile.token = token;
                console.log('CDP-TURNSTILE-SOLVED:standalone');
                return true;
            } else if (window._cdp_turnstile.type === 'challenge_page') {
                const input = document.querySelector('[name="cf-turnstile-response"]');
                if (input) {
                    input.value = token;
                    const form = input.closest('form');
                    if (form) {
                        form.submit();
                        window._cdp_turnstile.solved = true;
                        window._cdp_turnstile.token = token;
                        console.log('CDP-TURNSTILE-SOLVED:challenge_page');
                        return true;
                    }
                }
            }

            console.error('Could not apply Turnstile solution');
            return false;
        } catch (error) {
            console.error('Error applying Turnstile solution:', error);
            return false;
        }
    };
})();
"#;

/// The solved-ness probe: checks the solver flag, the stored token, the
/// challenge status and whether the widget surfaces are gone.
const SOLVED_CHECK: &str = r#"
(() => {
    if (window._cdp_turnstile && window._cdp_turnstile.solved) {
        return { solved: true, method: 'flag' };
    }
    if (window._cdp_turnstile_callback && window._cdp_turnstile && window._cdp_turnstile.token) {
        return { solved: true, method: 'callback' };
    }
    if (window._cf_chl_opt && window._cf_chl_opt.chlStatus === 'passed') {
        return { solved: true, method: 'status' };
    }
    const successIndicators = [
        !document.querySelector('iframe[src*="challenges.cloudflare.com"]'),
        !document.querySelector('iframe[src*="turnstile"]'),
        document.querySelector('.cf-turnstile-success'),
        document.querySelector('.turnstile-success')
    ];
    if (successIndicators.some(Boolean)) {
        return { solved: true, method: 'dom' };
    }
    return { solved: false };
})()
"#;

/// The shapes a Turnstile deployment takes in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnstileKind {
    /// A full Cloudflare interstitial
    ChallengePage,
    /// `turnstile.render` called by the page itself
    Standalone,
    /// A visible checkbox widget
    Checkbox,
    /// A bare widget iframe
    Iframe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnstileParams {
    #[serde(default)]
    pub sitekey: String,
    #[serde(default)]
    pub pageurl: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, rename = "cData")]
    pub c_data: String,
    #[serde(default)]
    pub chl_page_data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPosition {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub center_x: Option<f64>,
    #[serde(default)]
    pub center_y: Option<f64>,
}

impl WidgetPosition {
    pub fn center(&self) -> (f64, f64) {
        (
            self.center_x.unwrap_or(self.x + self.width / 2.0),
            self.center_y.unwrap_or(self.y + self.height / 2.0),
        )
    }
}

/// One detection record as reported by the in-page script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnstileDetection {
    pub r#type: TurnstileKind,
    #[serde(default)]
    pub params: Option<TurnstileParams>,
    #[serde(default)]
    pub position: Option<WidgetPosition>,
    #[serde(default)]
    pub ray_id: Option<String>,
    #[serde(default)]
    pub solved: bool,
    #[serde(default)]
    pub token: Option<String>,
}

/// A parsed `CDP-TURNSTILE-*` console line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TurnstileSignal {
    Detected(TurnstileDetection),
    Intercepted,
    Solved(String),
}

/// Recognize the control-channel prefixes in a console line, tolerating
/// author logs before or after the payload.
pub(crate) fn parse_console_signal(text: &str) -> Option<TurnstileSignal> {
    if let Some(idx) = text.find(DETECTED_PREFIX) {
        let payload = &text[idx + DETECTED_PREFIX.len()..];
        // parse the first json value and ignore whatever trails it
        let mut stream =
            serde_json::Deserializer::from_str(payload).into_iter::<TurnstileDetection>();
        return match stream.next() {
            Some(Ok(detection)) => Some(TurnstileSignal::Detected(detection)),
            _ => None,
        };
    }
    if text.contains(INTERCEPTED_PREFIX) {
        return Some(TurnstileSignal::Intercepted);
    }
    if let Some(idx) = text.find(SOLVED_PREFIX) {
        let kind = text[idx + SOLVED_PREFIX.len()..]
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        return Some(TurnstileSignal::Solved(kind));
    }
    None
}

fn console_text(params: &Value) -> Option<String> {
    let event: EventConsoleApiCalled = serde_json::from_value(params.clone()).ok()?;
    event
        .args
        .first()
        .and_then(|arg| arg.value.as_ref())
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Observes one page for Turnstile activity and can attempt to clear it.
#[derive(Debug)]
pub struct TurnstileWatcher {
    page: Page,
    detections: Arc<Mutex<Vec<TurnstileDetection>>>,
}

impl TurnstileWatcher {
    /// Install the detection script into `page` (current document and all
    /// future ones) and start parsing its console stream.
    pub async fn attach(page: &Page) -> Result<Self> {
        page.add_script_on_new_document(DETECTION_SCRIPT).await?;
        page.evaluate(DETECTION_SCRIPT).await?;

        let detections: Arc<Mutex<Vec<TurnstileDetection>>> = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&detections);
        let emitter = Arc::downgrade(page.emitter());

        page.emitter()
            .on(EventConsoleApiCalled::IDENTIFIER, move |params| {
                let Some(text) = console_text(params) else {
                    return;
                };
                match parse_console_signal(&text) {
                    Some(TurnstileSignal::Detected(detection)) => {
                        tracing::info!(kind = ?detection.r#type, "turnstile detected");
                        let payload =
                            serde_json::to_value(&detection).unwrap_or(Value::Null);
                        store.lock().unwrap().push(detection);
                        if let Some(emitter) = emitter.upgrade() {
                            emitter.emit(DETECTED_SIGNAL, &payload);
                        }
                    }
                    Some(TurnstileSignal::Intercepted) => {
                        tracing::debug!("turnstile render intercepted");
                    }
                    Some(TurnstileSignal::Solved(kind)) => {
                        tracing::info!(%kind, "turnstile solved");
                        if let Some(last) = store.lock().unwrap().last_mut() {
                            last.solved = true;
                        }
                    }
                    None => {}
                }
            });

        Ok(Self {
            page: page.clone(),
            detections,
        })
    }

    /// The most recent detection reported through the console channel.
    pub fn latest_detection(&self) -> Option<TurnstileDetection> {
        self.detections.lock().unwrap().last().cloned()
    }

    /// All detections seen so far.
    pub fn detections(&self) -> Vec<TurnstileDetection> {
        self.detections.lock().unwrap().clone()
    }

    /// Suspend until the detector reports something, or time out.
    pub async fn wait_for_detection(&self, timeout: Duration) -> Result<TurnstileDetection> {
        if let Some(detection) = self.latest_detection() {
            return Ok(detection);
        }
        self.page
            .emitter()
            .wait_for(DETECTED_SIGNAL, timeout)
            .await?;
        self.latest_detection()
            .ok_or_else(|| CdpError::msg("turnstile signal fired without a stored detection"))
    }

    /// Read the in-page detection record directly, bypassing the console
    /// channel.
    pub async fn detection_snapshot(&self) -> Result<Option<TurnstileDetection>> {
        let value = self
            .page
            .evaluate("window._cdp_turnstile || null")
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }

    /// Apply an externally obtained token through the in-page helper.
    ///
    /// Fails fast when no challenge was detected.
    pub async fn apply_solution(&self, token: &str) -> Result<bool> {
        if self.latest_detection().is_none() && self.detection_snapshot().await?.is_none() {
            return Err(CdpError::msg("no turnstile challenge detected to solve"));
        }
        let token_literal = serde_json::to_string(token)?;
        let applied = self
            .page
            .evaluate(format!("window._cdp_apply_turnstile_solution({token_literal})"))
            .await?;
        Ok(applied == Value::Bool(true))
    }

    /// Try to clear a widget with a human-like pointer interaction.
    ///
    /// Returns whether the post-click verification considers the challenge
    /// solved. Never errors for a missing widget.
    pub async fn solve_with_click(&self) -> Result<bool> {
        let Some(detection) = self.latest_detection() else {
            return Ok(false);
        };
        let Some(position) = detection.position else {
            tracing::debug!("detection has no position, cannot click");
            return Ok(false);
        };
        let (center_x, center_y) = position.center();
        tracing::info!(center_x, center_y, "attempting turnstile auto-click");

        let mut input = self.page.input();
        for (x, y, pause) in human_pointer_path(0.0, 0.0, center_x, center_y) {
            input
                .raw_mouse_event(MouseEventType::MouseMoved, x, y, MouseButton::None, 0)
                .await?;
            Delay::new(pause).await;
        }

        // settle like a person does before committing to the click
        let pre_click = rand::thread_rng().gen_range(100..=300);
        Delay::new(Duration::from_millis(pre_click)).await;

        input
            .raw_mouse_event(
                MouseEventType::MousePressed,
                center_x,
                center_y,
                MouseButton::Left,
                1,
            )
            .await?;
        input
            .raw_mouse_event(
                MouseEventType::MouseReleased,
                center_x,
                center_y,
                MouseButton::Left,
                1,
            )
            .await?;

        let settle = rand::thread_rng().gen_range(500..=1000);
        Delay::new(Duration::from_millis(settle)).await;

        self.check_solved().await
    }

    /// Run the scripted solved-ness verification.
    pub async fn check_solved(&self) -> Result<bool> {
        let result = self.page.evaluate(SOLVED_CHECK).await?;
        Ok(result
            .get("solved")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

/// An eased, slightly jittered path from start to target: 10 to 25 steps
/// depending on distance, slower near both endpoints.
fn human_pointer_path(
    start_x: f64,
    start_y: f64,
    end_x: f64,
    end_y: f64,
) -> Vec<(f64, f64, Duration)> {
    let mut rng = rand::thread_rng();
    let distance = ((end_x - start_x).powi(2) + (end_y - start_y).powi(2)).sqrt();
    let steps = ((distance / 10.0) as usize).clamp(10, 25);

    let mut path = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        // ease in and out so velocity peaks mid-path
        let progress = if t < 0.5 {
            2.0 * t * t
        } else {
            -1.0 + (4.0 - 2.0 * t) * t
        };
        let deviation_x = rng.gen_range(-5.0..5.0) * (t * std::f64::consts::PI).sin();
        let deviation_y = rng.gen_range(-5.0..5.0) * (t * std::f64::consts::PI).sin();

        let x = start_x + (end_x - start_x) * progress + deviation_x;
        let y = start_y + (end_y - start_y) * progress + deviation_y;

        let pause = if i < steps / 4 || i > steps * 3 / 4 {
            Duration::from_millis(rng.gen_range(10..=30))
        } else {
            Duration::from_millis(rng.gen_range(5..=10))
        };
        path.push((x, y, pause));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection_lines() {
        let line = r#"CDP-TURNSTILE-DETECTED:{"type":"checkbox","detected":true,"position":{"x":150.0,"y":100.0,"width":100.0,"height":100.0,"centerX":200.0,"centerY":150.0}}"#;
        let Some(TurnstileSignal::Detected(detection)) = parse_console_signal(line) else {
            panic!("expected a detection");
        };
        assert_eq!(detection.r#type, TurnstileKind::Checkbox);
        assert_eq!(detection.position.unwrap().center(), (200.0, 150.0));
        assert!(!detection.solved);
    }

    #[test]
    fn parses_challenge_page_records() {
        let line = r#"CDP-TURNSTILE-DETECTED:{"type":"challenge_page","detected":true,"rayId":"8a1b2c3d"}"#;
        let Some(TurnstileSignal::Detected(detection)) = parse_console_signal(line) else {
            panic!("expected a detection");
        };
        assert_eq!(detection.r#type, TurnstileKind::ChallengePage);
        assert_eq!(detection.ray_id.as_deref(), Some("8a1b2c3d"));
    }

    #[test]
    fn tolerates_interleaved_author_logs() {
        let line = r#"app booted CDP-TURNSTILE-DETECTED:{"type":"standalone","detected":true,"params":{"sitekey":"0xAAA","pageurl":"https://x.test/"}} trailing noise"#;
        let Some(TurnstileSignal::Detected(detection)) = parse_console_signal(line) else {
            panic!("expected a detection");
        };
        assert_eq!(detection.r#type, TurnstileKind::Standalone);
        assert_eq!(detection.params.unwrap().sitekey, "0xAAA");
    }

    #[test]
    fn recognizes_intercepted_and_solved_lines() {
        assert_eq!(
            parse_console_signal("CDP-TURNSTILE-INTERCEPTED"),
            Some(TurnstileSignal::Intercepted)
        );
        assert_eq!(
            parse_console_signal("CDP-TURNSTILE-SOLVED:standalone"),
            Some(TurnstileSignal::Solved("standalone".to_string()))
        );
        assert_eq!(parse_console_signal("just a log line"), None);
        assert_eq!(
            parse_console_signal("CDP-TURNSTILE-DETECTED:not json"),
            None
        );
    }

    #[test]
    fn pointer_path_lands_near_the_target_with_bounded_steps() {
        let path = human_pointer_path(0.0, 0.0, 200.0, 150.0);
        assert!(path.len() >= 10 && path.len() <= 26);

        let (last_x, last_y, _) = path.last().copied().unwrap();
        // jitter collapses at the endpoints
        assert!((last_x - 200.0).abs() < 1.0);
        assert!((last_y - 150.0).abs() < 1.0);

        for (_, _, pause) in &path {
            assert!(*pause >= Duration::from_millis(5));
            assert!(*pause <= Duration::from_millis(30));
        }
    }

    #[test]
    fn detection_script_carries_the_control_channel_markers() {
        assert!(DETECTION_SCRIPT.contains("CDP-TURNSTILE-DETECTED:"));
        assert!(DETECTION_SCRIPT.contains("CDP-TURNSTILE-INTERCEPTED"));
        assert!(DETECTION_SCRIPT.contains("CDP-TURNSTILE-SOLVED:"));
        assert!(DETECTION_SCRIPT.contains("_cdp_apply_turnstile_solution"));
        assert!(DETECTION_SCRIPT.contains("challenges.cloudflare.com"));
    }
}
