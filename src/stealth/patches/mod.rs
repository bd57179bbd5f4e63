//! The built in patch catalogue.
//!
//! Each module contributes self contained scripts whose observable effect is
//! to make the automated browser indistinguishable from a stock install on
//! the surface detectors probe.

use crate::stealth::registry::PatchRegistryBuilder;

mod canvas;
mod chrome_runtime;
mod iframe;
mod plugins;
mod user_agent;
mod webdriver;
mod webgl;
mod worker;

/// Populate `builder` with every built in patch.
pub(crate) fn register_builtin(builder: &mut PatchRegistryBuilder) {
    webdriver::register(builder);
    user_agent::register(builder);
    chrome_runtime::register(builder);
    plugins::register(builder);
    worker::register(builder);
    iframe::register(builder);
    canvas::register(builder);
    webgl::register(builder);

    // the turnstile detector doubles as a patch so stealth pages carry it
    // without explicit opt-in
    builder.register(
        "turnstile_compat",
        crate::turnstile::DETECTION_SCRIPT,
        20,
        &[],
        "Detects and handles Cloudflare Turnstile challenges",
    );
}
