//! Installs the selected patches into a freshly created page.

use serde_json::Value;

use crate::cdp::network::{SetUserAgentOverrideParams, UserAgentBrandVersion, UserAgentMetadata};
use crate::error::{CdpError, Result};
use crate::page::Page;
use crate::stealth::{Patch, PatchRegistry, StealthProfile};

/// Install every patch the profile selects into `page`: registered as
/// new-document scripts so they run before any author script, and evaluated
/// immediately so the current document is covered too. Known-critical
/// patches are verified through a post-condition probe.
///
/// Afterwards the user agent and viewport overrides of the profile are
/// applied.
pub(crate) async fn apply_stealth(
    page: &Page,
    profile: &StealthProfile,
    registry: &PatchRegistry,
) -> Result<()> {
    let patches = registry.get_ordered_patches(profile.level())?;
    tracing::debug!(
        level = profile.level().as_str(),
        count = patches.len(),
        "applying stealth patches"
    );

    for patch in &patches {
        install_patch(page, patch).await?;
    }
    verify_combined(page, &patches).await?;

    // language preferences are profile data, not a static patch
    let languages = serde_json::to_string(profile.languages())?;
    let language_script = format!(
        "(() => {{\
            try {{\
                Object.defineProperty(navigator, 'languages', {{\
                    get: () => {languages},\
                    configurable: true,\
                    enumerable: true\
                }});\
            }} catch (e) {{}}\
        }})();"
    );
    page.add_script_on_new_document(language_script.clone())
        .await?;
    page.evaluate(language_script).await?;

    page.set_user_agent(user_agent_override(profile)).await?;
    let (width, height) = profile.window_size();
    page.set_viewport(width, height).await?;
    Ok(())
}

async fn install_patch(page: &Page, patch: &Patch) -> Result<()> {
    tracing::debug!(name = %patch.name, "installing patch");
    page.add_script_on_new_document(patch.script.to_string())
        .await?;
    page.evaluate(patch.script.to_string())
        .await
        .map_err(|err| CdpError::Patch {
            patch: patch.name.to_string(),
            message: err.to_string(),
        })?;

    if let Some(check) = verification_check(&patch.name) {
        let ok = page.evaluate(check).await?;
        if ok != Value::Bool(true) {
            return Err(CdpError::PatchVerification {
                patch: patch.name.to_string(),
                check: check.to_string(),
            });
        }
    }
    Ok(())
}

/// The post-condition probe for patches whose failure would break the whole
/// disguise.
fn verification_check(patch: &str) -> Option<&'static str> {
    match patch {
        "chrome_runtime_basic" => Some("typeof window.chrome === 'object'"),
        "chrome_runtime_advanced" => Some("typeof window.chrome.runtime === 'object'"),
        "webdriver_basic" | "webdriver_advanced" => Some("navigator.webdriver === false"),
        "plugins_basic" | "plugins_advanced" => Some("navigator.plugins.length > 0"),
        _ => None,
    }
}

/// One combined snapshot over everything that was installed, so an
/// interaction between patches cannot silently undo an earlier verification.
async fn verify_combined(page: &Page, patches: &[&Patch]) -> Result<()> {
    let applied = |name: &str| patches.iter().any(|p| p.name == name);

    let snapshot = page
        .evaluate(
            "(() => {\
                const results = {};\
                try {\
                    results.chrome = typeof window.chrome === 'object';\
                    results.runtime = window.chrome && typeof window.chrome.runtime === 'object';\
                    results.webdriver = navigator.webdriver === false;\
                    results.webdriverExists = 'webdriver' in navigator;\
                    results.vendor = navigator.vendor === 'Google Inc.';\
                    results.plugins = navigator.plugins.length > 0;\
                    results.error = null;\
                } catch (e) {\
                    results.error = e.message;\
                }\
                return results;\
            })()",
        )
        .await?;

    if let Some(error) = snapshot.get("error").and_then(Value::as_str) {
        return Err(CdpError::Patch {
            patch: "combined".to_string(),
            message: error.to_string(),
        });
    }

    let confirmed = |key: &str| snapshot.get(key).and_then(Value::as_bool).unwrap_or(false);

    if applied("chrome_runtime_basic") && !confirmed("chrome") {
        return Err(CdpError::PatchVerification {
            patch: "chrome_runtime_basic".to_string(),
            check: "typeof window.chrome === 'object'".to_string(),
        });
    }
    if applied("webdriver_basic") && !(confirmed("webdriver") && confirmed("webdriverExists")) {
        return Err(CdpError::PatchVerification {
            patch: "webdriver_basic".to_string(),
            check: "navigator.webdriver === false && 'webdriver' in navigator".to_string(),
        });
    }
    if applied("plugins_basic") && !confirmed("plugins") {
        return Err(CdpError::PatchVerification {
            patch: "plugins_basic".to_string(),
            check: "navigator.plugins.length > 0".to_string(),
        });
    }
    Ok(())
}

/// The wire-level user agent override matching the profile, including the
/// client hints metadata a real install would report.
fn user_agent_override(profile: &StealthProfile) -> SetUserAgentOverrideParams {
    let major = profile
        .user_agent()
        .split("Chrome/")
        .nth(1)
        .and_then(|v| v.split('.').next())
        .unwrap_or("121")
        .to_string();

    let brands = vec![
        UserAgentBrandVersion {
            brand: "Chrome".to_string(),
            version: major.clone(),
        },
        UserAgentBrandVersion {
            brand: "Chromium".to_string(),
            version: major.clone(),
        },
        UserAgentBrandVersion {
            brand: "Not=A?Brand".to_string(),
            version: "24".to_string(),
        },
    ];

    SetUserAgentOverrideParams {
        user_agent: profile.user_agent().to_string(),
        accept_language: Some(profile.accept_language()),
        platform: Some("MacIntel".to_string()),
        user_agent_metadata: Some(UserAgentMetadata {
            brands,
            full_version: format!("{major}.0.0.0"),
            platform: "macOS".to_string(),
            platform_version: "10.15.7".to_string(),
            architecture: "x86".to_string(),
            model: String::new(),
            mobile: false,
            bitness: "64".to_string(),
            wow64: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stealth::StealthProfileBuilder;

    #[test]
    fn override_metadata_tracks_the_user_agent_major() {
        let profile = StealthProfileBuilder::default()
            .user_agent(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                 AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.6367.60 Safari/537.36",
            )
            .build()
            .unwrap();
        let params = user_agent_override(&profile);
        let metadata = params.user_agent_metadata.unwrap();
        assert_eq!(metadata.full_version, "124.0.0.0");
        assert!(metadata
            .brands
            .iter()
            .any(|b| b.brand == "Chrome" && b.version == "124"));
    }

    #[test]
    fn critical_patches_have_verification_probes() {
        for name in [
            "chrome_runtime_basic",
            "chrome_runtime_advanced",
            "webdriver_basic",
            "webdriver_advanced",
            "plugins_basic",
        ] {
            assert!(verification_check(name).is_some(), "{name} must be probed");
        }
        assert!(verification_check("canvas_basic").is_none());
    }
}
