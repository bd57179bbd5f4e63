//! Worker consistency.
//!
//! Workers get a fresh navigator; a page whose main thread lies about its
//! user agent while its workers tell the truth is trivially detectable. The
//! constructors are wrapped so every worker inherits the patched properties.

use crate::stealth::registry::PatchRegistryBuilder;

const WORKER_BASIC: &str = r#"
(() => {
    const mainUserAgent = navigator.userAgent;
    const originalWorker = window.Worker;
    if (!originalWorker) return;

    function PatchedWorker(url, options) {
        try {
            // same-origin script urls get a blob prelude that fixes the
            // navigator before the real script runs
            if (typeof url === 'string' && !url.startsWith('blob:')) {
                const prelude =
                    "Object.defineProperty(navigator, 'userAgent', {" +
                    "  get: function() { return " + JSON.stringify(mainUserAgent) + "; }," +
                    "  configurable: true" +
                    "});" +
                    "importScripts(" + JSON.stringify(new URL(url, location.href).href) + ");";
                const blob = new Blob([prelude], { type: 'application/javascript' });
                return new originalWorker(URL.createObjectURL(blob), options);
            }
        } catch (e) {
        }
        return new originalWorker(url, options);
    }

    PatchedWorker.prototype = originalWorker.prototype;
    PatchedWorker.toString = function() { return 'function Worker() { [native code] }'; };
    window.Worker = PatchedWorker;
})();
"#;

const WORKER_ADVANCED: &str = r#"
(() => {
    const navigatorProps = {
        userAgent: navigator.userAgent,
        appVersion: navigator.appVersion,
        platform: navigator.platform,
        vendor: navigator.vendor,
        language: navigator.language,
        languages: Array.from(navigator.languages || []),
        deviceMemory: navigator.deviceMemory,
        hardwareConcurrency: navigator.hardwareConcurrency,
        appName: navigator.appName,
        appCodeName: navigator.appCodeName,
        cookieEnabled: navigator.cookieEnabled,
        doNotTrack: navigator.doNotTrack,
        maxTouchPoints: navigator.maxTouchPoints
    };

    const workerPrelude =
        "const props = " + JSON.stringify(navigatorProps) + ";" +
        "for (const key of Object.keys(props)) {" +
        "  if (props[key] === undefined) continue;" +
        "  try {" +
        "    Object.defineProperty(navigator, key, {" +
        "      get: function() { return props[key]; }," +
        "      configurable: true" +
        "    });" +
        "  } catch (e) {}" +
        "}" +
        "try { Object.defineProperty(navigator, 'webdriver', { get: function() { return false; }, configurable: true }); } catch (e) {}";

    const wrapWorkerConstructor = (Original, name) => {
        if (!Original) return Original;
        function Patched(url, options) {
            try {
                if (typeof url === 'string' && !url.startsWith('blob:')) {
                    const source = workerPrelude +
                        "importScripts(" + JSON.stringify(new URL(url, location.href).href) + ");";
                    const blob = new Blob([source], { type: 'application/javascript' });
                    return new Original(URL.createObjectURL(blob), options);
                }
            } catch (e) {
            }
            return new Original(url, options);
        }
        Patched.prototype = Original.prototype;
        Patched.toString = function() { return 'function ' + name + '() { [native code] }'; };
        return Patched;
    };

    window.Worker = wrapWorkerConstructor(window.Worker, 'Worker');
    window.SharedWorker = wrapWorkerConstructor(window.SharedWorker, 'SharedWorker');
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "worker_basic",
        WORKER_BASIC,
        30,
        &[],
        "Basic Worker user agent consistency",
    );
    builder.register(
        "worker_advanced",
        WORKER_ADVANCED,
        31,
        &[],
        "Advanced Worker protection with comprehensive property matching",
    );
}
