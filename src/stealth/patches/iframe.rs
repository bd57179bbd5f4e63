//! Iframe consistency.
//!
//! A same-origin child frame exposes its own pristine navigator; detectors
//! compare it against the parent. New frames are observed and patched before
//! author scripts in them run.

use crate::stealth::registry::PatchRegistryBuilder;

const IFRAME_BASIC: &str = r#"
(() => {
    const navigatorProps = {
        userAgent: navigator.userAgent,
        appVersion: navigator.appVersion,
        platform: navigator.platform,
        vendor: navigator.vendor,
        webdriver: false
    };

    const patchFrameNavigator = (frameWindow) => {
        try {
            const frameNavigator = frameWindow.navigator;
            for (const [key, value] of Object.entries(navigatorProps)) {
                try {
                    Object.defineProperty(frameNavigator, key, {
                        get: () => value,
                        configurable: true,
                        enumerable: true
                    });
                } catch (e) {
                }
            }
            try {
                delete Object.getPrototypeOf(frameNavigator).webdriver;
            } catch (e) {
            }
        } catch (e) {
            // cross-origin frames are off limits, which is fine: their
            // navigator is not comparable from this page either
        }
    };

    const originalCreateElement = document.createElement;
    document.createElement = function(tagName) {
        const element = originalCreateElement.apply(this, arguments);
        if (String(tagName).toLowerCase() === 'iframe') {
            const observer = new MutationObserver((mutations, obs) => {
                try {
                    if (element.contentWindow) {
                        patchFrameNavigator(element.contentWindow);
                        obs.disconnect();
                    }
                } catch (e) {
                    obs.disconnect();
                }
            });
            observer.observe(document, { childList: true, subtree: true });
        }
        return element;
    };
})();
"#;

const IFRAME_ADVANCED: &str = r#"
(() => {
    const patchFrameWindow = (frameWindow) => {
        try {
            // mirror the parent's chrome object into the frame
            if (window.chrome && !frameWindow.chrome) {
                try {
                    Object.defineProperty(frameWindow, 'chrome', {
                        value: window.chrome,
                        configurable: false,
                        enumerable: true,
                        writable: false
                    });
                } catch (e) {
                }
            }

            const frameNavigator = frameWindow.navigator;
            for (const key of ['userAgent', 'appVersion', 'platform', 'vendor', 'languages']) {
                const value = navigator[key];
                try {
                    Object.defineProperty(frameNavigator, key, {
                        get: () => value,
                        configurable: true,
                        enumerable: true
                    });
                } catch (e) {
                }
            }
            try {
                Object.defineProperty(frameNavigator, 'webdriver', {
                    get: () => false,
                    configurable: true,
                    enumerable: true
                });
            } catch (e) {
            }
        } catch (e) {
        }
    };

    // catch frames however they enter the document
    const observer = new MutationObserver((mutations) => {
        for (const mutation of mutations) {
            for (const node of mutation.addedNodes) {
                if (node.tagName === 'IFRAME') {
                    if (node.contentWindow) {
                        patchFrameWindow(node.contentWindow);
                    }
                    node.addEventListener('load', () => {
                        if (node.contentWindow) {
                            patchFrameWindow(node.contentWindow);
                        }
                    });
                }
            }
        }
    });
    observer.observe(document.documentElement, { childList: true, subtree: true });

    // frames already present when this runs
    for (const frame of Array.from(document.querySelectorAll('iframe'))) {
        if (frame.contentWindow) {
            patchFrameWindow(frame.contentWindow);
        }
    }

    // contentWindow reads get patched lazily as well, covering srcdoc and
    // about:blank frames that never fire load
    try {
        const descriptor = Object.getOwnPropertyDescriptor(HTMLIFrameElement.prototype, 'contentWindow');
        if (descriptor && descriptor.get) {
            const originalGet = descriptor.get;
            Object.defineProperty(HTMLIFrameElement.prototype, 'contentWindow', {
                get: function() {
                    const frameWindow = originalGet.call(this);
                    if (frameWindow) {
                        patchFrameWindow(frameWindow);
                    }
                    return frameWindow;
                },
                configurable: true,
                enumerable: true
            });
        }
    } catch (e) {
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "iframe_basic",
        IFRAME_BASIC,
        80,
        &[],
        "Basic iframe handling to ensure consistent navigator properties",
    );
    builder.register(
        "iframe_advanced",
        IFRAME_ADVANCED,
        81,
        &["iframe_basic"],
        "Advanced iframe handling with comprehensive property matching",
    );
}
