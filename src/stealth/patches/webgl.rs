//! WebGL fingerprinting protection.
//!
//! Spoofs the unmasked vendor and renderer strings and keeps every other
//! fingerprint-relevant parameter consistent within the session.

use crate::stealth::registry::PatchRegistryBuilder;

const WEBGL_BASIC: &str = r#"
(() => {
    if (typeof WebGLRenderingContext === 'undefined') return;
    const getParameter = WebGLRenderingContext.prototype.getParameter;

    const VENDOR = 0x1F00;
    const RENDERER = 0x1F01;
    const UNMASKED_VENDOR_WEBGL = 0x9245;
    const UNMASKED_RENDERER_WEBGL = 0x9246;

    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        switch (parameter) {
            case VENDOR:
                return 'WebKit';
            case RENDERER:
                return 'WebKit WebGL';
            case UNMASKED_VENDOR_WEBGL:
                return 'Google Inc.';
            case UNMASKED_RENDERER_WEBGL:
                return 'ANGLE (Apple, Apple M1 Pro, OpenGL 4.1)';
            default:
                return getParameter.apply(this, arguments);
        }
    };

    if (typeof WebGL2RenderingContext !== 'undefined') {
        WebGL2RenderingContext.prototype.getParameter = WebGLRenderingContext.prototype.getParameter;
    }
})();
"#;

const WEBGL_ADVANCED: &str = r#"
(() => {
    if (typeof WebGLRenderingContext === 'undefined') return;

    // session-stable seed so repeated queries agree
    const fingerprint = (() => {
        let seed = 0;
        const ua = navigator.userAgent;
        for (let i = 0; i < ua.length; i++) {
            seed = ((seed << 5) - seed) + ua.charCodeAt(i);
            seed = seed & seed;
        }
        let state = Math.abs(seed) || 1;
        return {
            random: () => {
                state = (state * 9301 + 49297) % 233280;
                return state / 233280;
            }
        };
    })();

    const getParameter = WebGLRenderingContext.prototype.getParameter;
    const readPixels = WebGLRenderingContext.prototype.readPixels;

    const VENDOR = 0x1F00;
    const RENDERER = 0x1F01;
    const VERSION = 0x1F02;
    const SHADING_LANGUAGE_VERSION = 0x8B8C;
    const UNMASKED_VENDOR_WEBGL = 0x9245;
    const UNMASKED_RENDERER_WEBGL = 0x9246;

    const webglParams = {
        [VENDOR]: 'WebKit',
        [RENDERER]: 'WebKit WebGL',
        [VERSION]: 'WebGL 1.0 (OpenGL ES 2.0 Chromium)',
        [SHADING_LANGUAGE_VERSION]: 'WebGL GLSL ES 1.0 (OpenGL ES GLSL ES 1.0 Chromium)',
        [UNMASKED_VENDOR_WEBGL]: 'Google Inc.',
        [UNMASKED_RENDERER_WEBGL]: 'ANGLE (Apple, Apple M1 Pro, OpenGL 4.1)'
    };

    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        if (Object.prototype.hasOwnProperty.call(webglParams, parameter)) {
            return webglParams[parameter];
        }
        return getParameter.apply(this, arguments);
    };

    // pixel readbacks carry the same kind of per-session noise as canvas
    WebGLRenderingContext.prototype.readPixels = function(x, y, width, height, format, type, pixels) {
        readPixels.apply(this, arguments);
        try {
            if (pixels && pixels.length) {
                for (let i = 0; i < pixels.length; i += 4) {
                    if (fingerprint.random() < 0.02) {
                        pixels[i] = Math.max(0, Math.min(255, pixels[i] + (fingerprint.random() > 0.5 ? 1 : -1)));
                    }
                }
            }
        } catch (e) {
        }
    };

    if (typeof WebGL2RenderingContext !== 'undefined') {
        WebGL2RenderingContext.prototype.getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGL2RenderingContext.prototype.readPixels = WebGLRenderingContext.prototype.readPixels;
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "webgl_basic",
        WEBGL_BASIC,
        60,
        &[],
        "Basic WebGL fingerprinting protection with parameter normalization",
    );
    builder.register(
        "webgl_advanced",
        WEBGL_ADVANCED,
        61,
        &["webgl_basic"],
        "Advanced WebGL fingerprinting protection with consistent variations",
    );
}
