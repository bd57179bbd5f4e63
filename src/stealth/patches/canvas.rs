//! Canvas fingerprinting protection.
//!
//! Adds per-session noise to canvas readbacks so two sessions never share a
//! canvas hash, while staying far below what a human could see.

use crate::stealth::registry::PatchRegistryBuilder;

const CANVAS_BASIC: &str = r#"
(() => {
    const getContext = HTMLCanvasElement.prototype.getContext;
    const toDataURL = HTMLCanvasElement.prototype.toDataURL;
    const toBlob = HTMLCanvasElement.prototype.toBlob;

    const addNoise = (canvas) => {
        try {
            // fingerprint canvases are small; leave real artwork alone
            if (canvas.width <= 500 && canvas.height <= 200) {
                const ctx = getContext.call(canvas, '2d');
                const imageData = ctx.getImageData(0, 0, canvas.width, canvas.height);
                const data = imageData.data;
                for (let i = 0; i < data.length; i += 4) {
                    if (Math.random() < 0.05) {
                        data[i] = Math.max(0, Math.min(255, data[i] + (Math.random() > 0.5 ? 1 : -1)));
                        data[i + 1] = Math.max(0, Math.min(255, data[i + 1] + (Math.random() > 0.5 ? 1 : -1)));
                        data[i + 2] = Math.max(0, Math.min(255, data[i + 2] + (Math.random() > 0.5 ? 1 : -1)));
                    }
                }
                ctx.putImageData(imageData, 0, 0);
            }
        } catch (e) {
        }
    };

    HTMLCanvasElement.prototype.toDataURL = function() {
        addNoise(this);
        return toDataURL.apply(this, arguments);
    };

    HTMLCanvasElement.prototype.toBlob = function() {
        addNoise(this);
        return toBlob.apply(this, arguments);
    };

    const fingerprintStrings = [
        'Cwm fjordbank',
        'Sphinx of black quartz',
        'abcdefghijklmnopqrstuvwxyz',
        'mmmmmmmmmmlli'
    ];

    HTMLCanvasElement.prototype.getContext = function() {
        const context = getContext.apply(this, arguments);
        if (arguments[0] === '2d' && context) {
            const originalFillText = context.fillText;
            const originalStrokeText = context.strokeText;

            const jitterTextCall = (args) => {
                const text = args[0] || '';
                if (fingerprintStrings.some(s => text.includes(s))) {
                    if (args[1] !== undefined && args[2] !== undefined) {
                        args[1] += (Math.random() * 0.2) - 0.1;
                        args[2] += (Math.random() * 0.2) - 0.1;
                    }
                }
                return args;
            };

            context.fillText = function() {
                return originalFillText.apply(this, jitterTextCall(arguments));
            };
            context.strokeText = function() {
                return originalStrokeText.apply(this, jitterTextCall(arguments));
            };
        }
        return context;
    };
})();
"#;

const CANVAS_ADVANCED: &str = r#"
(() => {
    // one noise seed per session so repeated reads agree with each other
    const sessionSeed = (() => {
        let seed = 0;
        const ua = navigator.userAgent + (performance.timeOrigin || 0);
        for (let i = 0; i < ua.length; i++) {
            seed = ((seed << 5) - seed) + ua.charCodeAt(i);
            seed = seed & seed;
        }
        return Math.abs(seed) || 1;
    })();

    const seededRandom = (() => {
        let state = sessionSeed;
        return () => {
            state = (state * 9301 + 49297) % 233280;
            return state / 233280;
        };
    })();

    const noiseImageData = (imageData) => {
        const data = imageData.data;
        for (let i = 0; i < data.length; i += 4) {
            if (seededRandom() < 0.04) {
                const delta = seededRandom() > 0.5 ? 1 : -1;
                data[i] = Math.max(0, Math.min(255, data[i] + delta));
                data[i + 1] = Math.max(0, Math.min(255, data[i + 1] + delta));
                data[i + 2] = Math.max(0, Math.min(255, data[i + 2] + delta));
            }
        }
        return imageData;
    };

    const wrapGetImageData = (proto) => {
        if (!proto || !proto.getImageData) return;
        const original = proto.getImageData;
        proto.getImageData = function() {
            return noiseImageData(original.apply(this, arguments));
        };
    };

    wrapGetImageData(CanvasRenderingContext2D.prototype);
    if (typeof OffscreenCanvasRenderingContext2D !== 'undefined') {
        wrapGetImageData(OffscreenCanvasRenderingContext2D.prototype);
    }

    if (typeof OffscreenCanvas !== 'undefined' && OffscreenCanvas.prototype.convertToBlob) {
        const originalConvertToBlob = OffscreenCanvas.prototype.convertToBlob;
        OffscreenCanvas.prototype.convertToBlob = function() {
            try {
                const ctx = this.getContext('2d');
                if (ctx && this.width <= 500 && this.height <= 200) {
                    const imageData = ctx.getImageData(0, 0, this.width, this.height);
                    ctx.putImageData(noiseImageData(imageData), 0, 0);
                }
            } catch (e) {
            }
            return originalConvertToBlob.apply(this, arguments);
        };
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "canvas_basic",
        CANVAS_BASIC,
        50,
        &[],
        "Basic canvas fingerprinting protection with subtle noise",
    );
    builder.register(
        "canvas_advanced",
        CANVAS_ADVANCED,
        51,
        &["canvas_basic"],
        "Advanced canvas fingerprinting protection with consistent fingerprints",
    );
}
