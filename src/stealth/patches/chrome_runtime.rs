//! Chrome runtime emulation.
//!
//! Headless sessions miss the `window.chrome` surface that every real
//! install carries; its absence, or an inconsistent one, is a strong
//! automation tell.

use crate::stealth::registry::PatchRegistryBuilder;

const FUNCTION_PROTOTYPES: &str = r#"
(() => {
    try {
        const originalToString = Function.prototype.toString;

        Function.prototype.toString = function() {
            const fnName = this.name || '';
            if (this === Function.prototype.toString ||
                this === Object.getOwnPropertyDescriptor ||
                this === Object.defineProperty ||
                fnName.startsWith('get') ||
                fnName.startsWith('set') ||
                fnName === 'toString' ||
                fnName === 'valueOf' ||
                fnName === 'constructor' ||
                fnName === 'hasOwnProperty') {
                return `function ${fnName}() { [native code] }`;
            }
            return originalToString.call(this);
        };

        Object.defineProperty(Function.prototype.toString, 'toString', {
            value: function() { return 'function toString() { [native code] }'; },
            writable: false,
            configurable: true,
            enumerable: false
        });
    } catch (e) {
        console.error('Error in function_prototypes patch:', e);
    }
})();
"#;

const CHROME_HELPERS: &str = r#"
(() => {
    window.makeNativeFunction = function(fn, name) {
        const wrapped = function() {
            return fn.apply(this, arguments);
        };
        wrapped.toString = function() {
            return 'function ' + (name || fn.name || '') + '() { [native code] }';
        };
        return wrapped;
    };
})();
"#;

const CHROME_RUNTIME_BASIC: &str = r#"
(() => {
    if (!window.chrome) {
        const makeNative = (fn, name = '') => {
            const wrapped = function() {
                return fn.apply(this, arguments);
            };
            wrapped.toString = function() {
                return 'function ' + (name || fn.name || '') + '() { [native code] }';
            };
            return wrapped;
        };

        const chrome = {
            runtime: {},
            app: {},
            loadTimes: makeNative(function() {}, 'loadTimes'),
            csi: makeNative(function() {}, 'csi')
        };

        Object.defineProperty(window, 'chrome', {
            value: chrome,
            configurable: false,
            enumerable: true,
            writable: false
        });

        Object.defineProperty(chrome, Symbol.toStringTag, { value: 'Chrome' });
    }
})();
"#;

const CHROME_RUNTIME_ADVANCED: &str = r#"
(() => {
    if (!window.chrome) return;
    if (!window.makeNativeFunction) return;

    const runtime = Object.create(EventTarget.prototype);

    const runtimeMethods = {
        getURL: function(path) { return 'chrome-extension://' + this.id + '/' + path; },
        reload: function() {},
        requestUpdateCheck: function(callback) {
            const result = { status: 'no_update' };
            if (callback) callback(result);
            return Promise.resolve(result);
        },
        getPlatformInfo: function(callback) {
            const info = { os: 'mac', arch: 'x86-64', nacl_arch: 'x86-64' };
            if (callback) callback(info);
            return Promise.resolve(info);
        },
        connect: function() { return {}; },
        sendMessage: function() {},
        getManifest: function() { return {}; }
    };

    for (const [name, fn] of Object.entries(runtimeMethods)) {
        runtime[name] = window.makeNativeFunction(fn, name);
    }

    Object.defineProperties(runtime, {
        id: { value: 'chrome-extension', configurable: false },
        lastError: { value: undefined, configurable: true },
        OnInstalledReason: {
            value: Object.freeze({ CHROME_UPDATE: 'chrome_update', INSTALL: 'install', UPDATE: 'update' }),
            configurable: false
        },
        OnRestartRequiredReason: {
            value: Object.freeze({ APP_UPDATE: 'app_update', OS_UPDATE: 'os_update', PERIODIC: 'periodic' }),
            configurable: false
        },
        PlatformArch: {
            value: Object.freeze({ ARM: 'arm', ARM64: 'arm64', X86_32: 'x86-32', X86_64: 'x86-64' }),
            configurable: false
        },
        PlatformOs: {
            value: Object.freeze({ ANDROID: 'android', CROS: 'cros', LINUX: 'linux', MAC: 'mac', WIN: 'win' }),
            configurable: false
        }
    });

    const app = {
        InstallState: Object.freeze({ DISABLED: 'disabled', INSTALLED: 'installed', NOT_INSTALLED: 'not_installed' }),
        RunningState: Object.freeze({ CANNOT_RUN: 'cannot_run', READY_TO_RUN: 'ready_to_run', RUNNING: 'running' }),
        getDetails: window.makeNativeFunction(function() { return {}; }, 'getDetails'),
        getIsInstalled: window.makeNativeFunction(function() { return false; }, 'getIsInstalled'),
        installState: window.makeNativeFunction(function() { return 'not_installed'; }, 'installState'),
        isInstalled: false,
        window: {
            get current() { return null; },
            create: window.makeNativeFunction(function() { return {}; }, 'create'),
            getAll: window.makeNativeFunction(function() { return []; }, 'getAll')
        }
    };

    Object.defineProperties(window.chrome, {
        runtime: { value: runtime, configurable: false, enumerable: true, writable: false },
        app: { value: app, configurable: false, enumerable: true, writable: false },
        csi: {
            value: window.makeNativeFunction(function() {
                return {
                    startE: Date.now(),
                    onloadT: Date.now(),
                    pageT: Date.now(),
                    tran: 15
                };
            }, 'csi'),
            configurable: false,
            enumerable: true,
            writable: false
        },
        loadTimes: {
            value: window.makeNativeFunction(function() {
                return {
                    commitLoadTime: Date.now() / 1000,
                    connectionInfo: 'h2',
                    finishDocumentLoadTime: Date.now() / 1000,
                    finishLoadTime: Date.now() / 1000,
                    firstPaintAfterLoadTime: Date.now() / 1000,
                    firstPaintTime: Date.now() / 1000,
                    navigationType: 'Other',
                    npnNegotiatedProtocol: 'h2',
                    requestTime: Date.now() / 1000,
                    startLoadTime: Date.now() / 1000,
                    wasAlternateProtocolAvailable: false,
                    wasFetchedViaSpdy: true,
                    wasNpnNegotiated: true
                };
            }, 'loadTimes'),
            configurable: false,
            enumerable: true,
            writable: false
        }
    });
})();
"#;

const CHROME_PERMISSIONS: &str = r#"
(() => {
    try {
        if (!window.chrome) return;

        const permissionsAPI = {
            getAll: function(callback) {
                const permissions = { permissions: [], origins: [] };
                if (callback) callback(permissions);
                return Promise.resolve(permissions);
            },
            contains: function(permissions, callback) {
                if (callback) callback(false);
                return Promise.resolve(false);
            },
            request: function(permissions, callback) {
                if (callback) callback(false);
                return Promise.resolve(false);
            },
            remove: function(permissions, callback) {
                if (callback) callback(false);
                return Promise.resolve(false);
            }
        };

        const makeNativeFunc = window.makeNativeFunction || function(fn, name) {
            const wrapped = function() {
                return fn.apply(this, arguments);
            };
            wrapped.toString = function() {
                return 'function ' + (name || fn.name || '') + '() { [native code] }';
            };
            return wrapped;
        };

        const wrappedPermissions = {};
        for (const [key, fn] of Object.entries(permissionsAPI)) {
            wrappedPermissions[key] = makeNativeFunc(fn, key);
        }

        if (!window.chrome.permissions) {
            window.chrome.permissions = wrappedPermissions;
            try {
                Object.defineProperty(window.chrome, 'permissions', {
                    value: wrappedPermissions,
                    configurable: false,
                    enumerable: true,
                    writable: false
                });
            } catch (defineError) {
            }
        }
    } catch (e) {
        console.error('Error in chrome_permissions patch:', e);
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "function_prototypes",
        FUNCTION_PROTOTYPES,
        30,
        &[],
        "Make function prototypes appear native",
    );
    builder.register(
        "chrome_helpers",
        CHROME_HELPERS,
        39,
        &[],
        "Helper functions for Chrome emulation",
    );
    builder.register(
        "chrome_runtime_basic",
        CHROME_RUNTIME_BASIC,
        40,
        &[],
        "Basic Chrome runtime emulation",
    );
    builder.register(
        "chrome_runtime_advanced",
        CHROME_RUNTIME_ADVANCED,
        41,
        &["chrome_runtime_basic", "chrome_helpers"],
        "Advanced Chrome runtime emulation with full API support",
    );
    builder.register(
        "chrome_permissions",
        CHROME_PERMISSIONS,
        42,
        &["chrome_runtime_basic", "chrome_runtime_advanced"],
        "Chrome permissions API emulation",
    );
}
