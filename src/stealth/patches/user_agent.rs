//! User agent coherence.
//!
//! Detection services cross check the user agent string against platform,
//! vendor and the client hints surface; these patches keep all of them
//! telling the same story.

use crate::stealth::registry::PatchRegistryBuilder;

const USER_AGENT_BASIC: &str = r#"
(() => {
    const userAgent = navigator.userAgent;

    const navigatorProps = {
        userAgent: userAgent,
        appVersion: userAgent.replace('Mozilla/', ''),
        platform: 'MacIntel',
        vendor: 'Google Inc.'
    };

    for (const [key, value] of Object.entries(navigatorProps)) {
        try {
            Object.defineProperty(navigator, key, {
                get: () => value,
                configurable: true,
                enumerable: true
            });
        } catch (e) {
        }
    }
})();
"#;

const USER_AGENT_ADVANCED: &str = r#"
(() => {
    const makeNativeFunction = (fn, name = '') => {
        const wrapped = window.Function('return ' + fn)();
        Object.defineProperty(wrapped, 'name', { value: name });
        Object.defineProperty(wrapped, 'toString', {
            value: function() { return `function ${name || fn.name || ''}() { [native code] }` },
            configurable: true,
            writable: true
        });
        return wrapped;
    };

    const parseUserAgent = (ua) => {
        const result = {
            browserVersion: '121.0.0.0',
            os: 'Mac OS X',
            osVersion: '10_15_7',
            isWindows: false,
            isMac: true,
            isLinux: false,
            isAndroid: false,
            isIOS: false
        };

        const chromeMatch = ua.match(/Chrome\/([\d.]+)/);
        if (chromeMatch) {
            result.browserVersion = chromeMatch[1];
        }

        if (ua.includes('Windows')) {
            result.os = 'Windows';
            result.isWindows = true;
            result.isMac = false;
            const windowsMatch = ua.match(/Windows NT ([\d.]+)/);
            if (windowsMatch) {
                result.osVersion = windowsMatch[1];
            }
        } else if (ua.includes('Mac OS X')) {
            const macMatch = ua.match(/Mac OS X ([\d_]+)/);
            if (macMatch) {
                result.osVersion = macMatch[1];
            }
        } else if (ua.includes('Linux')) {
            result.os = 'Linux';
            result.isLinux = true;
            result.isMac = false;
        } else if (ua.includes('Android')) {
            result.os = 'Android';
            result.isAndroid = true;
            result.isMac = false;
            const androidMatch = ua.match(/Android ([\d.]+)/);
            if (androidMatch) {
                result.osVersion = androidMatch[1];
            }
        } else if (ua.includes('iPhone') || ua.includes('iPad')) {
            result.os = 'iOS';
            result.isIOS = true;
            result.isMac = false;
        }
        return result;
    };

    const userAgent = navigator.userAgent;
    const parsedUA = parseUserAgent(userAgent);

    const navigatorProps = {
        userAgent: userAgent,
        appVersion: userAgent.replace('Mozilla/', ''),
        platform: parsedUA.isMac ? 'MacIntel' :
                  parsedUA.isWindows ? 'Win32' :
                  parsedUA.isLinux ? 'Linux x86_64' :
                  parsedUA.isAndroid ? 'Linux armv8l' :
                  parsedUA.isIOS ? 'iPhone' : 'MacIntel',
        vendor: 'Google Inc.',
        appName: 'Netscape',
        appCodeName: 'Mozilla'
    };

    for (const [key, value] of Object.entries(navigatorProps)) {
        try {
            Object.defineProperty(navigator, key, {
                get: () => value,
                configurable: true,
                enumerable: true
            });
        } catch (e) {
        }
    }

    // the client hints surface has to agree with the string
    if ('userAgentData' in navigator) {
        try {
            const major = parsedUA.browserVersion.split('.')[0];
            const brands = [
                { brand: 'Chrome', version: major },
                { brand: 'Chromium', version: major },
                { brand: 'Not=A?Brand', version: '24' }
            ];
            const mobile = parsedUA.isAndroid || parsedUA.isIOS;
            const platform = parsedUA.isMac ? 'macOS' :
                             parsedUA.isWindows ? 'Windows' :
                             parsedUA.isLinux ? 'Linux' :
                             parsedUA.isAndroid ? 'Android' :
                             parsedUA.isIOS ? 'iOS' : 'macOS';

            const uaData = {
                brands: brands,
                mobile: mobile,
                platform: platform,
                getHighEntropyValues: makeNativeFunction(function getHighEntropyValues(hints) {
                    return Promise.resolve({
                        brands: brands,
                        mobile: mobile,
                        platform: platform,
                        architecture: parsedUA.isMac || parsedUA.isWindows ? 'x86' : 'arm',
                        bitness: '64',
                        model: '',
                        platformVersion: parsedUA.osVersion.replace(/_/g, '.'),
                        uaFullVersion: parsedUA.browserVersion,
                        fullVersionList: brands,
                        wow64: false
                    });
                }, 'getHighEntropyValues'),
                toJSON: makeNativeFunction(function toJSON() {
                    return { brands: this.brands, mobile: this.mobile, platform: this.platform };
                }, 'toJSON')
            };

            Object.defineProperty(navigator, 'userAgentData', {
                get: () => uaData,
                configurable: true,
                enumerable: true
            });
        } catch (e) {
        }
    }

    if ('connection' in navigator) {
        try {
            const connection = {
                downlink: 10,
                effectiveType: '4g',
                rtt: 50,
                saveData: false,
                type: 'wifi',
                onchange: null
            };
            Object.defineProperty(navigator, 'connection', {
                get: () => connection,
                configurable: true,
                enumerable: true
            });
        } catch (e) {
        }
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "user_agent_basic",
        USER_AGENT_BASIC,
        20,
        &[],
        "Basic user agent consistency",
    );
    builder.register(
        "user_agent_advanced",
        USER_AGENT_ADVANCED,
        21,
        &["user_agent_basic"],
        "Advanced user agent consistency with browser-specific values",
    );
}
