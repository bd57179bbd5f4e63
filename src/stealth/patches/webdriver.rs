//! WebDriver property spoofing.
//!
//! The webdriver flag is the first thing every bot detector checks.

use crate::stealth::registry::PatchRegistryBuilder;

const WEBDRIVER_BASIC: &str = r#"
(() => {
    Object.defineProperty(navigator, 'webdriver', {
        get: () => false,
        configurable: true,
        enumerable: true
    });

    try {
        delete Object.getPrototypeOf(navigator).webdriver;
    } catch (e) {
    }
})();
"#;

const WEBDRIVER_ADVANCED: &str = r#"
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

    // layer 1: drop the prototype property
    try {
        const navigatorProto = Object.getPrototypeOf(navigator);
        if (navigatorProto && 'webdriver' in navigatorProto) {
            delete navigatorProto.webdriver;
        }
    } catch (e) {
    }

    // layer 2: an own property that reads false through a native looking getter
    try {
        Object.defineProperty(navigator, 'webdriver', {
            get: makeNativeFunction(function() { return false; }, ''),
            configurable: true,
            enumerable: true
        });
    } catch (e) {
        try { navigator.webdriver = false; } catch (e2) {}
    }

    // layer 3: block later attempts to redefine it
    try {
        const originalDefineProperty = Object.defineProperty;
        Object.defineProperty = function(obj, prop, descriptor) {
            if (obj === navigator && prop === 'webdriver') {
                return obj;
            }
            return originalDefineProperty.call(this, obj, prop, descriptor);
        };
    } catch (e) {
    }

    // layer 4: descriptor probes see a plain false value
    try {
        const originalGetOwnPropertyDescriptor = Object.getOwnPropertyDescriptor;
        Object.getOwnPropertyDescriptor = function(obj, prop) {
            if (obj === navigator && prop === 'webdriver') {
                return { value: false, configurable: true, enumerable: false, writable: true };
            }
            return originalGetOwnPropertyDescriptor.apply(this, arguments);
        };
        const originalGetOwnPropertyDescriptors = Object.getOwnPropertyDescriptors;
        Object.getOwnPropertyDescriptors = function(obj) {
            const descriptors = originalGetOwnPropertyDescriptors.apply(this, arguments);
            if (obj === navigator && descriptors.webdriver) {
                descriptors.webdriver.value = false;
            }
            return descriptors;
        };
    } catch (e) {
    }

    // layer 5: key enumeration never mentions it
    try {
        const originalObjectKeys = Object.keys;
        Object.keys = function(obj) {
            const keys = originalObjectKeys.apply(this, arguments);
            if (obj === navigator) {
                return keys.filter(key => key !== 'webdriver');
            }
            return keys;
        };
        const originalObjectValues = Object.values;
        Object.values = function(obj) {
            const values = originalObjectValues.apply(this, arguments);
            if (obj === navigator && 'webdriver' in obj) {
                const index = originalObjectKeys(obj).indexOf('webdriver');
                if (index !== -1) {
                    values.splice(index, 1);
                }
            }
            return values;
        };
    } catch (e) {
    }
})();
"#;

const WEBDRIVER_EXTREME: &str = r#"
(() => {
    // clone a pristine navigator out of a throwaway frame; aggressive and
    // known to break some sites, hence experimental
    try {
        const iframe = document.createElement('iframe');
        iframe.style.display = 'none';
        document.body.appendChild(iframe);
        const cleanNavigator = iframe.contentWindow.navigator;

        for (const prop in cleanNavigator) {
            if (prop === 'webdriver') continue;
            try {
                const descriptor = Object.getOwnPropertyDescriptor(cleanNavigator, prop);
                if (descriptor && descriptor.configurable) {
                    Object.defineProperty(navigator, prop, descriptor);
                }
            } catch (e) {
            }
        }
        document.body.removeChild(iframe);
    } catch (e) {
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "webdriver_basic",
        WEBDRIVER_BASIC,
        10,
        &[],
        "Basic WebDriver property removal",
    );
    builder.register(
        "webdriver_advanced",
        WEBDRIVER_ADVANCED,
        11,
        &[],
        "Advanced WebDriver property spoofing with multiple layers",
    );
    builder.register(
        "experimental_webdriver_extreme",
        WEBDRIVER_EXTREME,
        12,
        &[],
        "Experimental aggressive WebDriver property protection",
    );
}
