//! Plugin and mime type emulation.
//!
//! Headless Chrome reports an empty `navigator.plugins`; real installs
//! always carry the PDF viewers and Native Client entries.

use crate::stealth::registry::PatchRegistryBuilder;

const PLUGINS_BASIC: &str = r#"
(() => {
    try {
        const createPlugin = (name, description, filename, mimeTypes) => {
            const plugin = { name, description, filename };
            plugin.length = mimeTypes.length;
            plugin.item = function(index) { return this[index]; };
            plugin.namedItem = function(name) { return this[name]; };
            mimeTypes.forEach((mt, i) => {
                const mimeType = {
                    type: mt.type,
                    suffixes: mt.suffixes,
                    description: mt.description,
                    enabledPlugin: plugin
                };
                plugin[i] = mimeType;
                plugin[mt.type] = mimeType;
            });
            return plugin;
        };

        const defaultPlugins = [
            createPlugin(
                'Chrome PDF Plugin',
                'Portable Document Format',
                'internal-pdf-viewer',
                [{ type: 'application/x-google-chrome-pdf', suffixes: 'pdf', description: 'Portable Document Format' }]
            ),
            createPlugin(
                'Chrome PDF Viewer',
                '',
                'mhjfbmdgcfjbbpaeojofohoefgiehjai',
                [{ type: 'application/pdf', suffixes: 'pdf', description: '' }]
            ),
            createPlugin(
                'Native Client',
                '',
                'internal-nacl-plugin',
                [
                    { type: 'application/x-nacl', suffixes: '', description: 'Native Client Executable' },
                    { type: 'application/x-pnacl', suffixes: '', description: 'Portable Native Client Executable' }
                ]
            )
        ];

        const plugins = {};
        plugins.length = defaultPlugins.length;
        plugins.item = function(index) { return this[index]; };
        plugins.namedItem = function(name) { return this[name]; };
        plugins.refresh = function() {};
        plugins[Symbol.iterator] = function* () {
            for (let i = 0; i < this.length; i++) {
                yield this[i];
            }
        };
        defaultPlugins.forEach((plugin, i) => {
            plugins[i] = plugin;
            plugins[plugin.name] = plugin;
        });

        const mimeTypes = {};
        mimeTypes.item = function(index) { return this[index]; };
        mimeTypes.namedItem = function(name) { return this[name]; };
        mimeTypes[Symbol.iterator] = function* () {
            for (let i = 0; i < this.length; i++) {
                yield this[i];
            }
        };
        let mimeTypeIndex = 0;
        for (const plugin of defaultPlugins) {
            for (let j = 0; j < plugin.length; j++) {
                const mimeType = plugin[j];
                mimeTypes[mimeTypeIndex] = mimeType;
                mimeTypes[mimeType.type] = mimeType;
                mimeTypeIndex++;
            }
        }
        mimeTypes.length = mimeTypeIndex;

        navigator.__defineGetter__('plugins', function() { return plugins; });
        navigator.__defineGetter__('mimeTypes', function() { return mimeTypes; });
    } catch (e) {
        console.error('Error in plugins_basic patch:', e);
    }
})();
"#;

const PLUGINS_ADVANCED: &str = r#"
(() => {
    try {
        if (!navigator.plugins || navigator.plugins.length === 0) return;

        // graft the proper prototypes so instanceof checks hold up
        const plugins = navigator.plugins;
        const mimeTypes = navigator.mimeTypes;

        if (typeof PluginArray !== 'undefined') {
            try { Object.setPrototypeOf(plugins, PluginArray.prototype); } catch (e) {}
        }
        if (typeof MimeTypeArray !== 'undefined') {
            try { Object.setPrototypeOf(mimeTypes, MimeTypeArray.prototype); } catch (e) {}
        }
        if (typeof Plugin !== 'undefined') {
            for (let i = 0; i < plugins.length; i++) {
                try { Object.setPrototypeOf(plugins[i], Plugin.prototype); } catch (e) {}
            }
        }
        if (typeof MimeType !== 'undefined') {
            for (let i = 0; i < mimeTypes.length; i++) {
                try { Object.setPrototypeOf(mimeTypes[i], MimeType.prototype); } catch (e) {}
            }
        }

        // accessors read back through natives
        const pluginMethods = ['item', 'namedItem', 'refresh'];
        for (const method of pluginMethods) {
            if (typeof plugins[method] === 'function') {
                plugins[method].toString = function() {
                    return 'function ' + method + '() { [native code] }';
                };
            }
        }
    } catch (e) {
        console.error('Error in plugins_advanced patch:', e);
    }
})();
"#;

pub(crate) fn register(builder: &mut PatchRegistryBuilder) {
    builder.register(
        "plugins_basic",
        PLUGINS_BASIC,
        70,
        &[],
        "Basic plugins and mimeTypes emulation",
    );
    builder.register(
        "plugins_advanced",
        PLUGINS_ADVANCED,
        71,
        &["plugins_basic"],
        "Advanced plugins and mimeTypes emulation with proper prototypes",
    );
}
