//! Keyboard definitions for synthesized key events.

/// Modifier bits as `Input.dispatchKeyEvent` expects them.
pub mod modifiers {
    pub const ALT: i64 = 1;
    pub const CTRL: i64 = 2;
    pub const META: i64 = 4;
    pub const SHIFT: i64 = 8;
}

/// A key as reported in `Input.dispatchKeyEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDefinition {
    pub key: &'static str,
    pub code: &'static str,
    pub key_code: i64,
}

/// The special keys the input synthesizer knows by name.
pub fn special_key(key: &str) -> Option<KeyDefinition> {
    let def = match key {
        "Enter" => KeyDefinition {
            key: "Enter",
            code: "Enter",
            key_code: 13,
        },
        "Tab" => KeyDefinition {
            key: "Tab",
            code: "Tab",
            key_code: 9,
        },
        "Escape" => KeyDefinition {
            key: "Escape",
            code: "Escape",
            key_code: 27,
        },
        "Backspace" => KeyDefinition {
            key: "Backspace",
            code: "Backspace",
            key_code: 8,
        },
        "Delete" => KeyDefinition {
            key: "Delete",
            code: "Delete",
            key_code: 46,
        },
        "ArrowUp" => KeyDefinition {
            key: "ArrowUp",
            code: "ArrowUp",
            key_code: 38,
        },
        "ArrowDown" => KeyDefinition {
            key: "ArrowDown",
            code: "ArrowDown",
            key_code: 40,
        },
        "ArrowLeft" => KeyDefinition {
            key: "ArrowLeft",
            code: "ArrowLeft",
            key_code: 37,
        },
        "ArrowRight" => KeyDefinition {
            key: "ArrowRight",
            code: "ArrowRight",
            key_code: 39,
        },
        "Home" => KeyDefinition {
            key: "Home",
            code: "Home",
            key_code: 36,
        },
        "End" => KeyDefinition {
            key: "End",
            code: "End",
            key_code: 35,
        },
        "PageUp" => KeyDefinition {
            key: "PageUp",
            code: "PageUp",
            key_code: 33,
        },
        "PageDown" => KeyDefinition {
            key: "PageDown",
            code: "PageDown",
            key_code: 34,
        },
        "Control" => KeyDefinition {
            key: "Control",
            code: "ControlLeft",
            key_code: 17,
        },
        "Shift" => KeyDefinition {
            key: "Shift",
            code: "ShiftLeft",
            key_code: 16,
        },
        "Alt" => KeyDefinition {
            key: "Alt",
            code: "AltLeft",
            key_code: 18,
        },
        "Meta" => KeyDefinition {
            key: "Meta",
            code: "MetaLeft",
            key_code: 91,
        },
        _ => return None,
    };
    Some(def)
}

/// The modifier bit a key contributes while held, if any.
pub fn modifier_bit(key: &str) -> Option<i64> {
    match key {
        "Control" | "ControlLeft" | "ControlRight" => Some(modifiers::CTRL),
        "Shift" | "ShiftLeft" | "ShiftRight" => Some(modifiers::SHIFT),
        "Alt" | "AltLeft" | "AltRight" => Some(modifiers::ALT),
        "Meta" | "MetaLeft" | "MetaRight" => Some(modifiers::META),
        _ => None,
    }
}

/// The physical code reported for a plain character key.
pub fn code_for_char(c: char) -> String {
    if c.is_ascii_alphabetic() {
        format!("Key{}", c.to_ascii_uppercase())
    } else if c.is_ascii_digit() {
        format!("Digit{c}")
    } else {
        c.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_the_editing_keys() {
        let enter = special_key("Enter").unwrap();
        assert_eq!(enter.key_code, 13);
        assert_eq!(enter.code, "Enter");

        let ctrl = special_key("Control").unwrap();
        assert_eq!(ctrl.code, "ControlLeft");
        assert_eq!(ctrl.key_code, 17);

        assert!(special_key("NoSuchKey").is_none());
    }

    #[test]
    fn modifier_bits_match_the_devtools_bitmap() {
        assert_eq!(modifier_bit("Alt"), Some(1));
        assert_eq!(modifier_bit("Control"), Some(2));
        assert_eq!(modifier_bit("Meta"), Some(4));
        assert_eq!(modifier_bit("ShiftRight"), Some(8));
        assert_eq!(modifier_bit("a"), None);
    }

    #[test]
    fn character_codes_follow_the_key_digit_scheme() {
        assert_eq!(code_for_char('a'), "KeyA");
        assert_eq!(code_for_char('Z'), "KeyZ");
        assert_eq!(code_for_char('7'), "Digit7");
        assert_eq!(code_for_char('-'), "-");
    }
}
