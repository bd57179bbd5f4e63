//! Hand-typed views of the CDP surface the client relies on.
//!
//! Frames travel as raw json; these types exist for the commands and events
//! the crate itself inspects. Everything else stays a `serde_json::Value`.

/// Implements `Method` and `Command` for a params struct.
macro_rules! impl_command {
    ($params:ident, $identifier:expr, $returns:ty) => {
        impl $params {
            pub const IDENTIFIER: &'static str = $identifier;
        }

        impl $crate::protocol::Method for $params {
            fn identifier(&self) -> $crate::protocol::MethodId {
                Self::IDENTIFIER.into()
            }
        }

        impl $crate::protocol::Command for $params {
            type Response = $returns;
        }
    };
}

pub(crate) use impl_command;

pub mod dom;
pub mod emulation;
pub mod input;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;
