use thiserror::Error;

/// Returned by a handler that reached a feature the translator does not support yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Unimplemented(pub &'static str);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("invalid instruction {word:#010x} at {address:#010x}")]
    InvalidInstruction { address: u32, word: u32 },
    #[error("{name} at {address:#010x}: unimplemented {feature}")]
    Unimplemented {
        name: &'static str,
        address: u32,
        feature: &'static str,
    },
}
