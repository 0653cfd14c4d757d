//! PowerPC (PPU) frontend: decodes guest instruction words and lowers them to HIR.

mod error;
pub mod instruction;
pub mod state;
pub mod tables;
pub mod translator;
pub mod utils;

pub use error::{TranslateError, Unimplemented};
pub use instruction::Instruction;
pub use state::PpuState;
pub use tables::{get_entry, Entry};
pub use translator::Translator;
