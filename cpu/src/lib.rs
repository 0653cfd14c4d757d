//! Target-independent pieces of the CPU emulation: the HIR value model,
//! opcode metadata and the builder that frontends translate guest code with.

pub mod hir;
