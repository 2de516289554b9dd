//! Atomic instruction-set types of the HanoiVM.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod extension;
mod fault;
mod opcode;
mod tag;
mod tier;

pub use extension::{ExtensionSpec, ExtensionTable};
pub use fault::FaultReason;
pub use opcode::{InvalidOpcode, Opcode, TagClass};
pub use tag::{InvalidTag, Tag};
pub use tier::Tier;
