pub mod execution;
pub mod mint;

pub use execution::{
    BatchSubmission, Event, FallbackReason, Instruction, Key, Payment, Setting, Value,
};
