//! Policies a read path consults for the lifetime of a stream.

mod change;
mod input;

pub use change::{
    ChangeDecision, ChangeDetectionPolicy, ChangeMode, ChangeSource, RevisionChangeDetection,
};
pub use input::InputPolicy;
