//! Domain models for the event selection

pub mod event;
pub mod flags;
pub mod objects;
pub mod weights;

// Re-exports
pub use event::{invariant_mass, Event, Flavor, Lepton};
pub use flags::{EventFlags, Stage, STAGE_COUNT};
pub use objects::SelectedObjects;
pub use weights::WeightComponents;
