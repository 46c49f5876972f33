//! Toolkit-free wizard core: form, recording session, review and the
//! navigation between them.

mod form;
mod navigation;
mod profile;
mod review;
mod session;

pub use form::{FieldUpdate, FormField, FormState};
pub use navigation::{Navigation, Route, Wizard};
pub use profile::{Position, ResumeFile};
pub use review::ReviewSummary;
pub use session::{Acquisition, RecorderState, RecordingSession, Tick, INSTRUCTIONS};
