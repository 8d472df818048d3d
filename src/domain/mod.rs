pub mod exam;
pub mod focus;
pub mod update;

pub use exam::{AppState, ExamEntry, ExamPayload, Subject};
pub use focus::FocusEntry;
