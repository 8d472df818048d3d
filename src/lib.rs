//! Exam-score tracking and focus-session bookkeeping.
//!
//! Persisted data is normalized into a valid [`domain::AppState`] on every load,
//! mutations produce new snapshots through [`app::ScoreBook`], and derived
//! dashboards are computed by [`selectors`] and [`analytics`].

pub mod analytics;
pub mod app;
pub mod config;
pub mod db;
pub mod domain;
pub mod focus_log;
pub mod ids;
pub mod logging;
pub mod normalize;
pub mod payload;
pub mod remote;
pub mod selectors;
pub mod store;
pub mod timer;
