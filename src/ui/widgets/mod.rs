// src/ui/widgets/mod.rs

pub mod analysis_view;
pub mod disclaimer_popup;
pub mod footer;
pub mod input;
pub mod log_view;
pub mod narrative_view;
pub mod summary;
