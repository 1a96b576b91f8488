pub mod classify;
pub mod overrides;
pub mod recompute;
pub mod review;
pub mod settings;
pub mod transfer;
pub mod words;
