//! Kotoba: spaced repetition scheduling for Japanese vocabulary
//!
//! The library holds the scheduling core (`srs`) and its configuration;
//! the `kotoba-cli` binary is a thin shell around [`srs::SrsService`].

pub mod config;
pub mod srs;
