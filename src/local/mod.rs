// src/local/mod.rs
pub mod module;
#[cfg(feature = "rpi")]
pub mod run;
pub mod simulate;
