//! Hark Library
//!
//! Core modules for the Hark wake-word voice command agent.

pub mod asr;
pub mod audio;
pub mod audit;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod ipc;
pub mod playback;
pub mod players;
pub mod processor;
pub mod tts;
pub mod utils;
