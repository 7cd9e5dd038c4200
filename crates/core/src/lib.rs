//! Core library for translating SRT subtitles with a chat-completion model.

pub mod config;
pub mod error;
pub mod srt;
pub mod translate;
