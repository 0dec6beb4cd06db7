//! Turns synthesized speech into audiobook files: `m4b` for full books, `mp3`
//! for summaries, tagged with the document's title, author and cover.

pub mod error;
mod packager;
mod tags;

pub use crate::packager::{AudioPackager, Packager, WaveformInfo, inspect_waveform};
pub use crate::tags::{Container, SUMMARY_ALBUM, TagSet, Variant};
