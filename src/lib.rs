//! Core library for the `lapreplay` CLI.
//!
//! The library holds the replay orchestration engine: the recording
//! controller that marks laps on the mixer's replay buffer and forces saves
//! before the buffer overflows, the playback controller that drives a queue
//! of segments across render targets, and the remote media adapter that
//! keeps a mixer-hosted media input in step with it. The `lapreplay` binary
//! wires these to an obs-websocket session and a line-oriented console.
pub mod adapters;
pub mod args;
pub mod config;
pub mod domain;
pub mod error;
pub mod playback;
pub mod recorder;
pub mod remote;
pub mod sync;
pub mod system;
