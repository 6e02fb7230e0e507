//! Core library for beatbridge: copy playlists between Spotify and YouTube Music.
pub mod config;
pub mod error;
pub mod models;
pub mod api;
pub mod matcher;
pub mod transfer;
pub mod server;
pub mod util;
