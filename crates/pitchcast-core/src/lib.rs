// Shared configuration for the pitchcast crates.

pub mod config;
