//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is open.
//!
//! # Tasks
//! - Autosave: writes a snapshot of the live entries at the configured interval

mod autosave;

pub(crate) use autosave::Autosave;
