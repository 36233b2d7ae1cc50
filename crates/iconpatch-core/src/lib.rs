//! Replace the tray, window and notification icons inside an Electron
//! client's `app.asar`.
//!
//! The pipeline runs leaves first: [`icon`] normalizes and encodes the
//! selected artwork, [`archive`] reads and rewrites the container, and
//! [`patch`] plans the change, keeps originals recoverable and commits the
//! result atomically.

pub mod archive;
pub mod icon;
pub mod patch;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
