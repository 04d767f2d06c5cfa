//! UI layer for desktop GUI: connect screen and notes screen.

pub mod app;

pub use app::NotetakerApp;
