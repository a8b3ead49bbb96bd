//! Driving the host page's own title editor.

pub mod rename;

pub use rename::RenameAutomation;
