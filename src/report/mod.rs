pub mod markdown;
pub mod popup;

pub use markdown::{human_duration, render_day_log};
pub use popup::{reset_today, CurrentSession, PopupView};
