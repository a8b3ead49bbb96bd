pub mod clock;
pub mod enums;
pub mod session;
pub mod title;

pub use clock::{Clock, ManualClock, SystemClock};
pub use enums::{FilterKind, Phase, WorkState};
pub use session::{day_key, format_hhmm, DayLog, LogBook, Session, IDLE_LABEL};
pub use title::{decode, encode, format_minutes, minutes_from_millis, DecodedTitle};
