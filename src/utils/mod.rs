pub mod clock;
pub mod pagination;
pub mod weekday;

pub use clock::{Clock, ClockReading, FixedClock, SharedClock, SystemClock, parse_utc_offset};
pub use pagination::{PaginationInfo, PaginationParams};
pub use weekday::{DayRule, WEEKDAYS, WeekSchedule, parse_weekday, weekday_name};
