pub mod arrow;
pub mod fields;
pub mod types;

pub use self::arrow::{date32, utc_micros};
pub use types::{DailyEnergyRecord, MaterialTarget, ScheduleRecord};
