pub mod reset_schedule;

pub use reset_schedule::{next_reset, next_reset_after, truncate_to_midnight};
