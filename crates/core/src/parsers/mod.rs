//! Stateless slot parsers for guest messages.
//!
//! All of these prefer returning `None` over guessing: an unset slot makes
//! the dialog engine ask again, which is always recoverable, while a wrong
//! value silently corrupts a booking.

pub mod date;
pub mod fuzzy;
pub mod guests;
pub mod name;
pub mod time;

pub use date::{contains_date_phrase, parse_date, to_iso, ParsedDate};
pub use fuzzy::fuzzy_match;
pub use guests::parse_guests;
pub use name::parse_name;
pub use time::{
    contains_time_pattern, daypart_hint, parse_time, resolve_pending, Daypart, TimeParse,
};
