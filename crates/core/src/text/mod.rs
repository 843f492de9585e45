// Text helpers for untrusted engine output

pub mod ansi;
pub mod duration;

pub use ansi::strip_ansi;
pub use duration::parse_iso_duration;
