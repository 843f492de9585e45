// ISO-8601 duration parsing (engine metadata)

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Parse an ISO-8601 duration such as `PT1M30S` or `PT0.1234567S`.
///
/// Accepts `P[nD][T[nH][nM][n[.f]S]]`. Anything else (years, months, weeks,
/// negative spans, garbage) yields `None`; this never panics.
pub fn parse_iso_duration(input: &str) -> Option<Duration> {
    let rest = input.trim().strip_prefix('P')?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut total = Duration::ZERO;
    let mut components = 0;

    if !date_part.is_empty() {
        let days = parse_whole(date_part.strip_suffix('D')?)?;
        total = total.checked_add(Duration::from_secs(days.checked_mul(SECS_PER_DAY)?))?;
        components += 1;
    }

    if let Some(time) = time_part {
        if time.is_empty() {
            return None;
        }
        total = total.checked_add(parse_time_part(time)?)?;
        components += 1;
    }

    (components > 0).then_some(total)
}

// H, M and S must each appear at most once and in that order
fn parse_time_part(time: &str) -> Option<Duration> {
    let mut total = Duration::ZERO;
    let mut remaining = time;
    let mut last_rank = 0;

    while !remaining.is_empty() {
        let idx = remaining.find(|c: char| c.is_ascii_alphabetic())?;
        let (number, tail) = remaining.split_at(idx);
        let unit = tail.as_bytes()[0];
        remaining = &tail[1..];

        let rank = match unit {
            b'H' => 1,
            b'M' => 2,
            b'S' => 3,
            _ => return None,
        };
        if rank <= last_rank {
            return None;
        }
        last_rank = rank;

        let part = match unit {
            b'H' => Duration::from_secs(parse_whole(number)?.checked_mul(SECS_PER_HOUR)?),
            b'M' => Duration::from_secs(parse_whole(number)?.checked_mul(SECS_PER_MINUTE)?),
            _ => parse_seconds(number)?,
        };
        total = total.checked_add(part)?;
    }

    Some(total)
}

fn parse_whole(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_seconds(number: &str) -> Option<Duration> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (number, None),
    };

    let secs = parse_whole(whole)?;
    let nanos = match fraction {
        None => 0,
        Some(fraction) => {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Sub-nanosecond digits are dropped
            let digits = &fraction[..fraction.len().min(9)];
            let value: u32 = digits.parse().ok()?;
            value * 10u32.pow(9 - digits.len() as u32)
        }
    };

    Some(Duration::new(secs, nanos))
}
