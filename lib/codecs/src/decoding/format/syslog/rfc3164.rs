use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};

use super::{Message, priority};
use crate::decoding::DeserializeError;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// `Mmm dd hh:mm:ss`
const TIMESTAMP_LEN: usize = 15;

// RFC 3164 limits the TAG to 32 characters, but plenty of daemons ignore it.
const MAX_TAG_LEN: usize = 48;

pub(super) fn parse(input: &str) -> Result<Message<'_>, DeserializeError> {
    let (priority, rest) = match priority(input)? {
        Some((pri, rest)) => (Some(pri), rest),
        None => (None, input),
    };

    let (timestamp, rest) = timestamp(rest)?;
    let rest = rest
        .strip_prefix(' ')
        .ok_or(DeserializeError::Malformed("expected a space after the timestamp"))?;

    let (hostname, rest) = rest.split_once(' ').unwrap_or((rest, ""));
    if hostname.is_empty() {
        return Err(DeserializeError::Malformed("missing hostname"));
    }

    let (app_name, proc_id, msg) = tag(rest.trim_start());

    Ok(Message {
        priority,
        timestamp: Some(timestamp),
        hostname: Some(hostname),
        app_name,
        proc_id,
        msg,
        ..Default::default()
    })
}

fn timestamp(input: &str) -> Result<(DateTime<Utc>, &str), DeserializeError> {
    let text = input
        .get(..TIMESTAMP_LEN)
        .ok_or(DeserializeError::Malformed("missing timestamp"))?;
    let b = text.as_bytes();

    if !text.is_ascii() || b[3] != b' ' || b[6] != b' ' || b[9] != b':' || b[12] != b':' {
        return Err(DeserializeError::Malformed("invalid timestamp"));
    }

    let month = MONTHS
        .iter()
        .position(|m| *m == &text[..3])
        .ok_or(DeserializeError::Malformed("invalid month"))? as u32
        + 1;
    let day = number(text[4..6].trim_start())?;
    let hour = number(&text[7..9])?;
    let minute = number(&text[10..12])?;
    let second = number(&text[13..15])?;

    let naive = NaiveDate::from_ymd_opt(resolve_year(month, Local::now()), month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or(DeserializeError::Malformed("invalid timestamp"))?;

    // a local time skipped by a DST change has no mapping, take it as UTC then
    let timestamp = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive));

    Ok((timestamp, &input[TIMESTAMP_LEN..]))
}

fn number(text: &str) -> Result<u32, DeserializeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeserializeError::Malformed("invalid timestamp"));
    }

    text.parse()
        .map_err(|_| DeserializeError::Malformed("invalid timestamp"))
}

/// Function used to resolve the year for syslog messages that don't include the year.
///
/// If the current month is January, and the syslog message is for December, it will
/// take the previous year. Otherwise, take the current year.
fn resolve_year(month: u32, now: impl Datelike) -> i32 {
    if now.month() == 1 && month == 12 {
        now.year() - 1
    } else {
        now.year()
    }
}

/// Splits `name[pid]: ` or `name: ` off the message body. The whole input is
/// the body if it starts with neither.
fn tag(input: &str) -> (Option<&str>, Option<&str>, &str) {
    let untagged = (None, None, input);

    let token_end = input.find(' ').unwrap_or(input.len());
    let Some(head) = input[..token_end].strip_suffix(':') else {
        return untagged;
    };

    let (name, pid) = match head.strip_suffix(']') {
        Some(head) => match head.split_once('[') {
            Some((name, pid)) if !pid.is_empty() && !pid.contains(['[', ']']) => (name, Some(pid)),
            _ => return untagged,
        },
        None => (head, None),
    };

    if name.is_empty() || name.len() > MAX_TAG_LEN || name.contains(['[', ']', ':']) {
        return untagged;
    }

    (Some(name), pid, input[token_end..].trim_start())
}
