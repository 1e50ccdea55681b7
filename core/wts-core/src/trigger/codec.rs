//! `TASK_TRIGGER` wire codec.
//!
//! The service reads and writes triggers as a fixed 48-byte little-endian
//! structure:
//!
//! ```text
//! off  size  field
//!   0     2  cbTriggerSize (always 48)
//!   2     2  Reserved1
//!   4     6  wBeginYear, wBeginMonth, wBeginDay
//!  10     6  wEndYear, wEndMonth, wEndDay
//!  16     4  wStartHour, wStartMinute
//!  20     4  MinutesDuration
//!  24     4  MinutesInterval
//!  28     4  rgFlags
//!  32     4  TriggerType
//!  36     8  Type (two packed words, see TriggerType::to_words)
//!  44     2  Reserved2
//!  46     2  wRandomMinutesInterval
//! ```

use super::{Trigger, TriggerKind, TriggerType};
use crate::error::WtsResult;

/// Size of the native trigger structure.
pub const TRIGGER_SIZE: usize = 48;

pub type TriggerBuffer = [u8; TRIGGER_SIZE];

const OFF_SIZE: usize = 0;
const OFF_START_YEAR: usize = 4;
const OFF_START_MONTH: usize = 6;
const OFF_START_DAY: usize = 8;
const OFF_END_YEAR: usize = 10;
const OFF_END_MONTH: usize = 12;
const OFF_END_DAY: usize = 14;
const OFF_START_HOUR: usize = 16;
const OFF_START_MINUTE: usize = 18;
const OFF_DURATION: usize = 20;
const OFF_INTERVAL: usize = 24;
const OFF_FLAGS: usize = 28;
const OFF_KIND: usize = 32;
const OFF_WORD1: usize = 36;
const OFF_WORD2: usize = 40;
const OFF_RANDOM: usize = 46;

/// Packs two 16-bit values into one word, low half first.
pub const fn pack(low: u16, high: u16) -> u32 {
    low as u32 | (high as u32) << 16
}

/// Inverse of [`pack`].
pub const fn unpack(word: u32) -> (u16, u16) {
    (word as u16, (word >> 16) as u16)
}

fn put_u16(buf: &mut TriggerBuffer, offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut TriggerBuffer, offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_u16(buf: &TriggerBuffer, offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn get_u32(buf: &TriggerBuffer, offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

/// Buffer handed to `ITaskTrigger::GetTrigger`: zeroed, with the size field set.
pub fn request_buffer() -> TriggerBuffer {
    let mut buf = [0u8; TRIGGER_SIZE];
    put_u16(&mut buf, OFF_SIZE, TRIGGER_SIZE as u16);
    buf
}

/// Encodes `trigger` into its native representation.
pub fn encode(trigger: &Trigger) -> TriggerBuffer {
    let (word1, word2) = trigger.trigger_type.to_words();
    let mut buf = request_buffer();

    put_u16(&mut buf, OFF_START_YEAR, trigger.start_year);
    put_u16(&mut buf, OFF_START_MONTH, trigger.start_month);
    put_u16(&mut buf, OFF_START_DAY, trigger.start_day);
    put_u16(&mut buf, OFF_END_YEAR, trigger.end_year);
    put_u16(&mut buf, OFF_END_MONTH, trigger.end_month);
    put_u16(&mut buf, OFF_END_DAY, trigger.end_day);
    put_u16(&mut buf, OFF_START_HOUR, trigger.start_hour);
    put_u16(&mut buf, OFF_START_MINUTE, trigger.start_minute);
    put_u32(&mut buf, OFF_DURATION, trigger.minutes_duration);
    put_u32(&mut buf, OFF_INTERVAL, trigger.minutes_interval);
    put_u32(&mut buf, OFF_FLAGS, trigger.flags);
    put_u32(&mut buf, OFF_KIND, trigger.trigger_type.kind().code());
    put_u32(&mut buf, OFF_WORD1, word1);
    put_u32(&mut buf, OFF_WORD2, word2);
    put_u16(&mut buf, OFF_RANDOM, trigger.random_minutes_interval);
    buf
}

/// Decodes a native trigger structure.
///
/// Fails with `UnsupportedTriggerKind` when the kind code is unknown.
pub fn decode(buf: &TriggerBuffer) -> WtsResult<Trigger> {
    let kind = TriggerKind::from_code(get_u32(buf, OFF_KIND))?;
    let trigger_type =
        TriggerType::from_words(kind, get_u32(buf, OFF_WORD1), get_u32(buf, OFF_WORD2));

    Ok(Trigger {
        start_year: get_u16(buf, OFF_START_YEAR),
        start_month: get_u16(buf, OFF_START_MONTH),
        start_day: get_u16(buf, OFF_START_DAY),
        end_year: get_u16(buf, OFF_END_YEAR),
        end_month: get_u16(buf, OFF_END_MONTH),
        end_day: get_u16(buf, OFF_END_DAY),
        start_hour: get_u16(buf, OFF_START_HOUR),
        start_minute: get_u16(buf, OFF_START_MINUTE),
        minutes_duration: get_u32(buf, OFF_DURATION),
        minutes_interval: get_u32(buf, OFF_INTERVAL),
        flags: get_u32(buf, OFF_FLAGS),
        trigger_type,
        random_minutes_interval: get_u16(buf, OFF_RANDOM),
    })
}
