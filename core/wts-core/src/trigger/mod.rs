//! Trigger model
//!
//! 작업 실행 시점을 나타내는 트리거 정의와 `TASK_TRIGGER` 코덱.
//!
//! [`TriggerType`] is a tagged union: the kind-specific payload can only take
//! the shape its kind defines. [`Trigger::from_json`] accepts the loosely
//! typed map form (case-insensitive keys, missing payload values default to
//! zero) and validates it into the typed form.

pub mod codec;

use crate::error::{WtsError, WtsResult};
use codec::{pack, unpack};
use serde_json::{Map, Value, json};

/// Day-of-week bits (`rgfDaysOfTheWeek`).
pub mod days {
    pub const SUNDAY: u16 = 0x1;
    pub const MONDAY: u16 = 0x2;
    pub const TUESDAY: u16 = 0x4;
    pub const WEDNESDAY: u16 = 0x8;
    pub const THURSDAY: u16 = 0x10;
    pub const FRIDAY: u16 = 0x20;
    pub const SATURDAY: u16 = 0x40;
}

/// Week-of-month values (`wWhichWeek`).
pub mod weeks {
    pub const FIRST: u16 = 1;
    pub const SECOND: u16 = 2;
    pub const THIRD: u16 = 3;
    pub const FOURTH: u16 = 4;
    pub const LAST: u16 = 5;
}

/// Month bits (`rgfMonths`).
pub mod months {
    pub const JANUARY: u16 = 0x1;
    pub const FEBRUARY: u16 = 0x2;
    pub const MARCH: u16 = 0x4;
    pub const APRIL: u16 = 0x8;
    pub const MAY: u16 = 0x10;
    pub const JUNE: u16 = 0x20;
    pub const JULY: u16 = 0x40;
    pub const AUGUST: u16 = 0x80;
    pub const SEPTEMBER: u16 = 0x100;
    pub const OCTOBER: u16 = 0x200;
    pub const NOVEMBER: u16 = 0x400;
    pub const DECEMBER: u16 = 0x800;
}

/// Trigger behavior flags (`rgFlags`).
pub mod flags {
    pub const HAS_END_DATE: u32 = 0x1;
    pub const KILL_AT_DURATION_END: u32 = 0x2;
    pub const DISABLED: u32 = 0x4;
}

/// 트리거 종류 (`TASK_TRIGGER_TYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TriggerKind {
    Once = 0,
    Daily = 1,
    Weekly = 2,
    MonthlyDate = 3,
    MonthlyDow = 4,
    OnIdle = 5,
    AtSystemStart = 6,
    AtLogon = 7,
}

impl TriggerKind {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// 코드에서 종류 파싱
    pub fn from_code(code: u32) -> WtsResult<Self> {
        Ok(match code {
            0 => TriggerKind::Once,
            1 => TriggerKind::Daily,
            2 => TriggerKind::Weekly,
            3 => TriggerKind::MonthlyDate,
            4 => TriggerKind::MonthlyDow,
            5 => TriggerKind::OnIdle,
            6 => TriggerKind::AtSystemStart,
            7 => TriggerKind::AtLogon,
            other => return Err(WtsError::UnsupportedTriggerKind(other)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Once => "once",
            TriggerKind::Daily => "daily",
            TriggerKind::Weekly => "weekly",
            TriggerKind::MonthlyDate => "monthly_date",
            TriggerKind::MonthlyDow => "monthly_dow",
            TriggerKind::OnIdle => "on_idle",
            TriggerKind::AtSystemStart => "at_system_start",
            TriggerKind::AtLogon => "at_logon",
        }
    }

    /// Whether the kind carries a payload in the `Type` words.
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            TriggerKind::Daily
                | TriggerKind::Weekly
                | TriggerKind::MonthlyDate
                | TriggerKind::MonthlyDow
        )
    }
}

/// 트리거 종류와 종류별 파라미터
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriggerType {
    #[default]
    Once,
    /// Every `days_interval` days.
    Daily { days_interval: u16 },
    /// Every `weeks_interval` weeks on the `days_of_week` bits.
    Weekly { weeks_interval: u16, days_of_week: u16 },
    /// On the `days` bits (bit 0 = day 1) of the `months` bits.
    MonthlyDate { days: u32, months: u16 },
    /// On `days_of_week` of week `week` (see [`weeks`]) of the `months` bits.
    MonthlyDow {
        week: u16,
        days_of_week: u16,
        months: u16,
    },
    OnIdle,
    AtSystemStart,
    AtLogon,
}

impl TriggerType {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerType::Once => TriggerKind::Once,
            TriggerType::Daily { .. } => TriggerKind::Daily,
            TriggerType::Weekly { .. } => TriggerKind::Weekly,
            TriggerType::MonthlyDate { .. } => TriggerKind::MonthlyDate,
            TriggerType::MonthlyDow { .. } => TriggerKind::MonthlyDow,
            TriggerType::OnIdle => TriggerKind::OnIdle,
            TriggerType::AtSystemStart => TriggerKind::AtSystemStart,
            TriggerType::AtLogon => TriggerKind::AtLogon,
        }
    }

    /// The payload with every value zero.
    pub fn zeroed(kind: TriggerKind) -> Self {
        Self::from_words(kind, 0, 0)
    }

    /// Packs the payload into the two `Type` words.
    pub fn to_words(&self) -> (u32, u32) {
        match *self {
            TriggerType::Daily { days_interval } => (pack(days_interval, 0), 0),
            TriggerType::Weekly {
                weeks_interval,
                days_of_week,
            } => (pack(weeks_interval, days_of_week), 0),
            TriggerType::MonthlyDate { days, months } => (days, pack(months, 0)),
            TriggerType::MonthlyDow {
                week,
                days_of_week,
                months,
            } => (pack(week, days_of_week), pack(months, 0)),
            TriggerType::Once
            | TriggerType::OnIdle
            | TriggerType::AtSystemStart
            | TriggerType::AtLogon => (0, 0),
        }
    }

    /// Unpacks the two `Type` words according to `kind`.
    pub fn from_words(kind: TriggerKind, word1: u32, word2: u32) -> Self {
        match kind {
            TriggerKind::Once => TriggerType::Once,
            TriggerKind::Daily => TriggerType::Daily {
                days_interval: unpack(word1).0,
            },
            TriggerKind::Weekly => {
                let (weeks_interval, days_of_week) = unpack(word1);
                TriggerType::Weekly {
                    weeks_interval,
                    days_of_week,
                }
            }
            TriggerKind::MonthlyDate => TriggerType::MonthlyDate {
                days: word1,
                months: unpack(word2).0,
            },
            TriggerKind::MonthlyDow => {
                let (week, days_of_week) = unpack(word1);
                TriggerType::MonthlyDow {
                    week,
                    days_of_week,
                    months: unpack(word2).0,
                }
            }
            TriggerKind::OnIdle => TriggerType::OnIdle,
            TriggerKind::AtSystemStart => TriggerType::AtSystemStart,
            TriggerKind::AtLogon => TriggerType::AtLogon,
        }
    }
}

/// A rule describing when a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Trigger {
    pub start_year: u16,
    pub start_month: u16,
    pub start_day: u16,
    pub end_year: u16,
    pub end_month: u16,
    pub end_day: u16,
    pub start_hour: u16,
    pub start_minute: u16,
    /// Minutes the trigger stays active after each start.
    pub minutes_duration: u32,
    /// Minutes between repetitions inside `minutes_duration`.
    pub minutes_interval: u32,
    /// See [`flags`].
    pub flags: u32,
    pub trigger_type: TriggerType,
    /// Upper bound of the random start delay.
    pub random_minutes_interval: u16,
}

const TRIGGER_KEYS: &[&str] = &[
    "end_day",
    "end_month",
    "end_year",
    "flags",
    "minutes_duration",
    "minutes_interval",
    "random_minutes_interval",
    "start_day",
    "start_hour",
    "start_minute",
    "start_month",
    "start_year",
    "trigger_type",
    "type",
];

const TYPE_KEYS: &[&str] = &[
    "days_interval",
    "weeks_interval",
    "days_of_week",
    "months",
    "days",
    "weeks",
];

impl Trigger {
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            ..Self::default()
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.trigger_type.kind()
    }

    pub fn with_start_date(mut self, year: u16, month: u16, day: u16) -> Self {
        self.start_year = year;
        self.start_month = month;
        self.start_day = day;
        self
    }

    /// Sets the end date. Callers usually also set [`flags::HAS_END_DATE`].
    pub fn with_end_date(mut self, year: u16, month: u16, day: u16) -> Self {
        self.end_year = year;
        self.end_month = month;
        self.end_day = day;
        self
    }

    pub fn with_start_time(mut self, hour: u16, minute: u16) -> Self {
        self.start_hour = hour;
        self.start_minute = minute;
        self
    }

    pub fn with_repetition(mut self, minutes_duration: u32, minutes_interval: u32) -> Self {
        self.minutes_duration = minutes_duration;
        self.minutes_interval = minutes_interval;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_random_delay(mut self, minutes: u16) -> Self {
        self.random_minutes_interval = minutes;
        self
    }

    /// Builds a trigger from its map form.
    ///
    /// Keys are matched case-insensitively. `trigger_type` holds the numeric
    /// kind code; the optional `type` map holds the payload
    /// (`days_interval`, `weeks_interval`, `days_of_week`, `months`, `days`,
    /// `weeks`). Absent values default to zero.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use wts_core::trigger::{Trigger, TriggerType};
    ///
    /// let trigger = Trigger::from_json(&json!({
    ///     "Trigger_Type": 1,
    ///     "start_hour": 4,
    ///     "type": { "DAYS_INTERVAL": 2 },
    /// }))
    /// .unwrap();
    /// assert_eq!(trigger.trigger_type, TriggerType::Daily { days_interval: 2 });
    /// assert_eq!(trigger.start_hour, 4);
    /// ```
    pub fn from_json(value: &Value) -> WtsResult<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| WtsError::InvalidArgument("trigger must be a map".to_string()))?;
        let map = normalize_keys(map, TRIGGER_KEYS, "key")?;

        let payload = match map.get("type") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(inner)) => normalize_keys(inner, TYPE_KEYS, "type key")?,
            Some(_) => {
                return Err(WtsError::InvalidArgument(
                    "trigger 'type' must be a map".to_string(),
                ));
            }
        };

        let code = match map.get("trigger_type") {
            Some(value) => number::<u32>(value, "trigger_type")?,
            None => {
                return Err(WtsError::InvalidArgument(
                    "trigger_type is required".to_string(),
                ));
            }
        };
        let kind = TriggerKind::from_code(code)?;

        let sub = |key: &str| -> WtsResult<u16> { field(&payload, key) };
        let trigger_type = match kind {
            TriggerKind::Daily => TriggerType::Daily {
                days_interval: sub("days_interval")?,
            },
            TriggerKind::Weekly => TriggerType::Weekly {
                weeks_interval: sub("weeks_interval")?,
                days_of_week: sub("days_of_week")?,
            },
            TriggerKind::MonthlyDate => TriggerType::MonthlyDate {
                days: field(&payload, "days")?,
                months: sub("months")?,
            },
            TriggerKind::MonthlyDow => TriggerType::MonthlyDow {
                week: sub("weeks")?,
                days_of_week: sub("days_of_week")?,
                months: sub("months")?,
            },
            other => TriggerType::zeroed(other),
        };

        Ok(Self {
            start_year: field(&map, "start_year")?,
            start_month: field(&map, "start_month")?,
            start_day: field(&map, "start_day")?,
            end_year: field(&map, "end_year")?,
            end_month: field(&map, "end_month")?,
            end_day: field(&map, "end_day")?,
            start_hour: field(&map, "start_hour")?,
            start_minute: field(&map, "start_minute")?,
            minutes_duration: field(&map, "minutes_duration")?,
            minutes_interval: field(&map, "minutes_interval")?,
            flags: field(&map, "flags")?,
            trigger_type,
            random_minutes_interval: field(&map, "random_minutes_interval")?,
        })
    }

    /// Map form with lowercase keys, the inverse of [`Trigger::from_json`].
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "start_year": self.start_year,
            "start_month": self.start_month,
            "start_day": self.start_day,
            "end_year": self.end_year,
            "end_month": self.end_month,
            "end_day": self.end_day,
            "start_hour": self.start_hour,
            "start_minute": self.start_minute,
            "minutes_duration": self.minutes_duration,
            "minutes_interval": self.minutes_interval,
            "flags": self.flags,
            "trigger_type": self.kind().code(),
            "random_minutes_interval": self.random_minutes_interval,
        });

        let payload = match self.trigger_type {
            TriggerType::Daily { days_interval } => Some(json!({ "days_interval": days_interval })),
            TriggerType::Weekly {
                weeks_interval,
                days_of_week,
            } => Some(json!({ "weeks_interval": weeks_interval, "days_of_week": days_of_week })),
            TriggerType::MonthlyDate { days, months } => {
                Some(json!({ "days": days, "months": months }))
            }
            TriggerType::MonthlyDow {
                week,
                days_of_week,
                months,
            } => Some(json!({ "weeks": week, "days_of_week": days_of_week, "months": months })),
            _ => None,
        };
        if let (Some(payload), Some(map)) = (payload, value.as_object_mut()) {
            map.insert("type".to_string(), payload);
        }
        value
    }
}

/// Lowercases keys and rejects anything outside `allowed`.
fn normalize_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    what: &str,
) -> WtsResult<Map<String, Value>> {
    let mut normalized = Map::new();
    for (key, value) in map {
        let key = key.to_lowercase();
        if !allowed.contains(&key.as_str()) {
            return Err(WtsError::InvalidArgument(format!("invalid {what} '{key}'")));
        }
        normalized.insert(key, value.clone());
    }
    Ok(normalized)
}

fn number<T: TryFrom<u64>>(value: &Value, key: &str) -> WtsResult<T> {
    value
        .as_u64()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| {
            WtsError::InvalidArgument(format!("'{key}' must be an unsigned integer in range"))
        })
}

/// Missing or null values read as zero.
fn field<T: TryFrom<u64> + Default>(map: &Map<String, Value>, key: &str) -> WtsResult<T> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => number(value, key),
    }
}
