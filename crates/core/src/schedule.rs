//! Structured opening hours.
//!
//! A [`Schedule`] is a list of [`ScheduleRule`]s, each covering a set of
//! weekdays and one time range. The back-office edits it through a compact
//! text form that is parsed and validated once, when the manager saves it:
//!
//! ```text
//! seg-sex 18:00-23:30; sab,dom 11:00-15:00, 18:00-00:30
//! ```
//!
//! A range whose closing time is not after its opening time runs past
//! midnight into the following day (`18:00-02:00`). Equal times mean the
//! shop stays open for 24 hours starting at that time. An empty schedule is
//! always closed.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced while parsing the text form of a schedule.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A rule has days but no time range.
    #[error("regra sem horário: '{0}'")]
    MissingTimes(String),
    /// A day token is not recognised.
    #[error("dia desconhecido: '{0}'")]
    UnknownDay(String),
    /// A time token is not `HH:MM` or `HHh`/`HHhMM`.
    #[error("horário inválido: '{0}'")]
    InvalidTime(String),
    /// A time range is not `inicio-fim`.
    #[error("intervalo inválido: '{0}'")]
    InvalidRange(String),
}

const DAY_NAMES: [&str; 7] = ["seg", "ter", "qua", "qui", "sex", "sab", "dom"];

/// A set of weekdays stored as a bitmask, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// No days.
    pub const EMPTY: Self = Self(0);
    /// Every day of the week.
    pub const ALL: Self = Self(0b111_1111);

    /// Build a set from individual weekdays.
    #[must_use]
    pub fn from_days(days: &[Weekday]) -> Self {
        let mut set = Self::EMPTY;
        for day in days {
            set.insert(*day);
        }
        set
    }

    /// Add a weekday.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    /// Whether the set contains `day`.
    #[must_use]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained days, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (0..7u8)
            .filter(|i| self.0 & (1 << i) != 0)
            .map(weekday_from_index)
    }

    /// Format as day tokens, collapsing runs into ranges: `seg-sex,dom`.
    #[must_use]
    pub fn to_text(&self) -> String {
        if *self == Self::ALL {
            return "todos".to_string();
        }

        let mut parts = Vec::new();
        let mut i = 0u8;
        while i < 7 {
            if self.0 & (1 << i) == 0 {
                i += 1;
                continue;
            }
            let start = i;
            while i + 1 < 7 && self.0 & (1 << (i + 1)) != 0 {
                i += 1;
            }
            let start_name = day_name(start);
            if i - start >= 2 {
                parts.push(format!("{start_name}-{}", day_name(i)));
            } else if i > start {
                parts.push(format!("{start_name},{}", day_name(i)));
            } else {
                parts.push(start_name.to_string());
            }
            i += 1;
        }
        parts.join(",")
    }
}

fn weekday_from_index(i: u8) -> Weekday {
    match i {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

fn day_name(i: u8) -> &'static str {
    DAY_NAMES.get(usize::from(i)).copied().unwrap_or("dom")
}

fn parse_day(token: &str) -> Result<Weekday, ScheduleError> {
    let lower = token.trim().to_lowercase();
    let day = match lower.as_str() {
        "seg" | "segunda" => Weekday::Mon,
        "ter" | "terca" | "terça" => Weekday::Tue,
        "qua" | "quarta" => Weekday::Wed,
        "qui" | "quinta" => Weekday::Thu,
        "sex" | "sexta" => Weekday::Fri,
        "sab" | "sáb" | "sabado" | "sábado" => Weekday::Sat,
        "dom" | "domingo" => Weekday::Sun,
        _ => return Err(ScheduleError::UnknownDay(token.trim().to_string())),
    };
    Ok(day)
}

fn parse_days(spec: &str) -> Result<WeekdaySet, ScheduleError> {
    let lower = spec.trim().to_lowercase();
    if matches!(lower.as_str(), "todos" | "diariamente" | "todo-dia") {
        return Ok(WeekdaySet::ALL);
    }

    let mut set = WeekdaySet::EMPTY;
    for item in lower.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some((from, to)) = item.split_once('-') {
            let mut day = parse_day(from)?;
            let end = parse_day(to)?;
            // Ranges may wrap around the week, e.g. sex-seg.
            loop {
                set.insert(day);
                if day == end {
                    break;
                }
                day = day.succ();
            }
        } else {
            set.insert(parse_day(item)?);
        }
    }

    if set.is_empty() {
        return Err(ScheduleError::UnknownDay(spec.trim().to_string()));
    }
    Ok(set)
}

fn parse_time(token: &str) -> Result<NaiveTime, ScheduleError> {
    let t = token.trim().to_lowercase();
    let invalid = || ScheduleError::InvalidTime(token.trim().to_string());

    let (hours, minutes) = if let Some((h, m)) = t.split_once(':') {
        (h, m)
    } else if let Some((h, m)) = t.split_once('h') {
        (h, if m.is_empty() { "0" } else { m })
    } else {
        (t.as_str(), "0")
    };

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    // "24:00" closes at midnight.
    if hours == 24 && minutes == 0 {
        return Ok(NaiveTime::MIN);
    }
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// One block of opening hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRule {
    /// Days on which the range starts.
    pub dias: WeekdaySet,
    /// Opening time.
    #[serde(with = "hhmm")]
    pub abre: NaiveTime,
    /// Closing time; at or before `abre` means the range crosses midnight.
    #[serde(with = "hhmm")]
    pub fecha: NaiveTime,
}

impl ScheduleRule {
    /// Whether the range runs into the next day.
    #[must_use]
    pub fn spans_midnight(&self) -> bool {
        self.fecha <= self.abre
    }

    /// Whether the rule covers `time` on `day`.
    #[must_use]
    pub fn covers(&self, day: Weekday, time: NaiveTime) -> bool {
        if self.spans_midnight() {
            (self.dias.contains(day) && time >= self.abre)
                || (self.dias.contains(day.pred()) && time < self.fecha)
        } else {
            self.dias.contains(day) && time >= self.abre && time < self.fecha
        }
    }
}

/// Weekly opening hours for a company.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    rules: Vec<ScheduleRule>,
}

impl Schedule {
    /// Create a schedule from validated rules.
    #[must_use]
    pub const fn new(rules: Vec<ScheduleRule>) -> Self {
        Self { rules }
    }

    /// The configured rules.
    #[must_use]
    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// Whether no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether the shop is open at a local date and time.
    #[must_use]
    pub fn is_open_at(&self, local: NaiveDateTime) -> bool {
        let day = local.weekday();
        let time = local.time().with_nanosecond(0).unwrap_or_else(|| local.time());
        self.rules.iter().any(|rule| rule.covers(day, time))
    }

    /// Whether the shop is open at `now`, evaluated in the shop's UTC offset.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        self.is_open_at(now.with_timezone(&offset).naive_local())
    }

    /// Text form suitable for the settings form.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.rules
            .iter()
            .map(|rule| {
                format!(
                    "{} {}-{}",
                    rule.dias.to_text(),
                    rule.abre.format("%H:%M"),
                    rule.fecha.format("%H:%M")
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    /// Parse the text form. Rules are separated by `;` or newlines; each rule
    /// is a day list followed by one or more comma-separated time ranges.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rules = Vec::new();

        for raw in s.split([';', '\n']).map(str::trim).filter(|r| !r.is_empty()) {
            let (days, times) = raw
                .split_once(char::is_whitespace)
                .ok_or_else(|| ScheduleError::MissingTimes(raw.to_string()))?;
            let dias = parse_days(days)?;

            let mut any = false;
            for range in times.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let (abre, fecha) = range
                    .split_once('-')
                    .ok_or_else(|| ScheduleError::InvalidRange(range.to_string()))?;
                rules.push(ScheduleRule {
                    dias,
                    abre: parse_time(abre)?,
                    fecha: parse_time(fecha)?,
                });
                any = true;
            }

            if !any {
                return Err(ScheduleError::MissingTimes(raw.to_string()));
            }
        }

        Ok(Self { rules })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rules.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rules = Option::<Vec<ScheduleRule>>::deserialize(deserializer)?;
        Ok(Self {
            rules: rules.unwrap_or_default(),
        })
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names: Vec<&str> = self
            .iter()
            .map(|d| day_name(u8::try_from(d.num_days_from_monday()).unwrap_or(6)))
            .collect();
        names.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut set = Self::EMPTY;
        for name in names {
            set.insert(parse_day(&name).map_err(serde::de::Error::custom)?);
        }
        Ok(set)
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Database times may carry seconds ("8:00:00"); only hours and minutes count.
        let hhmm = match s.splitn(3, ':').collect::<Vec<_>>().as_slice() {
            [hours, minutes, ..] => format!("{hours}:{minutes}"),
            _ => s.clone(),
        };
        super::parse_time(&hhmm).map_err(serde::de::Error::custom)
    }
}
