// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event: the unit of storage.
//!
//! An event is a timestamped observation about an actor (who) of some
//! category (what), carrying either a quantity with a unit or a duration.
//!
//! # Identity vs. Ordering
//! - `id` is the identity: exact lookup and delete use it, nothing else.
//! - `(start, actor, category)` is the ordering key: the index is sorted by it.
//! - When no `id` is supplied one is derived from the ordering key, so
//!   re-submitting the same observation is an upsert rather than a duplicate.
//!
//! # Wire Format
//! ```text
//! {"id":"1722531600Formulababy","who":"baby","type":"Formula","when":1722531600,"value":120,"unit":"ml"}
//! ```
//! Every field except `id` is omitted when zero-valued. `duration` is a
//! nanosecond count.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Elapsed times below this render as hours and minutes, above it as days.
const RECENT_WINDOW_MINUTES: i64 = 5 * 60;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: String,

    #[serde(rename = "who", skip_serializing_if = "String::is_empty")]
    pub actor: String,

    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub category: String,

    /// Unix seconds.
    #[serde(rename = "when", skip_serializing_if = "is_zero")]
    pub start: i64,

    #[serde(rename = "value", skip_serializing_if = "is_zero")]
    pub quantity: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,

    /// Overrides quantity/unit for display only.
    #[serde(with = "duration_nanos", skip_serializing_if = "Duration::is_zero")]
    pub duration: Duration,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Event {
    /// An event at `start` with every other field empty.
    pub fn at(start: i64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_quantity(mut self, quantity: i64, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// The id this event would get if none were supplied:
    /// `decimal(start) + category + actor`.
    pub fn derived_id(&self) -> String {
        format!("{}{}{}", self.start, self.category, self.actor)
    }

    /// The supplied id, or the derived one when empty.
    pub fn effective_id(&self) -> String {
        if self.id.is_empty() {
            self.derived_id()
        } else {
            self.id.clone()
        }
    }

    /// Fills in a derived id if none is set.
    pub fn identified(mut self) -> Self {
        if self.id.is_empty() {
            self.id = self.derived_id();
        }
        self
    }

    /// Compares by `(start, actor, category)`. Never looks at `id`.
    pub fn order(&self, other: &Event) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.actor.cmp(&other.actor))
            .then_with(|| self.category.cmp(&other.category))
    }

    /// Value and unit for presentation. A non-zero duration wins and is
    /// reported in whole minutes.
    pub fn measurement(&self) -> (i64, &str) {
        if !self.duration.is_zero() {
            let minutes = i64::try_from(self.duration.as_secs() / 60).unwrap_or(i64::MAX);
            return (minutes, "minutes");
        }
        (self.quantity, &self.unit)
    }

    /// Start time in the local timezone, if representable.
    pub fn local_start(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.start, 0).single()
    }

    /// Renders relative to `now`, e.g. `"1h0m ago\tFormula\t2\tml"`.
    pub fn display_since(&self, now: DateTime<Local>) -> String {
        let (value, unit) = self.measurement();
        let elapsed_minutes = now.timestamp().saturating_sub(self.start) / 60;
        format!(
            "{}\t{}\t{}\t{}",
            format_elapsed(elapsed_minutes),
            self.category,
            value,
            unit
        )
    }
}

fn format_elapsed(minutes: i64) -> String {
    if minutes < 0 {
        let ahead = minutes.unsigned_abs();
        return format!("in {}h{}m", ahead / 60, ahead % 60);
    }
    if minutes < RECENT_WINDOW_MINUTES {
        format!("{}h{}m ago", minutes / 60, minutes % 60)
    } else {
        format!("{}d ago", minutes / 60 / 24)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = self.measurement();
        match self.local_start() {
            Some(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S"))?,
            None => write!(f, "{}", self.start)?,
        }
        write!(f, "\t{}\t{}\t{}\t{}", self.actor, self.category, value, unit)
    }
}

/// `Duration` as a signed nanosecond count.
mod duration_nanos {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::error::StoreError;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let nanos = i64::deserialize(d)?;
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| D::Error::custom(StoreError::NegativeDuration(nanos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_id() {
        assert_eq!(Event::at(0).derived_id(), "0");
        assert_eq!(Event::at(0).with_category("a").derived_id(), "0a");
        assert_eq!(
            Event::at(12).with_category("Sleep").with_actor("kid").derived_id(),
            "12Sleepkid"
        );
        assert_eq!(Event::at(1).with_id("x").identified().id, "x");
        assert_eq!(Event::at(1).identified().id, "1");
    }

    #[test]
    fn test_order_ignores_id() {
        let a = Event::at(1).with_id("z");
        let b = Event::at(1).with_id("a");
        assert_eq!(a.order(&b), Ordering::Equal);

        let early = Event::at(1).with_category("z");
        let late = Event::at(2);
        assert_eq!(early.order(&late), Ordering::Less);

        let by_actor = Event::at(1).with_actor("a").with_category("z");
        let by_actor_late = Event::at(1).with_actor("b");
        assert_eq!(by_actor.order(&by_actor_late), Ordering::Less);
    }

    #[test]
    fn test_json_omits_zero_fields() {
        let e = Event::at(0).with_id("a").with_category("a");
        assert_eq!(serde_json::to_string(&e).unwrap(), r#"{"id":"a","type":"a"}"#);

        let full = Event::at(5)
            .with_id("5Sleepkid")
            .with_actor("kid")
            .with_category("Sleep")
            .with_quantity(2, "h")
            .with_duration(Duration::from_secs(60));
        assert_eq!(
            serde_json::to_string(&full).unwrap(),
            r#"{"id":"5Sleepkid","who":"kid","type":"Sleep","when":5,"value":2,"unit":"h","duration":60000000000}"#
        );
    }

    #[test]
    fn test_json_decode_defaults() {
        let e: Event = serde_json::from_str(r#"{"when":3,"type":"Formula"}"#).unwrap();
        assert_eq!(e, Event::at(3).with_category("Formula"));

        let negative = serde_json::from_str::<Event>(r#"{"duration":-5}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_measurement_prefers_duration() {
        let plain = Event::at(0).with_quantity(2, "ml");
        assert_eq!(plain.measurement(), (2, "ml"));

        let timed = Event::at(0)
            .with_quantity(2, "nope")
            .with_duration(Duration::from_secs(3600));
        assert_eq!(timed.measurement(), (60, "minutes"));
    }

    #[test]
    fn test_display_since() {
        let now = Local.with_ymd_and_hms(2024, 8, 1, 18, 0, 0).unwrap();

        let recent = Event::at(Local.with_ymd_and_hms(2024, 8, 1, 17, 0, 0).unwrap().timestamp())
            .with_category("Formula")
            .with_quantity(2, "ml");
        assert_eq!(recent.display_since(now), "1h0m ago\tFormula\t2\tml");

        let old = Event::at(Local.with_ymd_and_hms(2024, 7, 28, 18, 0, 0).unwrap().timestamp())
            .with_category("Sleep")
            .with_quantity(2, "nope")
            .with_duration(Duration::from_secs(3600));
        assert_eq!(old.display_since(now), "4d ago\tSleep\t60\tminutes");

        let ahead = Event::at(now.timestamp() + 90 * 60).with_category("Bath");
        assert_eq!(ahead.display_since(now), "in 1h30m\tBath\t0\t");
    }

    #[test]
    fn test_display_since_extreme_starts() {
        let now = Local.with_ymd_and_hms(2024, 8, 1, 18, 0, 0).unwrap();

        let past = Event::at(i64::MIN).display_since(now);
        assert!(past.ends_with("d ago\t\t0\t"), "{}", past);

        let future = Event::at(i64::MAX).display_since(now);
        assert!(future.starts_with("in "), "{}", future);

        // Display falls back to the raw timestamp.
        assert!(Event::at(i64::MIN).to_string().starts_with(&i64::MIN.to_string()));
    }

    #[test]
    fn test_display() {
        let at = Local.with_ymd_and_hms(2024, 8, 1, 17, 0, 0).unwrap();
        let e = Event::at(at.timestamp())
            .with_actor("kid")
            .with_category("Formula")
            .with_quantity(120, "ml");
        assert_eq!(e.to_string(), "2024-08-01 17:00:00\tkid\tFormula\t120\tml");
    }
}
