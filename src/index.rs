// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Ordered Event Index
//!
//! A flat vector kept sorted by `(start, actor, category)`.
//! - Insert / replace: binary search, O(log n) + shift
//! - Delete by id: linear scan (id is not the sort key)
//! - Range query: two binary searches, returns a borrowed slice
//!
//! Two events with equal ordering keys cannot coexist: the later insert
//! overwrites the earlier one in place, whatever their ids.

use std::io::{BufRead, Write};

use crate::error::{Result, StoreError};
use crate::event::Event;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventIndex {
    events: Vec<Event>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a batch, sorting once unless already ordered.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        let sorted = events.windows(2).all(|w| w[0].order(&w[1]).is_le());
        if !sorted {
            events.sort_by(Event::order);
        }
        Self { events }
    }

    /// Places `event` at its sorted position, overwriting any event with an
    /// equal ordering key.
    pub fn insert(&mut self, event: Event) {
        match self.events.binary_search_by(|probe| probe.order(&event)) {
            Ok(idx) => self.events[idx] = event,
            Err(idx) => self.events.insert(idx, event),
        }
    }

    /// Insert-or-replace by id. Events without an id get a derived one.
    pub fn upsert(&mut self, event: Event) {
        if event.id.is_empty() {
            self.insert(event.identified());
        } else {
            self.delete(&event.id);
            self.insert(event);
        }
    }

    /// Removes the event with `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.events.iter().position(|e| e.id == id) {
            Some(idx) => {
                self.events.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Events whose start lies in `[from, to]`. Bounds are swapped if inverted.
    pub fn query(&self, from: i64, to: i64) -> &[Event] {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        let lower = Event::at(from);
        let start = self
            .events
            .partition_point(|e| e.order(&lower).is_lt());
        let end = self.events.partition_point(|e| e.start <= to);
        &self.events[start..end.max(start)]
    }

    pub fn list(&self) -> &[Event] {
        &self.events
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Writes one JSON object per line, in index order.
    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<()> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, event).map_err(StoreError::Encode)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads events in any order and sorts once at the end.
    pub fn deserialize<R: BufRead>(reader: R) -> Result<Self> {
        let mut events = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line)
                .map_err(|source| StoreError::Decode { line: n + 1, source })?;
            events.push(event);
        }
        Ok(Self::from_events(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts(events: &[Event]) -> Vec<i64> {
        events.iter().map(|e| e.start).collect()
    }

    #[test]
    fn test_insert_positions() {
        let mut index = EventIndex::new();
        index.insert(Event::at(1));
        assert_eq!(starts(index.list()), vec![1]);

        let mut index = EventIndex::from_events(vec![Event::at(0), Event::at(2)]);
        index.insert(Event::at(1));
        assert_eq!(starts(index.list()), vec![0, 1, 2]);

        let mut index = EventIndex::from_events(vec![Event::at(1), Event::at(2)]);
        index.insert(Event::at(0));
        assert_eq!(starts(index.list()), vec![0, 1, 2]);

        let mut index = EventIndex::from_events(vec![Event::at(0), Event::at(1)]);
        index.insert(Event::at(2));
        assert_eq!(starts(index.list()), vec![0, 1, 2]);
    }

    #[test]
    fn test_insert_replaces_equal_key() {
        let mut index =
            EventIndex::from_events(vec![Event::at(0), Event::at(1), Event::at(2)]);
        index.insert(Event::at(2).with_quantity(0, "h"));
        assert_eq!(
            index.list(),
            &[Event::at(0), Event::at(1), Event::at(2).with_quantity(0, "h")]
        );

        // Distinct ids, same ordering key: last write wins.
        index.insert(Event::at(1).with_id("first"));
        index.insert(Event::at(1).with_id("second"));
        assert_eq!(index.len(), 3);
        assert_eq!(index.list()[1].id, "second");
    }

    #[test]
    fn test_from_events_sorts_unordered_batch() {
        let index = EventIndex::from_events(vec![
            Event::at(3),
            Event::at(1).with_category("b"),
            Event::at(1).with_category("a"),
        ]);
        assert_eq!(
            index.list(),
            &[
                Event::at(1).with_category("a"),
                Event::at(1).with_category("b"),
                Event::at(3),
            ]
        );
    }

    #[test]
    fn test_query_empty_index() {
        let index = EventIndex::new();
        assert!(index.query(0, 10).is_empty());
        assert!(index.last().is_none());
    }

    #[test]
    fn test_serialize_roundtrip_through_unsorted_input() {
        let input = "{\"id\":\"2\",\"when\":2}\n\n{\"id\":\"1\",\"when\":1}\n";
        let index = EventIndex::deserialize(input.as_bytes()).unwrap();
        assert_eq!(starts(index.list()), vec![1, 2]);

        let mut buf = Vec::new();
        index.serialize(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"id\":\"1\",\"when\":1}\n{\"id\":\"2\",\"when\":2}\n"
        );
    }

    #[test]
    fn test_deserialize_reports_line() {
        let input = "{\"id\":\"1\",\"when\":1}\nnot json\n";
        match EventIndex::deserialize(input.as_bytes()) {
            Err(StoreError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected decode error, got {:?}", other),
        }
    }
}
