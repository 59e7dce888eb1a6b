//! Event records and the collection exchanged between replicas.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single calendar entry. `month` is 0-based (January is 0).
///
/// Events have no identity: two events are the same event when all four
/// fields are equal. The derived ordering compares `year`, `month`, `day`
/// and then `text`, which is the canonical sort order of a collection.
///
/// `month` and `day` are unsigned, so a stored event with a negative month
/// or day fails to parse and the whole file is reported as invalid rather
/// than partially loaded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Event {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub text: String,
}

impl Event {
    pub fn new(year: i32, month: u32, day: u32, text: impl Into<String>) -> Self {
        Event {
            year,
            month,
            day,
            text: text.into(),
        }
    }

    pub fn is_on(&self, year: i32, month: u32, day: u32) -> bool {
        self.year == year && self.month == month && self.day == day
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {}",
            self.year,
            self.month + 1,
            self.day,
            self.text
        )
    }
}

/// An ordered sequence of events, persisted as one JSON array.
///
/// Order is insertion order, which matters for local editing (deleting the
/// n-th event of a day) but never for sync comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCollection {
    events: Vec<Event>,
}

impl EventCollection {
    pub fn new(events: Vec<Event>) -> Self {
        EventCollection { events }
    }

    /// Parse a JSON array of events.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize in normalized form with two-space indentation.
    pub fn to_json(&self) -> String {
        // Serializing plain structs of strings and integers cannot fail.
        serde_json::to_string_pretty(&self.normalized().events).unwrap_or_else(|_| "[]".into())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The canonical form: sorted by (year, month, day, text).
    pub fn normalized(&self) -> EventCollection {
        let mut events = self.events.clone();
        events.sort();
        EventCollection { events }
    }

    /// Content equality that ignores insertion order.
    pub fn normalized_eq(&self, other: &EventCollection) -> bool {
        self.len() == other.len() && self.normalized() == other.normalized()
    }

    pub fn add(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events on a given date, in insertion order.
    pub fn events_on(&self, year: i32, month: u32, day: u32) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.is_on(year, month, day))
            .collect()
    }

    /// Days of a month that have at least one event.
    pub fn days_with_events(&self, year: i32, month: u32) -> BTreeSet<u32> {
        self.events
            .iter()
            .filter(|e| e.year == year && e.month == month)
            .map(|e| e.day)
            .collect()
    }

    /// Remove the `index`-th event (insertion order) on a date.
    /// Returns the removed event, or `None` if there is no such event.
    pub fn delete_on(&mut self, year: i32, month: u32, day: u32, index: usize) -> Option<Event> {
        let position = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_on(year, month, day))
            .nth(index)
            .map(|(i, _)| i)?;
        Some(self.events.remove(position))
    }
}

impl From<Vec<Event>> for EventCollection {
    fn from(events: Vec<Event>) -> Self {
        EventCollection::new(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> EventCollection {
        EventCollection::new(vec![
            Event::new(2024, 5, 3, "dentist"),
            Event::new(2023, 11, 31, "party"),
            Event::new(2024, 5, 3, "coffee"),
            Event::new(2024, 0, 1, "new year"),
        ])
    }

    #[test]
    fn normalized_sorts_by_date_then_text() {
        let normalized = sample().normalized();
        let texts: Vec<_> = normalized.events().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["party", "new year", "coffee", "dentist"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = sample().normalized();
        assert_eq!(once.normalized(), once);
    }

    #[test]
    fn normalized_eq_ignores_order() {
        let mut reversed: Vec<_> = sample().events().to_vec();
        reversed.reverse();
        let reversed = EventCollection::new(reversed);

        assert!(sample().normalized_eq(&reversed));
        assert!(reversed.normalized_eq(&sample()));
        assert_eq!(sample().to_json(), reversed.to_json());
    }

    #[test]
    fn normalized_eq_respects_duplicates() {
        let a = EventCollection::new(vec![Event::new(2024, 0, 1, "a"), Event::new(2024, 0, 1, "a")]);
        let b = EventCollection::new(vec![Event::new(2024, 0, 1, "a")]);
        assert!(!a.normalized_eq(&b));
    }

    #[test]
    fn to_json_uses_two_space_indent_and_field_order() {
        let collection = EventCollection::new(vec![Event::new(2024, 0, 1, "a")]);
        let expected = "[\n  {\n    \"year\": 2024,\n    \"month\": 0,\n    \"day\": 1,\n    \"text\": \"a\"\n  }\n]";
        assert_eq!(collection.to_json(), expected);
    }

    #[test]
    fn empty_collection_serializes_as_empty_array() {
        assert_eq!(EventCollection::default().to_json(), "[]");
    }

    #[test]
    fn from_json_rejects_malformed_events() {
        assert!(EventCollection::from_json(r#"[{"year": 2024, "month": 0, "day": 1}]"#).is_err());
        assert!(EventCollection::from_json(r#"[{"year": "x", "month": 0, "day": 1, "text": "a"}]"#).is_err());
        assert!(EventCollection::from_json(r#"{"year": 2024}"#).is_err());
    }

    #[test]
    fn delete_on_removes_nth_event_of_day() {
        let mut collection = sample();
        let removed = collection.delete_on(2024, 5, 3, 1);

        assert_eq!(removed, Some(Event::new(2024, 5, 3, "coffee")));
        assert_eq!(collection.events_on(2024, 5, 3).len(), 1);
        assert_eq!(collection.delete_on(2024, 5, 3, 4), None);
    }

    #[test]
    fn days_with_events_collects_unique_days() {
        let days = sample().days_with_events(2024, 5);
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![3]);
    }
}
