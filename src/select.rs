// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Actor / category filter applied on top of a range read.

use std::collections::HashSet;

use crate::event::Event;

/// An empty set matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Select {
    pub actors: HashSet<String>,
    pub categories: HashSet<String>,
}

impl Select {
    pub fn new<A, C>(actors: A, categories: C) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            actors: actors.into_iter().map(Into::into).collect(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds from comma-separated lists, ignoring empty items.
    pub fn parse(actors: Option<&str>, categories: Option<&str>) -> Self {
        fn split(list: Option<&str>) -> HashSet<String> {
            list.into_iter()
                .flat_map(|s| s.split(','))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
        Self {
            actors: split(actors),
            categories: split(categories),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty() && self.categories.is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.actors.is_empty() || self.actors.contains(&event.actor))
            && (self.categories.is_empty() || self.categories.contains(&event.category))
    }

    pub fn filter(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}
