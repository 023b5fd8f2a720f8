// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::SortDirection;

/// A comparable projection of one record field. Text compares
/// case-insensitively; integers cover counts, cents, and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Integer(i64),
    Text(String),
}

impl SortValue {
    fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left
                .to_ascii_lowercase()
                .cmp(&right.to_ascii_lowercase()),
            // Mixed kinds are not ordered against each other.
            _ => Ordering::Equal,
        }
    }
}

/// Copy-then-sort over one field. Pairs where either side has no value
/// compare equal, so their relative order is retained and nothing panics.
pub fn sort_items<T, F>(items: &[T], key: F, direction: SortDirection) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> Option<SortValue>,
{
    let mut sorted = items.to_vec();
    sorted.sort_by(|left, right| {
        let order = match (key(left), key(right)) {
            (Some(left), Some(right)) => left.cmp_value(&right),
            _ => Ordering::Equal,
        };
        match direction {
            SortDirection::Asc => order,
            SortDirection::Desc => order.reverse(),
        }
    });
    sorted
}
