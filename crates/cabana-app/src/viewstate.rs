// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{CabinSortField, DiscountFilter, SortDirection};

pub const DISCOUNT_PARAM: &str = "discount";
pub const SORT_PARAM: &str = "sortBy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: CabinSortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: CabinSortField::CreatedAt,
            direction: SortDirection::Asc,
        }
    }
}

impl SortSpec {
    /// Parses `<field>-<direction>`. Absent or malformed values fall back
    /// to the default pair, never to an error.
    pub fn parse(raw: &str) -> Self {
        let Some((raw_field, raw_direction)) = raw.split_once('-') else {
            return Self::default();
        };
        match (
            CabinSortField::parse(raw_field),
            SortDirection::parse(raw_direction),
        ) {
            (Some(field), Some(direction)) => Self { field, direction },
            _ => Self::default(),
        }
    }

    pub fn encode(self) -> String {
        format!("{}-{}", self.field.as_str(), self.direction.as_str())
    }
}

/// The filter/sort pair persisted as a query-parameter string. This is the
/// only view state that survives outside the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub discount: DiscountFilter,
    pub sort: SortSpec,
}

impl ViewState {
    pub fn parse(raw: &str) -> Self {
        let mut view = Self::default();
        for pair in raw.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                DISCOUNT_PARAM => {
                    view.discount = DiscountFilter::parse(value).unwrap_or_default();
                }
                SORT_PARAM => {
                    view.sort = SortSpec::parse(value);
                }
                // Unknown parameters belong to other views.
                _ => {}
            }
        }
        view
    }

    /// Canonical encoding; parameters at their default value are omitted,
    /// matching a URL that was never touched.
    pub fn encode(self) -> String {
        let mut pairs = Vec::new();
        if self.discount != DiscountFilter::default() {
            pairs.push(format!("{DISCOUNT_PARAM}={}", self.discount.as_str()));
        }
        if self.sort != SortSpec::default() {
            pairs.push(format!("{SORT_PARAM}={}", self.sort.encode()));
        }
        pairs.join("&")
    }
}
