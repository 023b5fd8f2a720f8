// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;
use crate::sort::SortValue;

/// The settings table holds exactly one row, created by the backend; the
/// client only ever reads and patches this id.
pub const SETTINGS_ROW_ID: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiscountFilter {
    #[default]
    All,
    NoDiscount,
    WithDiscount,
}

impl DiscountFilter {
    pub const ALL: [Self; 3] = [Self::All, Self::NoDiscount, Self::WithDiscount];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NoDiscount => "no-discount",
            Self::WithDiscount => "with-discount",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "no-discount" => Some(Self::NoDiscount),
            "with-discount" => Some(Self::WithDiscount),
            _ => None,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::NoDiscount,
            Self::NoDiscount => Self::WithDiscount,
            Self::WithDiscount => Self::All,
        }
    }

    pub const fn keeps(self, discount_cents: i64) -> bool {
        match self {
            Self::All => true,
            Self::NoDiscount => discount_cents == 0,
            Self::WithDiscount => discount_cents > 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CabinSortField {
    CreatedAt,
    Name,
    RegularPrice,
    Discount,
    MaxCapacity,
}

impl CabinSortField {
    pub const ALL: [Self; 5] = [
        Self::CreatedAt,
        Self::Name,
        Self::RegularPrice,
        Self::Discount,
        Self::MaxCapacity,
    ];

    // Wire tokens are part of the persisted view-state encoding and keep
    // the original camelCase spellings.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Name => "name",
            Self::RegularPrice => "regularPrice",
            Self::Discount => "discount",
            Self::MaxCapacity => "maxCapacity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(Self::CreatedAt),
            "name" => Some(Self::Name),
            "regularPrice" => Some(Self::RegularPrice),
            "discount" => Some(Self::Discount),
            "maxCapacity" => Some(Self::MaxCapacity),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CreatedAt => "created",
            Self::Name => "cabin",
            Self::RegularPrice => "price",
            Self::Discount => "discount",
            Self::MaxCapacity => "capacity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Cabins,
    Settings,
}

impl TabKind {
    pub const ALL: [Self; 3] = [Self::Dashboard, Self::Cabins, Self::Settings];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Cabins => "cabins",
            Self::Settings => "settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Cabin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Edit,
    Form(FormKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cabin {
    pub id: CabinId,
    pub name: String,
    pub max_capacity: i32,
    pub regular_price_cents: i64,
    pub discount_cents: i64,
    pub description: String,
    pub image: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Cabin {
    pub fn sort_value(&self, field: CabinSortField) -> Option<SortValue> {
        Some(match field {
            CabinSortField::CreatedAt => SortValue::Integer(self.created_at.unix_timestamp()),
            CabinSortField::Name => SortValue::Text(self.name.clone()),
            CabinSortField::RegularPrice => SortValue::Integer(self.regular_price_cents),
            CabinSortField::Discount => SortValue::Integer(self.discount_cents),
            CabinSortField::MaxCapacity => SortValue::Integer(i64::from(self.max_capacity)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i64,
    pub min_booking_length: i32,
    pub max_booking_length: i32,
    pub max_guests_per_booking: i32,
    pub breakfast_price_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingKey {
    MinBookingLength,
    MaxBookingLength,
    MaxGuestsPerBooking,
    BreakfastPrice,
}

impl SettingKey {
    pub const ALL: [Self; 4] = [
        Self::MinBookingLength,
        Self::MaxBookingLength,
        Self::MaxGuestsPerBooking,
        Self::BreakfastPrice,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MinBookingLength => "min_booking_length",
            Self::MaxBookingLength => "max_booking_length",
            Self::MaxGuestsPerBooking => "max_guests_per_booking",
            Self::BreakfastPrice => "breakfast_price_cents",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "min_booking_length" => Some(Self::MinBookingLength),
            "max_booking_length" => Some(Self::MaxBookingLength),
            "max_guests_per_booking" => Some(Self::MaxGuestsPerBooking),
            "breakfast_price_cents" => Some(Self::BreakfastPrice),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MinBookingLength => "min nights/booking",
            Self::MaxBookingLength => "max nights/booking",
            Self::MaxGuestsPerBooking => "max guests/booking",
            Self::BreakfastPrice => "breakfast price",
        }
    }

    pub const fn expected_value_kind(self) -> SettingValueKind {
        match self {
            Self::MinBookingLength | Self::MaxBookingLength | Self::MaxGuestsPerBooking => {
                SettingValueKind::Count
            }
            Self::BreakfastPrice => SettingValueKind::Money,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingValueKind {
    Count,
    Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingValue {
    Count(i32),
    Money(i64),
}

impl SettingValue {
    pub fn parse_for_key(key: SettingKey, raw: &str) -> Option<Self> {
        match key.expected_value_kind() {
            SettingValueKind::Count => {
                let count: i32 = raw.trim().parse().ok()?;
                (count > 0).then_some(Self::Count(count))
            }
            SettingValueKind::Money => {
                let cents = parse_money_cents(raw)?;
                (cents > 0).then_some(Self::Money(cents))
            }
        }
    }

    pub fn display(self) -> String {
        match self {
            Self::Count(count) => count.to_string(),
            Self::Money(cents) => format_money(cents),
        }
    }
}

impl Settings {
    pub fn value(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::MinBookingLength => SettingValue::Count(self.min_booking_length),
            SettingKey::MaxBookingLength => SettingValue::Count(self.max_booking_length),
            SettingKey::MaxGuestsPerBooking => SettingValue::Count(self.max_guests_per_booking),
            SettingKey::BreakfastPrice => SettingValue::Money(self.breakfast_price_cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DashboardCounts {
    pub cabins: usize,
    pub with_discount: usize,
    pub no_discount: usize,
}

impl DashboardCounts {
    pub fn from_cabins(cabins: &[Cabin]) -> Self {
        let with_discount = cabins
            .iter()
            .filter(|cabin| cabin.discount_cents > 0)
            .count();
        Self {
            cabins: cabins.len(),
            with_discount,
            no_discount: cabins.len() - with_discount,
        }
    }
}

pub fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{sign}${}.{:02}", magnitude / 100, magnitude % 100)
}

/// Parses a money amount such as `450`, `450.5`, or `450.50` into cents.
pub fn parse_money_cents(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let dollars: i64 = whole.parse().ok()?;
    if dollars < 0 || whole.starts_with('-') {
        return None;
    }
    let mut cents_part: i64 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().ok()?
    };
    if fraction.len() == 1 {
        cents_part *= 10;
    }

    dollars.checked_mul(100)?.checked_add(cents_part)
}
