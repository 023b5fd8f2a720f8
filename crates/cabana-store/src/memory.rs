// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use cabana_api::{CabinWrite, SettingsPatch};
use cabana_app::{Cabin, CabinId, SETTINGS_ROW_ID, Settings};
use std::cell::{Cell, RefCell};
use time::OffsetDateTime;

use crate::{ObjectStore, RowStore};

const DEMO_BASE_URL: &str = "https://demo.invalid";

// name, capacity, price cents, discount cents, blurb
const DEMO_CABINS: [(&str, i32, i64, i64, &str); 8] = [
    ("Aspen", 2, 25_000, 0, "Snug one-room cabin under the aspens"),
    ("Birch", 2, 35_000, 2_500, "Creekside cabin with a wood stove"),
    ("Cedar", 4, 45_000, 0, "Two bedrooms and a wraparound porch"),
    ("Juniper", 4, 50_000, 5_000, "Lake view, stone fireplace"),
    ("Larch", 6, 65_000, 0, "Family cabin by the forest trailhead"),
    ("Rowan", 6, 80_000, 7_500, "Loft bedrooms and a private sauna"),
    ("Spruce", 8, 110_000, 0, "The big lodge, sleeps eight"),
    ("Willow", 10, 140_000, 10_000, "Group lodge with outdoor hot tub"),
];

const DEMO_EPOCH: i64 = 1_767_225_600;

/// Backend stand-in that keeps every row in memory. Drives `--demo` and the
/// store tests; records operations and can be scripted to fail.
#[derive(Debug)]
pub struct MemoryBackend {
    cabins: RefCell<Vec<Cabin>>,
    settings: RefCell<Option<Settings>>,
    next_id: Cell<i64>,
    operations: RefCell<Vec<String>>,
    uploads: RefCell<Vec<String>>,
    fail_row_writes: Cell<bool>,
    fail_deletes: Cell<bool>,
    fail_uploads: Cell<bool>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            cabins: RefCell::new(Vec::new()),
            settings: RefCell::new(Some(Settings {
                id: SETTINGS_ROW_ID,
                min_booking_length: 3,
                max_booking_length: 30,
                max_guests_per_booking: 8,
                breakfast_price_cents: 1_500,
            })),
            next_id: Cell::new(1),
            operations: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
            fail_row_writes: Cell::new(false),
            fail_deletes: Cell::new(false),
            fail_uploads: Cell::new(false),
        }
    }

    pub fn demo() -> Self {
        let backend = Self::new();
        for (name, max_capacity, regular_price_cents, discount_cents, blurb) in DEMO_CABINS {
            let id = backend.next_id.replace(backend.next_id.get() + 1);
            backend.cabins.borrow_mut().push(Cabin {
                id: CabinId::new(id),
                name: name.to_owned(),
                max_capacity,
                regular_price_cents,
                discount_cents,
                description: format!("{blurb}."),
                image: backend.object_public_url(&format!(
                    "demo-{}.jpg",
                    name.to_ascii_lowercase()
                )),
                created_at: demo_timestamp(id),
            });
        }
        backend
    }

    pub fn with_cabins(cabins: Vec<Cabin>) -> Self {
        let backend = Self::new();
        let next = cabins.iter().map(|cabin| cabin.id.get()).max().unwrap_or(0) + 1;
        backend.next_id.set(next);
        *backend.cabins.borrow_mut() = cabins;
        backend
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.borrow().clone()
    }

    pub fn rows(&self) -> Vec<Cabin> {
        self.cabins.borrow().clone()
    }

    pub fn set_fail_row_writes(&self, fail: bool) {
        self.fail_row_writes.set(fail);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.set(fail);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.set(fail);
    }

    fn record(&self, operation: String) {
        self.operations.borrow_mut().push(operation);
    }
}

fn demo_timestamp(id: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(DEMO_EPOCH + id * 86_400).expect("valid unix timestamp")
}

impl RowStore for MemoryBackend {
    fn list_cabins(&self) -> Result<Vec<Cabin>> {
        self.record("list cabins".to_owned());
        Ok(self.cabins.borrow().clone())
    }

    fn insert_cabin(&self, row: &CabinWrite) -> Result<Cabin> {
        self.record("insert cabin".to_owned());
        if self.fail_row_writes.get() {
            return Err(anyhow!("cabin could not be created"));
        }
        let id = self.next_id.replace(self.next_id.get() + 1);
        let cabin = Cabin {
            id: CabinId::new(id),
            name: row.name.clone(),
            max_capacity: row.max_capacity,
            regular_price_cents: row.regular_price_cents,
            discount_cents: row.discount_cents,
            description: row.description.clone(),
            image: row.image.clone(),
            created_at: demo_timestamp(id),
        };
        self.cabins.borrow_mut().push(cabin.clone());
        Ok(cabin)
    }

    fn update_cabin(&self, id: CabinId, row: &CabinWrite) -> Result<Cabin> {
        self.record(format!("update cabin {}", id.get()));
        if self.fail_row_writes.get() {
            return Err(anyhow!("cabin could not be updated"));
        }
        let mut cabins = self.cabins.borrow_mut();
        let cabin = cabins
            .iter_mut()
            .find(|cabin| cabin.id == id)
            .ok_or_else(|| anyhow!("no cabin with id {} to update", id.get()))?;
        cabin.name = row.name.clone();
        cabin.max_capacity = row.max_capacity;
        cabin.regular_price_cents = row.regular_price_cents;
        cabin.discount_cents = row.discount_cents;
        cabin.description = row.description.clone();
        cabin.image = row.image.clone();
        Ok(cabin.clone())
    }

    fn delete_cabin(&self, id: CabinId) -> Result<()> {
        self.record(format!("delete cabin {}", id.get()));
        if self.fail_deletes.get() {
            return Err(anyhow!("cabin could not be deleted"));
        }
        self.cabins.borrow_mut().retain(|cabin| cabin.id != id);
        Ok(())
    }

    fn get_settings(&self) -> Result<Settings> {
        self.record("get settings".to_owned());
        let settings = *self.settings.borrow();
        settings.ok_or_else(|| anyhow!("settings row {SETTINGS_ROW_ID} is missing"))
    }

    fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        self.record("update settings".to_owned());
        let mut slot = self.settings.borrow_mut();
        let settings = slot
            .as_mut()
            .ok_or_else(|| anyhow!("settings row {SETTINGS_ROW_ID} is missing"))?;
        if let Some(value) = patch.min_booking_length {
            settings.min_booking_length = value;
        }
        if let Some(value) = patch.max_booking_length {
            settings.max_booking_length = value;
        }
        if let Some(value) = patch.max_guests_per_booking {
            settings.max_guests_per_booking = value;
        }
        if let Some(value) = patch.breakfast_price_cents {
            settings.breakfast_price_cents = value;
        }
        Ok(*settings)
    }
}

impl ObjectStore for MemoryBackend {
    fn upload_object(&self, name: &str, _content_type: &str, _data: &[u8]) -> Result<()> {
        self.record(format!("upload {name}"));
        if self.fail_uploads.get() {
            return Err(anyhow!("cabin image could not be uploaded"));
        }
        self.uploads.borrow_mut().push(name.to_owned());
        Ok(())
    }

    fn object_public_url(&self, name: &str) -> String {
        format!("{DEMO_BASE_URL}/storage/v1/object/public/cabin-images/{name}")
    }
}
