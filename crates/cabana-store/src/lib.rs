// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod memory;

use anyhow::{Context, Result, anyhow};
use cabana_api::{CabinWrite, Client, SettingsPatch, storage_object_name};
use cabana_app::{
    Cabin, CabinFormInput, CabinId, CabinImageField, FormMode, ImageInput, SettingKey,
    SettingValue, Settings,
};
use std::cell::RefCell;
use thiserror::Error;
use tracing::{debug, warn};

/// One cache slot per remote resource. Mutations invalidate their tag; the
/// next read refetches. That is the entire staleness model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTag {
    Cabins,
    Settings,
}

pub trait RowStore {
    fn list_cabins(&self) -> Result<Vec<Cabin>>;
    fn insert_cabin(&self, row: &CabinWrite) -> Result<Cabin>;
    fn update_cabin(&self, id: CabinId, row: &CabinWrite) -> Result<Cabin>;
    fn delete_cabin(&self, id: CabinId) -> Result<()>;
    fn get_settings(&self) -> Result<Settings>;
    fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings>;
}

pub trait ObjectStore {
    fn upload_object(&self, name: &str, content_type: &str, data: &[u8]) -> Result<()>;
    fn object_public_url(&self, name: &str) -> String;
}

impl RowStore for Client {
    fn list_cabins(&self) -> Result<Vec<Cabin>> {
        Client::list_cabins(self)
    }

    fn insert_cabin(&self, row: &CabinWrite) -> Result<Cabin> {
        Client::insert_cabin(self, row)
    }

    fn update_cabin(&self, id: CabinId, row: &CabinWrite) -> Result<Cabin> {
        Client::update_cabin(self, id, row)
    }

    fn delete_cabin(&self, id: CabinId) -> Result<()> {
        Client::delete_cabin(self, id)
    }

    fn get_settings(&self) -> Result<Settings> {
        Client::get_settings(self)
    }

    fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        Client::update_settings(self, patch)
    }
}

impl ObjectStore for Client {
    fn upload_object(&self, name: &str, content_type: &str, data: &[u8]) -> Result<()> {
        Client::upload_object(self, name, content_type, data)
    }

    fn object_public_url(&self, name: &str) -> String {
        Client::object_public_url(self, name)
    }
}

/// Which phase of the two-step save failed. Callers surface the phase
/// message; the transport cause stays on the error chain.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cabin could not be saved")]
    RowWrite(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("cabin image could not be uploaded and the cabin was not saved")]
    Upload {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// Whether the compensating delete of the just-written row landed.
        compensated: bool,
    },
}

/// Data-access facade for the UI: remote calls with per-resource caching,
/// plus the write operations that invalidate those caches.
pub struct Store<B> {
    backend: B,
    cabins: RefCell<Option<Vec<Cabin>>>,
    settings: RefCell<Option<Settings>>,
}

impl<B: RowStore + ObjectStore> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cabins: RefCell::new(None),
            settings: RefCell::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Cached cabin set; fetches on first read or after invalidation.
    pub fn cabins(&self) -> Result<Vec<Cabin>> {
        if let Some(cabins) = self.cabins.borrow().as_ref() {
            return Ok(cabins.clone());
        }
        let fetched = self.backend.list_cabins()?;
        *self.cabins.borrow_mut() = Some(fetched.clone());
        Ok(fetched)
    }

    pub fn settings(&self) -> Result<Settings> {
        if let Some(settings) = *self.settings.borrow() {
            return Ok(settings);
        }
        let fetched = self.backend.get_settings()?;
        *self.settings.borrow_mut() = Some(fetched);
        Ok(fetched)
    }

    pub fn invalidate(&self, tag: ResourceTag) {
        match tag {
            ResourceTag::Cabins => {
                self.cabins.borrow_mut().take();
            }
            ResourceTag::Settings => {
                self.settings.borrow_mut().take();
            }
        }
    }

    /// Two-step save: write the row first, then upload any new image, and
    /// compensate by deleting the just-written row if the upload fails. The
    /// row-write-first order means a failed row write never leaves an
    /// unreferenced upload behind; the brief window where the row points at
    /// a not-yet-uploaded object is closed by the compensating delete.
    pub fn save_cabin(
        &self,
        mode: FormMode,
        input: &CabinFormInput,
    ) -> std::result::Result<Cabin, SaveError> {
        match &input.image {
            CabinImageField::Keep => {
                let existing = self
                    .existing_image_url(mode)
                    .map_err(|error| SaveError::RowWrite(error.into()))?;
                let row = cabin_write(input, existing);
                let saved = self
                    .write_row(mode, &row)
                    .map_err(|error| SaveError::RowWrite(error.into()))?;
                self.invalidate(ResourceTag::Cabins);
                Ok(saved)
            }
            CabinImageField::Upload(image) => self.save_with_upload(mode, input, image),
        }
    }

    fn save_with_upload(
        &self,
        mode: FormMode,
        input: &CabinFormInput,
        image: &ImageInput,
    ) -> std::result::Result<Cabin, SaveError> {
        let name = storage_object_name(&image.file_name, rand::random::<u64>());
        let url = self.backend.object_public_url(&name);
        let row = cabin_write(input, url);

        let saved = self
            .write_row(mode, &row)
            .map_err(|error| SaveError::RowWrite(error.into()))?;
        // The row exists remotely from here on; whatever happens next, the
        // cached copy is stale.
        self.invalidate(ResourceTag::Cabins);

        if let Err(source) = self
            .backend
            .upload_object(&name, &image.content_type, &image.data)
        {
            let compensated = match self.backend.delete_cabin(saved.id) {
                Ok(()) => true,
                Err(delete_error) => {
                    warn!(
                        cabin_id = saved.id.get(),
                        error = %format!("{delete_error:#}"),
                        "compensating delete failed; row references a missing image",
                    );
                    false
                }
            };
            return Err(SaveError::Upload {
                source: source.into(),
                compensated,
            });
        }

        debug!(cabin_id = saved.id.get(), object = %name, "cabin saved with new image");
        Ok(saved)
    }

    pub fn delete_cabin(&self, id: CabinId) -> Result<()> {
        self.backend.delete_cabin(id)?;
        self.invalidate(ResourceTag::Cabins);
        Ok(())
    }

    pub fn update_setting(&self, key: SettingKey, value: SettingValue) -> Result<Settings> {
        let patch = SettingsPatch::for_value(key, value)
            .ok_or_else(|| anyhow!("value kind does not fit setting {}", key.as_str()))?;
        let updated = self.backend.update_settings(&patch)?;
        self.invalidate(ResourceTag::Settings);
        Ok(updated)
    }

    fn write_row(&self, mode: FormMode, row: &CabinWrite) -> Result<Cabin> {
        match mode {
            FormMode::Create => self.backend.insert_cabin(row),
            FormMode::Edit(id) => self.backend.update_cabin(id, row),
        }
    }

    fn existing_image_url(&self, mode: FormMode) -> Result<String> {
        let FormMode::Edit(id) = mode else {
            // Validation requires an image in create mode; reaching this
            // without one is a caller bug surfaced as a save failure.
            return Err(anyhow!("a new cabin needs an image file"));
        };
        let cabins = self.cabins().context("resolve the existing cabin image")?;
        cabins
            .into_iter()
            .find(|cabin| cabin.id == id)
            .map(|cabin| cabin.image)
            .ok_or_else(|| anyhow!("no cabin with id {} to edit", id.get()))
    }
}

fn cabin_write(input: &CabinFormInput, image: String) -> CabinWrite {
    CabinWrite {
        name: input.name.clone(),
        max_capacity: input.max_capacity,
        regular_price_cents: input.regular_price_cents,
        discount_cents: input.discount_cents,
        description: input.description.clone(),
        image,
    }
}
