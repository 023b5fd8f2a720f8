// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use cabana_app::{
    Cabin, CabinFormInput, CabinId, DashboardCounts, FormMode, SettingKey, SettingValue, Settings,
};
use cabana_store::{ObjectStore, RowStore, Store};

/// Adapts the caching store to the UI's runtime seam. Validation runs here,
/// before any network call, so an invalid payload never starts the saga.
pub struct StoreRuntime<B> {
    store: Store<B>,
}

impl<B: RowStore + ObjectStore> StoreRuntime<B> {
    pub fn new(store: Store<B>) -> Self {
        Self { store }
    }
}

impl<B: RowStore + ObjectStore> cabana_tui::AppRuntime for StoreRuntime<B> {
    fn load_cabins(&mut self) -> Result<Vec<Cabin>> {
        self.store.cabins()
    }

    fn load_settings(&mut self) -> Result<Settings> {
        self.store.settings()
    }

    fn load_dashboard_counts(&mut self) -> Result<DashboardCounts> {
        Ok(DashboardCounts::from_cabins(&self.store.cabins()?))
    }

    fn save_cabin(&mut self, mode: FormMode, input: &CabinFormInput) -> Result<Cabin> {
        input.ensure_valid(mode)?;
        self.store
            .save_cabin(mode, input)
            .map_err(anyhow::Error::new)
    }

    fn delete_cabin(&mut self, id: CabinId) -> Result<()> {
        self.store.delete_cabin(id)
    }

    fn update_setting(&mut self, key: SettingKey, value: SettingValue) -> Result<Settings> {
        self.store.update_setting(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::Result;
    use cabana_api::Client;
    use cabana_app::{CabinFormInput, CabinImageField, FormMode, ImageInput};
    use cabana_store::Store;
    use cabana_store::memory::MemoryBackend;
    use cabana_testkit::{CabinFaker, MockBackend};
    use cabana_tui::AppRuntime;
    use std::time::Duration;

    fn upload_input(name: &str) -> CabinFormInput {
        CabinFormInput {
            name: name.to_owned(),
            max_capacity: 4,
            regular_price_cents: 45_000,
            discount_cents: 0,
            description: "Two-bedroom cabin by the lake".to_owned(),
            image: CabinImageField::Upload(ImageInput {
                file_name: "birch.jpg".to_owned(),
                content_type: "image/jpeg".to_owned(),
                data: vec![0xff, 0xd8, 0xff],
            }),
        }
    }

    #[test]
    fn invalid_payload_never_reaches_the_backend() {
        let mut runtime = StoreRuntime::new(Store::new(MemoryBackend::new()));

        let mut input = upload_input("");
        input.discount_cents = 50_000;
        let error = runtime
            .save_cabin(FormMode::Create, &input)
            .expect_err("invalid payload should fail");
        assert!(error.to_string().contains("required"));
        assert!(runtime.store.backend().operations().is_empty());
    }

    #[test]
    fn dashboard_counts_follow_the_cached_cabins() -> Result<()> {
        let mut runtime = StoreRuntime::new(Store::new(MemoryBackend::demo()));
        let counts = runtime.load_dashboard_counts()?;
        assert_eq!(counts.cabins, 8);
        assert_eq!(counts.with_discount + counts.no_discount, counts.cabins);
        Ok(())
    }

    #[test]
    fn create_against_the_wire_writes_row_then_uploads() -> Result<()> {
        let backend = MockBackend::start()?;
        let client = Client::new(
            backend.base_url(),
            "service-key",
            "cabin-images",
            Duration::from_secs(2),
        )?;
        let mut runtime = StoreRuntime::new(Store::new(client));

        let saved = runtime.save_cabin(FormMode::Create, &upload_input("Birch"))?;
        assert_eq!(saved.name, "Birch");

        let requests = backend.requests();
        assert_eq!(requests[0], "POST /rest/v1/cabins");
        assert!(requests[1].starts_with("POST /storage/v1/object/cabin-images/"));
        assert!(backend.uploads()[0].ends_with("-birch.jpg"));
        Ok(())
    }

    #[test]
    fn upload_failure_against_the_wire_compensates_and_reports_the_phase() -> Result<()> {
        let backend = MockBackend::with_cabins(CabinFaker::new(1).cabins(2))?;
        backend.state().fail_uploads = true;
        let client = Client::new(
            backend.base_url(),
            "service-key",
            "cabin-images",
            Duration::from_secs(2),
        )?;
        let mut runtime = StoreRuntime::new(Store::new(client));

        let error = runtime
            .save_cabin(FormMode::Create, &upload_input("Birch"))
            .expect_err("upload failure should fail the save");
        assert!(
            format!("{error:#}").contains("image could not be uploaded"),
            "{error:#}"
        );

        let requests = backend.requests();
        assert_eq!(requests[0], "POST /rest/v1/cabins");
        assert!(requests[1].starts_with("POST /storage/v1/object/"));
        assert_eq!(requests[2], "DELETE /rest/v1/cabins");
        // The compensating delete removed the just-written row.
        assert_eq!(backend.state().cabins.len(), 2);
        Ok(())
    }

    #[test]
    fn edit_without_image_issues_no_storage_request() -> Result<()> {
        let backend = MockBackend::with_cabins(CabinFaker::new(5).cabins(1))?;
        let original_image = backend.state().cabins[0].image.clone();
        let target = backend.state().cabins[0].id;
        let client = Client::new(
            backend.base_url(),
            "service-key",
            "cabin-images",
            Duration::from_secs(2),
        )?;
        let mut runtime = StoreRuntime::new(Store::new(client));

        let mut input = upload_input("Renamed");
        input.image = CabinImageField::Keep;
        let saved = runtime.save_cabin(FormMode::Edit(target), &input)?;

        assert_eq!(saved.image, original_image);
        assert!(
            backend
                .requests()
                .iter()
                .all(|request| !request.contains("/storage/"))
        );
        Ok(())
    }
}
