// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use cabana_app::{Cabin, CabinId, SETTINGS_ROW_ID, Settings};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BUCKET: &str = "cabin-images";

const CABINS_TABLE: &str = "cabins";
const SETTINGS_TABLE: &str = "settings";

/// Row as written to the table store. The `image` field always carries the
/// final public URL; binary payloads go through `upload_object` separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CabinWrite {
    pub name: String,
    pub max_capacity: i32,
    pub regular_price_cents: i64,
    pub discount_cents: i64,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_booking_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_booking_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_guests_per_booking: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakfast_price_cents: Option<i64>,
}

impl SettingsPatch {
    pub fn for_value(key: cabana_app::SettingKey, value: cabana_app::SettingValue) -> Option<Self> {
        use cabana_app::{SettingKey, SettingValue};
        let mut patch = Self::default();
        match (key, value) {
            (SettingKey::MinBookingLength, SettingValue::Count(count)) => {
                patch.min_booking_length = Some(count);
            }
            (SettingKey::MaxBookingLength, SettingValue::Count(count)) => {
                patch.max_booking_length = Some(count);
            }
            (SettingKey::MaxGuestsPerBooking, SettingValue::Count(count)) => {
                patch.max_guests_per_booking = Some(count);
            }
            (SettingKey::BreakfastPrice, SettingValue::Money(cents)) => {
                patch.breakfast_price_cents = Some(cents);
            }
            _ => return None,
        }
        Some(patch)
    }
}

/// Blocking client for the hosted backend: a PostgREST-style row store under
/// `/rest/v1` and an object store under `/storage/v1`.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    api_key: String,
    bucket: String,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: &str, bucket: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("backend.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("invalid backend.base_url {base_url:?}"))?;
        if api_key.trim().is_empty() {
            bail!("backend.api_key must not be empty");
        }
        if bucket.trim().is_empty() || bucket.contains('/') {
            bail!("backend.bucket must be a flat bucket name, got {bucket:?}");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.to_owned(),
            bucket: bucket.to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn list_cabins(&self) -> Result<Vec<Cabin>> {
        debug!(table = CABINS_TABLE, "select all rows");
        let response = self
            .execute(
                self.http
                    .get(self.table_url(CABINS_TABLE))
                    .query(&[("select", "*"), ("order", "id.asc")]),
            )
            .context("cabins could not be loaded")?;
        response.json().context("decode cabin rows")
    }

    pub fn insert_cabin(&self, row: &CabinWrite) -> Result<Cabin> {
        debug!(table = CABINS_TABLE, name = %row.name, "insert row");
        let response = self
            .execute(
                self.http
                    .post(self.table_url(CABINS_TABLE))
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .context("cabin could not be created")?;
        let rows: Vec<Cabin> = response.json().context("decode created cabin")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("backend returned no representation for the created cabin"))
    }

    pub fn update_cabin(&self, id: CabinId, row: &CabinWrite) -> Result<Cabin> {
        debug!(table = CABINS_TABLE, id = id.get(), "update row");
        let response = self
            .execute(
                self.http
                    .patch(self.table_url(CABINS_TABLE))
                    .query(&[("id", format!("eq.{}", id.get()))])
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .context("cabin could not be updated")?;
        let rows: Vec<Cabin> = response.json().context("decode updated cabin")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("no cabin with id {} to update", id.get()))
    }

    pub fn delete_cabin(&self, id: CabinId) -> Result<()> {
        debug!(table = CABINS_TABLE, id = id.get(), "delete row");
        self.execute(
            self.http
                .delete(self.table_url(CABINS_TABLE))
                .query(&[("id", format!("eq.{}", id.get()))]),
        )
        .context("cabin could not be deleted")?;
        Ok(())
    }

    pub fn get_settings(&self) -> Result<Settings> {
        debug!(table = SETTINGS_TABLE, "select singleton row");
        let response = self
            .execute(
                self.http
                    .get(self.table_url(SETTINGS_TABLE))
                    .query(&[("select", "*".to_owned()), ("id", format!("eq.{SETTINGS_ROW_ID}"))]),
            )
            .context("settings could not be loaded")?;
        let rows: Vec<Settings> = response.json().context("decode settings row")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("settings row {SETTINGS_ROW_ID} is missing from the backend"))
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings> {
        debug!(table = SETTINGS_TABLE, "patch singleton row");
        let response = self
            .execute(
                self.http
                    .patch(self.table_url(SETTINGS_TABLE))
                    .query(&[("id", format!("eq.{SETTINGS_ROW_ID}"))])
                    .header("Prefer", "return=representation")
                    .json(patch),
            )
            .context("settings could not be updated")?;
        let rows: Vec<Settings> = response.json().context("decode settings row")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("settings row {SETTINGS_ROW_ID} is missing from the backend"))
    }

    pub fn upload_object(&self, name: &str, content_type: &str, data: &[u8]) -> Result<()> {
        debug!(bucket = %self.bucket, name, bytes = data.len(), "upload object");
        self.execute(
            self.http
                .post(format!(
                    "{}/storage/v1/object/{}/{name}",
                    self.base_url, self.bucket
                ))
                .header("Content-Type", content_type)
                .body(data.to_vec()),
        )
        .context("cabin image could not be uploaded")?;
        Ok(())
    }

    /// The deterministic public URL an uploaded object is reachable at.
    pub fn object_public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{name}",
            self.base_url, self.bucket
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }
}

/// Storage object names are flat keys: a random prefix for global
/// uniqueness, the original file name for traceability, path separators
/// stripped so no key ever nests.
pub fn storage_object_name(file_name: &str, nonce: u64) -> String {
    format!("{nonce:016x}-{file_name}")
        .chars()
        .filter(|c| *c != '/' && *c != '\\')
        .collect()
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("backend at {base_url} timed out -- raise [backend].timeout or check the service");
    }
    anyhow!("cannot reach backend at {base_url} -- check [backend].base_url and the network ({error})")
}

#[derive(Debug, Deserialize)]
struct BackendErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<BackendErrorEnvelope>(body) {
        if let Some(message) = parsed.message.filter(|message| !message.is_empty()) {
            return anyhow!("backend error ({}): {}", status.as_u16(), message);
        }
        if let Some(error) = parsed.error.filter(|error| !error.is_empty()) {
            return anyhow!("backend error ({}): {}", status.as_u16(), error);
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("backend error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("backend returned {}", status.as_u16())
}
