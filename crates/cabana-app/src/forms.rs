// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{Cabin, CabinId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(CabinId),
}

impl FormMode {
    pub const fn is_edit(self) -> bool {
        matches!(self, Self::Edit(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// What the image input of the form holds at submit time. `Keep` reuses the
/// record's stored URL and is only valid for edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CabinImageField {
    Keep,
    Upload(ImageInput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CabinField {
    Name,
    MaxCapacity,
    RegularPrice,
    Discount,
    Description,
    Image,
}

impl CabinField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "cabin name",
            Self::MaxCapacity => "maximum capacity",
            Self::RegularPrice => "regular price",
            Self::Discount => "discount",
            Self::Description => "description",
            Self::Image => "cabin photo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: CabinField,
    pub message: String,
}

impl FieldError {
    fn new(field: CabinField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabinFormInput {
    pub name: String,
    pub max_capacity: i32,
    pub regular_price_cents: i64,
    pub discount_cents: i64,
    pub description: String,
    pub image: CabinImageField,
}

impl CabinFormInput {
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            max_capacity: 0,
            regular_price_cents: 0,
            discount_cents: 0,
            description: String::new(),
            image: CabinImageField::Keep,
        }
    }

    /// Edit prefill. File inputs cannot be pre-filled, so the image starts
    /// as `Keep` and the stored URL survives an untouched submit.
    pub fn from_cabin(cabin: &Cabin) -> Self {
        Self {
            name: cabin.name.clone(),
            max_capacity: cabin.max_capacity,
            regular_price_cents: cabin.regular_price_cents,
            discount_cents: cabin.discount_cents,
            description: cabin.description.clone(),
            image: CabinImageField::Keep,
        }
    }

    /// Field-scoped validation. The discount ceiling is checked against the
    /// regular price as currently entered, not against any stored record.
    pub fn field_errors(&self, mode: FormMode) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FieldError::new(CabinField::Name, "this field is required"));
        }
        if self.max_capacity < 1 {
            errors.push(FieldError::new(
                CabinField::MaxCapacity,
                "capacity should be at least 1",
            ));
        }
        if self.regular_price_cents < 100 {
            errors.push(FieldError::new(
                CabinField::RegularPrice,
                "price should be at least 1",
            ));
        }
        if self.discount_cents < 0 {
            errors.push(FieldError::new(
                CabinField::Discount,
                "discount cannot be negative",
            ));
        } else if self.discount_cents > self.regular_price_cents {
            errors.push(FieldError::new(
                CabinField::Discount,
                "discount should be less than the regular price",
            ));
        }
        if self.description.trim().is_empty() {
            errors.push(FieldError::new(
                CabinField::Description,
                "this field is required",
            ));
        }

        match &self.image {
            CabinImageField::Keep => {
                if !mode.is_edit() {
                    errors.push(FieldError::new(
                        CabinField::Image,
                        "this field is required",
                    ));
                }
            }
            CabinImageField::Upload(image) => {
                if image.file_name.trim().is_empty() {
                    errors.push(FieldError::new(
                        CabinField::Image,
                        "image file name is missing",
                    ));
                } else if image.data.is_empty() {
                    errors.push(FieldError::new(
                        CabinField::Image,
                        "image file is empty -- choose a file with content and retry",
                    ));
                }
            }
        }

        errors
    }

    pub fn ensure_valid(&self, mode: FormMode) -> Result<()> {
        if let Some(error) = self.field_errors(mode).into_iter().next() {
            bail!("{}: {}", error.field.label(), error.message);
        }
        Ok(())
    }
}
