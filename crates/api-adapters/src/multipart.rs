//! Listing forms arrive as `multipart/form-data`: text fields plus up to
//! `max_images` files under `property_images`.

use std::str::FromStr;

use axum::extract::Multipart;
use mime::Mime;
use tracing::debug;

use domains::PropertyDraft;
use services::ImageUpload;

use crate::error::ApiError;

pub const IMAGE_FIELD: &str = "property_images";

#[derive(Debug)]
pub struct PropertyForm {
    pub draft: PropertyDraft,
    pub images: Vec<ImageUpload>,
}

fn number<T: FromStr>(field: &str, value: &str) -> Result<T, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{field} must be a number")))
}

pub async fn read_property_form(mut multipart: Multipart, max_images: usize) -> Result<PropertyForm, ApiError> {
    let mut draft = PropertyDraft::default();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == IMAGE_FIELD {
            // Browsers send the declared type; fall back to the file extension.
            let content_type = field
                .content_type()
                .and_then(|ct| ct.parse::<Mime>().ok())
                .or_else(|| field.file_name().and_then(|f| mime_guess::from_path(f).first()))
                .unwrap_or(mime::APPLICATION_OCTET_STREAM);
            let data = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
            // An empty file input still submits a part.
            if data.is_empty() {
                continue;
            }
            if images.len() == max_images {
                return Err(ApiError::bad_request(format!(
                    "at most {max_images} images per listing"
                )));
            }
            images.push(ImageUpload { data, content_type });
            continue;
        }

        let value = field.text().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
        match name.as_str() {
            "title" => draft.title = value,
            "description" => draft.description = value,
            "price" => draft.price = number("price", &value)?,
            "location" => draft.location = value,
            "property_type" => draft.property_type = value,
            "bedrooms" => draft.bedrooms = number("bedrooms", &value)?,
            "bathrooms" => draft.bathrooms = number("bathrooms", &value)?,
            "square_feet" => draft.square_feet = number("square_feet", &value)?,
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(PropertyForm { draft, images })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_trims_and_rejects_garbage() {
        assert_eq!(number::<i32>("bedrooms", " 3 ").unwrap(), 3);
        assert_eq!(number::<f64>("price", "125000.50").unwrap(), 125_000.5);
        assert!(number::<i32>("bedrooms", "three").is_err());
        assert!(number::<i32>("bedrooms", "").is_err());
    }
}
