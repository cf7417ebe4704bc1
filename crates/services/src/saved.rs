//! # Saved listings

use std::sync::Arc;

use tracing::instrument;

use domains::{
    DomainError, PropertyId, PropertyRepository, Result, SavedListing, SavedPropertyRepository,
    UserId,
};

pub struct SavedPropertyService {
    saved: Arc<dyn SavedPropertyRepository>,
    properties: Arc<dyn PropertyRepository>,
}

impl SavedPropertyService {
    pub fn new(saved: Arc<dyn SavedPropertyRepository>, properties: Arc<dyn PropertyRepository>) -> Self {
        Self { saved, properties }
    }

    #[instrument(skip(self))]
    pub async fn save(&self, user_id: UserId, property_id: PropertyId) -> Result<()> {
        if self.properties.owner_of(property_id).await?.is_none() {
            return Err(DomainError::not_found("Property", property_id));
        }
        if self.saved.exists(user_id, property_id).await? {
            return Err(DomainError::Conflict("Property already saved".into()));
        }
        self.saved.save(user_id, property_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, property_id: PropertyId) -> Result<()> {
        if self.saved.remove(user_id, property_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(
                "Saved property".into(),
                property_id.to_string(),
            ))
        }
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<SavedListing>> {
        self.saved.list(user_id).await
    }
}
