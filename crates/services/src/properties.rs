//! # Listings
//!
//! Seller submissions and edits, buyer-facing search, and admin moderation.

use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use tracing::{info, instrument, warn};

use domains::{
    DomainError, MediaStore, NotificationRepository, Property, PropertyDraft, PropertyFilter,
    PropertyId, PropertyRepository, PropertyStatus, Result, Role, SessionUser, UserId,
};

/// Number of listings on the public landing page.
const FEATURED_LIMIT: i64 = 5;

/// An uploaded image, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: Mime,
}

pub struct PropertyService {
    properties: Arc<dyn PropertyRepository>,
    media: Arc<dyn MediaStore>,
    inbox: Arc<dyn NotificationRepository>,
}

impl PropertyService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        media: Arc<dyn MediaStore>,
        inbox: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self { properties, media, inbox }
    }

    /// Stores the images, then inserts the listing as `pending`.
    #[instrument(skip(self, draft, images), fields(images = images.len()))]
    pub async fn create(
        &self,
        seller_id: UserId,
        draft: PropertyDraft,
        images: Vec<ImageUpload>,
    ) -> Result<Property> {
        draft.validate()?;
        let urls = self.store_images(images).await?;

        match self.properties.create(seller_id, draft, urls.clone()).await {
            Ok(property) => {
                info!(property_id = property.id, "listing submitted");
                Ok(property)
            }
            Err(err) => {
                self.discard_images(&urls).await;
                Err(err)
            }
        }
    }

    /// Edits a listing owned by `seller_id`; new images are appended.
    #[instrument(skip(self, draft, images), fields(images = images.len()))]
    pub async fn update(
        &self,
        id: PropertyId,
        seller_id: UserId,
        draft: PropertyDraft,
        images: Vec<ImageUpload>,
    ) -> Result<Property> {
        draft.validate()?;
        let urls = self.store_images(images).await?;

        match self
            .properties
            .update_owned(id, seller_id, draft, urls.clone())
            .await
        {
            Ok(Some(property)) => Ok(property),
            Ok(None) => {
                self.discard_images(&urls).await;
                Err(DomainError::not_found("Property", id))
            }
            Err(err) => {
                self.discard_images(&urls).await;
                Err(err)
            }
        }
    }

    /// Admins may delete any listing, sellers only their own.
    /// Stored image files go with the row; failing to remove one is only logged.
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn delete(&self, id: PropertyId, actor: &SessionUser) -> Result<()> {
        let owner = match actor.role {
            Role::Admin => None,
            Role::Seller => Some(actor.id),
            Role::Buyer => {
                return Err(DomainError::Forbidden(
                    "You do not have permission to delete properties.".into(),
                ))
            }
        };

        let images = self
            .properties
            .delete(id, owner)
            .await?
            .ok_or_else(|| DomainError::not_found("Property", id))?;

        self.discard_images(&images).await;
        info!(property_id = id, "listing deleted");
        Ok(())
    }

    pub async fn get(&self, id: PropertyId) -> Result<Property> {
        self.properties
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Property", id))
    }

    pub async fn list_all(&self) -> Result<Vec<Property>> {
        self.properties.list_all().await
    }

    pub async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<Property>> {
        self.properties.list_by_seller(seller_id).await
    }

    pub async fn featured(&self) -> Result<Vec<Property>> {
        self.properties
            .list_by_status(PropertyStatus::Approved, Some(FEATURED_LIMIT))
            .await
    }

    pub async fn search(&self, filter: PropertyFilter) -> Result<Vec<Property>> {
        self.properties.filter(filter).await
    }

    pub async fn list_by_status(&self, status: PropertyStatus) -> Result<Vec<Property>> {
        self.properties.list_by_status(status, None).await
    }

    pub async fn count_by_status(&self, status: PropertyStatus) -> Result<i64> {
        self.properties.count_by_status(status, None).await
    }

    /// Moves a listing to `approved` or `blocked` and drops a note in the seller's inbox.
    #[instrument(skip(self))]
    pub async fn moderate(&self, id: PropertyId, status: PropertyStatus) -> Result<()> {
        if status == PropertyStatus::Pending {
            return Err(DomainError::validation("a listing can only be approved or blocked"));
        }
        let property = self.get(id).await?;
        if !self.properties.set_status(id, status).await? {
            return Err(DomainError::not_found("Listing", id));
        }

        let note = format!("Your listing \"{}\" was {}.", property.title, status);
        if let Err(err) = self
            .inbox
            .create(property.seller_id, "listing_status", &note)
            .await
        {
            warn!(property_id = id, error = %err, "could not record moderation notice");
        }
        info!(property_id = id, status = %status, "listing moderated");
        Ok(())
    }

    /// Approves the oldest pending listing and returns its id.
    pub async fn approve_next_pending(&self) -> Result<PropertyId> {
        let id = self
            .properties
            .oldest_pending()
            .await?
            .ok_or_else(|| DomainError::NotFound("Pending listing".into(), "next".into()))?;
        self.moderate(id, PropertyStatus::Approved).await?;
        Ok(id)
    }

    async fn store_images(&self, images: Vec<ImageUpload>) -> Result<Vec<String>> {
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            match self.media.save_image(image.data, &image.content_type).await {
                Ok(url) => urls.push(url),
                Err(err) => {
                    self.discard_images(&urls).await;
                    return Err(err);
                }
            }
        }
        Ok(urls)
    }

    async fn discard_images(&self, urls: &[String]) {
        for url in urls {
            if let Err(err) = self.media.delete(url).await {
                warn!(%url, error = %err, "could not delete image file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockMediaStore, MockNotificationRepository, MockPropertyRepository};
    use mockall::predicate::*;

    fn draft() -> PropertyDraft {
        PropertyDraft {
            title: "Lake house".into(),
            description: "Quiet".into(),
            price: 120_000.0,
            location: "Rangamati".into(),
            property_type: "house".into(),
            bedrooms: 3,
            bathrooms: 2,
            square_feet: 1800,
        }
    }

    fn property(id: PropertyId, seller_id: UserId) -> Property {
        let d = draft();
        Property {
            id,
            seller_id,
            title: d.title,
            description: d.description,
            price: d.price,
            location: d.location,
            property_type: d.property_type,
            bedrooms: d.bedrooms,
            bathrooms: d.bathrooms,
            square_feet: d.square_feet,
            status: PropertyStatus::Pending,
            created_at: Utc::now(),
            images: vec!["/uploads/ab/one.png".into()],
        }
    }

    fn actor(id: UserId, role: Role) -> SessionUser {
        SessionUser { id, username: "x".into(), email: "x@example.com".into(), role }
    }

    #[tokio::test]
    async fn test_seller_delete_is_scoped_and_removes_files() {
        let mut properties = MockPropertyRepository::new();
        properties
            .expect_delete()
            .with(eq(42), eq(Some(3)))
            .returning(|_, _| Ok(Some(vec!["/uploads/ab/one.png".into()])));
        let mut media = MockMediaStore::new();
        media
            .expect_delete()
            .withf(|url| url == "/uploads/ab/one.png")
            .times(1)
            .returning(|_| Ok(()));

        let service = PropertyService::new(
            Arc::new(properties),
            Arc::new(media),
            Arc::new(MockNotificationRepository::new()),
        );
        service.delete(42, &actor(3, Role::Seller)).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_delete_is_unscoped() {
        let mut properties = MockPropertyRepository::new();
        properties
            .expect_delete()
            .with(eq(42), eq(None))
            .returning(|_, _| Ok(Some(vec![])));

        let service = PropertyService::new(
            Arc::new(properties),
            Arc::new(MockMediaStore::new()),
            Arc::new(MockNotificationRepository::new()),
        );
        service.delete(42, &actor(1, Role::Admin)).await.unwrap();
    }

    #[tokio::test]
    async fn test_buyer_cannot_delete() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_delete().never();
        let service = PropertyService::new(
            Arc::new(properties),
            Arc::new(MockMediaStore::new()),
            Arc::new(MockNotificationRepository::new()),
        );

        assert!(matches!(
            service.delete(42, &actor(7, Role::Buyer)).await,
            Err(DomainError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_insert_discards_stored_images() {
        let mut media = MockMediaStore::new();
        media
            .expect_save_image()
            .returning(|_, _| Ok("/uploads/cd/two.png".into()));
        media
            .expect_delete()
            .withf(|url| url == "/uploads/cd/two.png")
            .times(1)
            .returning(|_| Ok(()));
        let mut properties = MockPropertyRepository::new();
        properties
            .expect_create()
            .returning(|_, _, _| Err(DomainError::persistence("db down")));

        let service = PropertyService::new(
            Arc::new(properties),
            Arc::new(media),
            Arc::new(MockNotificationRepository::new()),
        );
        let upload = ImageUpload { data: Bytes::from_static(b"png"), content_type: mime::IMAGE_PNG };

        assert!(service.create(3, draft(), vec![upload]).await.is_err());
    }

    #[tokio::test]
    async fn test_moderation_notifies_seller() {
        let mut properties = MockPropertyRepository::new();
        properties
            .expect_find_by_id()
            .returning(|id| Ok(Some(property(id, 3))));
        properties
            .expect_set_status()
            .with(eq(42), eq(PropertyStatus::Approved))
            .returning(|_, _| Ok(true));
        let mut inbox = MockNotificationRepository::new();
        inbox
            .expect_create()
            .withf(|user_id, kind, message| {
                *user_id == 3 && kind == "listing_status" && message.contains("approved")
            })
            .times(1)
            .returning(|user_id, kind, message| {
                Ok(domains::StoredNotification {
                    id: 1,
                    user_id,
                    kind: kind.to_string(),
                    message: message.to_string(),
                    is_read: false,
                    created_at: Utc::now(),
                })
            });

        let service =
            PropertyService::new(Arc::new(properties), Arc::new(MockMediaStore::new()), Arc::new(inbox));
        service.moderate(42, PropertyStatus::Approved).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_next_without_pending_is_not_found() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_oldest_pending().returning(|| Ok(None));
        let service = PropertyService::new(
            Arc::new(properties),
            Arc::new(MockMediaStore::new()),
            Arc::new(MockNotificationRepository::new()),
        );

        assert!(matches!(
            service.approve_next_pending().await,
            Err(DomainError::NotFound(_, _))
        ));
    }
}
