use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use domains::{
    Property, PropertyDraft, PropertyFilter, PropertyId, PropertyRepository, PropertyStatus,
    Result, UserId,
};

use super::{col, db_err, property_from_row, PgStore, PROPERTY_SELECT};

const NEWEST_FIRST: &str = " GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC";

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl PgStore {
    async fn insert_images(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        property_id: PropertyId,
        images: &[String],
    ) -> Result<()> {
        for url in images {
            sqlx::query("INSERT INTO property_images (property_id, image_url) VALUES ($1, $2)")
                .bind(property_id)
                .bind(url)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn fetch_properties(&self, mut query: QueryBuilder<'_, Postgres>) -> Result<Vec<Property>> {
        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(property_from_row)
            .collect()
    }

    async fn require_property(&self, id: PropertyId) -> Result<Property> {
        PropertyRepository::find_by_id(self, id)
            .await?
            .ok_or_else(|| domains::DomainError::persistence(format!("listing {id} vanished after write")))
    }
}

#[async_trait]
impl PropertyRepository for PgStore {
    async fn create(&self, seller_id: UserId, draft: PropertyDraft, images: Vec<String>) -> Result<Property> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id: PropertyId = sqlx::query_scalar(
            "INSERT INTO properties (seller_id, title, description, price, location, property_type, \
             bedrooms, bathrooms, square_feet, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(seller_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.location)
        .bind(&draft.property_type)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.square_feet)
        .bind(PropertyStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        Self::insert_images(&mut tx, id, &images).await?;
        tx.commit().await.map_err(db_err)?;

        self.require_property(id).await
    }

    async fn find_by_id(&self, id: PropertyId) -> Result<Option<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(" WHERE p.id = ").push_bind(id).push(" GROUP BY p.id");
        Ok(self.fetch_properties(query).await?.into_iter().next())
    }

    async fn owner_of(&self, id: PropertyId) -> Result<Option<UserId>> {
        sqlx::query_scalar("SELECT seller_id FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_owned(
        &self,
        id: PropertyId,
        seller_id: UserId,
        draft: PropertyDraft,
        new_images: Vec<String>,
    ) -> Result<Option<Property>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let updated = sqlx::query(
            "UPDATE properties SET title = $3, description = $4, price = $5, location = $6, \
             property_type = $7, bedrooms = $8, bathrooms = $9, square_feet = $10 \
             WHERE id = $1 AND seller_id = $2",
        )
        .bind(id)
        .bind(seller_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.location)
        .bind(&draft.property_type)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.square_feet)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }

        Self::insert_images(&mut tx, id, &new_images).await?;
        tx.commit().await.map_err(db_err)?;

        self.require_property(id).await.map(Some)
    }

    async fn delete(&self, id: PropertyId, owner: Option<UserId>) -> Result<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Image rows go with the listing (ON DELETE CASCADE), so read them first.
        let images: Vec<String> =
            sqlx::query_scalar("SELECT image_url FROM property_images WHERE property_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_err)?;

        let deleted = sqlx::query("DELETE FROM properties WHERE id = $1 AND ($2::BIGINT IS NULL OR seller_id = $2)")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        }
        tx.commit().await.map_err(db_err)?;
        Ok(Some(images))
    }

    async fn list_all(&self) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(NEWEST_FIRST);
        self.fetch_properties(query).await
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(" WHERE p.seller_id = ").push_bind(seller_id).push(NEWEST_FIRST);
        self.fetch_properties(query).await
    }

    async fn list_by_status(&self, status: PropertyStatus, limit: Option<i64>) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(" WHERE p.status = ").push_bind(status.as_str()).push(NEWEST_FIRST);
        if let Some(limit) = limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        self.fetch_properties(query).await
    }

    async fn filter(&self, filter: PropertyFilter) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(" WHERE TRUE");
        if let Some(location) = filter.location.as_deref() {
            query.push(" AND p.location ILIKE ").push_bind(like_pattern(location));
        }
        if let Some(property_type) = filter.property_type {
            query.push(" AND p.property_type = ").push_bind(property_type);
        }
        if let Some(bedrooms) = filter.bedrooms {
            query.push(" AND p.bedrooms = ").push_bind(bedrooms);
        }
        if let Some(bathrooms) = filter.bathrooms {
            query.push(" AND p.bathrooms = ").push_bind(bathrooms);
        }
        query.push(NEWEST_FIRST);
        self.fetch_properties(query).await
    }

    async fn set_status(&self, id: PropertyId, status: PropertyStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE properties SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_by_status(&self, status: PropertyStatus, seller_id: Option<UserId>) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM properties WHERE status = $1 AND ($2::BIGINT IS NULL OR seller_id = $2)",
        )
        .bind(status.as_str())
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn oldest_pending(&self) -> Result<Option<PropertyId>> {
        let row = sqlx::query(
            "SELECT id FROM properties WHERE status = $1 ORDER BY created_at ASC, id ASC LIMIT 1",
        )
        .bind(PropertyStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(|row| col(row, "id")).transpose()
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Property>> {
        let mut query = QueryBuilder::new(PROPERTY_SELECT);
        query.push(NEWEST_FIRST).push(" LIMIT ").push_bind(limit);
        self.fetch_properties(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Dhaka"), "%Dhaka%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
