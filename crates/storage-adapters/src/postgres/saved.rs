use async_trait::async_trait;

use domains::{PropertyId, Result, SavedListing, SavedPropertyRepository, UserId};

use super::{col, db_err, property_from_row, PgStore};

#[async_trait]
impl SavedPropertyRepository for PgStore {
    async fn exists(&self, user_id: UserId, property_id: PropertyId) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM saved_properties WHERE user_id = $1 AND property_id = $2)",
        )
        .bind(user_id)
        .bind(property_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn save(&self, user_id: UserId, property_id: PropertyId) -> Result<()> {
        sqlx::query("INSERT INTO saved_properties (user_id, property_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn remove(&self, user_id: UserId, property_id: PropertyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_properties WHERE user_id = $1 AND property_id = $2")
            .bind(user_id)
            .bind(property_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<SavedListing>> {
        sqlx::query(
            "SELECT s.id AS saved_id, p.id, p.seller_id, p.title, p.description, p.price, p.location, \
             p.property_type, p.bedrooms, p.bathrooms, p.square_feet, p.status, p.created_at, \
             COALESCE(ARRAY_AGG(i.image_url ORDER BY i.id) FILTER (WHERE i.id IS NOT NULL), '{}') AS images \
             FROM saved_properties s \
             JOIN properties p ON p.id = s.property_id \
             LEFT JOIN property_images i ON i.property_id = p.id \
             WHERE s.user_id = $1 \
             GROUP BY s.id, p.id \
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            Ok(SavedListing {
                saved_id: col(row, "saved_id")?,
                property: property_from_row(row)?,
            })
        })
        .collect()
    }

    async fn count(&self, user_id: UserId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM saved_properties WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
