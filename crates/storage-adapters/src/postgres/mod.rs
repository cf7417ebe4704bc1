//! # PostgreSQL repositories
//!
//! Runtime-checked queries with explicit row mapping, so the crate builds
//! without a live database. Every repository port is implemented on the one
//! [`PgStore`] handle; the per-table impls live in the submodules.

mod bookings;
mod messages;
mod notifications;
mod properties;
mod saved;
mod users;

use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Decode, Postgres, Row, Type};
use tracing::info;

use domains::{DomainError, Property, PropertyId, Result, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps driver errors into the domain taxonomy. Unique violations on the
/// constraints the domain cares about become `Conflict`.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("users_email_unique") => "Email already registered",
                Some("saved_properties_unique") => "Property already saved",
                _ => "Duplicate record",
            };
            return DomainError::Conflict(message.into());
        }
    }
    DomainError::persistence(err)
}

/// Like [`db_err`], but a booking whose listing vanished after the owner
/// lookup reports the listing as missing.
pub(crate) fn booking_insert_err(property_id: PropertyId) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |err| {
        let missing = err
            .as_database_error()
            .is_some_and(|db| is_missing_property(db.is_foreign_key_violation(), db.constraint()));
        if missing {
            DomainError::not_found("Property", property_id)
        } else {
            db_err(err)
        }
    }
}

fn is_missing_property(foreign_key_violation: bool, constraint: Option<&str>) -> bool {
    foreign_key_violation && constraint == Some(BOOKINGS_PROPERTY_FK)
}

/// Postgres' default name for `bookings.property_id REFERENCES properties`.
const BOOKINGS_PROPERTY_FK: &str = "bookings_property_id_fkey";

pub(crate) fn col<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name).map_err(db_err)
}

pub(crate) const USER_COLUMNS: &str = "id, username, email, password_hash, user_type, status, \
     first_name, last_name, phone_number, created_at";

pub(crate) fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: col(row, "id")?,
        username: col(row, "username")?,
        email: col(row, "email")?,
        password_hash: col(row, "password_hash")?,
        role: col::<String>(row, "user_type")?.parse()?,
        status: col::<String>(row, "status")?.parse()?,
        first_name: col(row, "first_name")?,
        last_name: col(row, "last_name")?,
        phone_number: col(row, "phone_number")?,
        created_at: col(row, "created_at")?,
    })
}

/// Listing columns plus the aggregated image URLs. Callers append their own
/// WHERE clause and must `GROUP BY p.id`.
pub(crate) const PROPERTY_SELECT: &str = "SELECT p.id, p.seller_id, p.title, p.description, \
     p.price, p.location, p.property_type, p.bedrooms, p.bathrooms, p.square_feet, p.status, \
     p.created_at, \
     COALESCE(ARRAY_AGG(i.image_url ORDER BY i.id) FILTER (WHERE i.id IS NOT NULL), '{}') AS images \
     FROM properties p LEFT JOIN property_images i ON i.property_id = p.id";

pub(crate) fn property_from_row(row: &PgRow) -> Result<Property> {
    Ok(Property {
        id: col(row, "id")?,
        seller_id: col(row, "seller_id")?,
        title: col(row, "title")?,
        description: col(row, "description")?,
        price: col(row, "price")?,
        location: col(row, "location")?,
        property_type: col(row, "property_type")?,
        bedrooms: col(row, "bedrooms")?,
        bathrooms: col(row, "bathrooms")?,
        square_feet: col(row, "square_feet")?,
        status: col::<String>(row, "status")?.parse()?,
        created_at: col(row, "created_at")?,
        images: col(row, "images")?,
    })
}
