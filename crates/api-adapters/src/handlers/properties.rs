//! Listing endpoints shared by sellers, buyers and admins.

use axum::extract::{Multipart, Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;

use domains::{Property, PropertyFilter, PropertyId};

use crate::auth::{AdminUser, CurrentUser, SellerUser};
use crate::error::ApiError;
use crate::extract::PathParam;
use crate::multipart::read_property_form;
use crate::state::AppState;

/// Query string of the filter endpoint. The search form submits every field,
/// so blanks mean "any".
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub location: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn count_param(name: &str, value: Option<String>) -> Result<Option<i32>, ApiError> {
    non_blank(value)
        .map(|v| {
            v.parse()
                .map_err(|_| ApiError::bad_request(format!("{name} must be a whole number")))
        })
        .transpose()
}

impl TryFrom<FilterQuery> for PropertyFilter {
    type Error = ApiError;

    fn try_from(query: FilterQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            location: non_blank(query.location),
            property_type: non_blank(query.property_type),
            bedrooms: count_param("bedrooms", query.bedrooms)?,
            bathrooms: count_param("bathrooms", query.bathrooms)?,
        })
    }
}

pub async fn create(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let form = read_property_form(multipart, state.web.max_images).await?;
    state.properties.create(seller.id(), form.draft, form.images).await?;
    Ok(Redirect::to("/dashboard"))
}

pub async fn update(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    PathParam(id): PathParam<PropertyId>,
    multipart: Multipart,
) -> Result<&'static str, ApiError> {
    let form = read_property_form(multipart, state.web.max_images).await?;
    state.properties.update(id, seller.id(), form.draft, form.images).await?;
    Ok("Property updated successfully")
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParam(id): PathParam<PropertyId>,
) -> Result<&'static str, ApiError> {
    state.properties.delete(id, &user.user).await?;
    Ok("Property deleted successfully.")
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    PathParam(id): PathParam<PropertyId>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(state.properties.get(id).await?))
}

pub async fn list_mine(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_for_seller(seller.id()).await?))
}

pub async fn list_all(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_all().await?))
}

/// Admin listing overview; same rows as `list_all`, admin only.
pub async fn list_for_admin(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_all().await?))
}

pub async fn featured(State(state): State<AppState>) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.featured().await?))
}

pub async fn filter(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let filter = PropertyFilter::try_from(query)?;
    Ok(Json(state.properties.search(filter).await?))
}
