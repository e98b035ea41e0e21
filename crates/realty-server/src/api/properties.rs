//! Listings: search, detail, owner edits and comments.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use realty_shared::{PropertyId, PropertySort, PropertyStatus, PropertyType};
use realty_store::{
    Comment, Page, Property, PropertyCard, PropertyFilter, PropertyForm, PropertyImage,
    UserSummary,
};

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;

/// Raw search parameters. Values that do not parse are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    property_type: Option<String>,
    min_price: Option<String>,
    max_price: Option<String>,
    rooms: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    page: Option<String>,
}

impl SearchQuery {
    fn into_filter(self) -> PropertyFilter {
        fn number(raw: Option<String>) -> Option<i64> {
            raw.and_then(|v| v.trim().parse().ok())
        }

        PropertyFilter {
            property_type: self.property_type.as_deref().and_then(PropertyType::parse),
            min_price: number(self.min_price),
            max_price: number(self.max_price),
            rooms: number(self.rooms),
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort: self
                .sort
                .as_deref()
                .and_then(PropertySort::parse)
                .unwrap_or_default(),
            page: self
                .page
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(1),
        }
    }
}

#[derive(Deserialize)]
pub struct PropertyRequest {
    #[serde(flatten)]
    form: PropertyForm,
    /// Paths of images already stored by the uploader.
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    text: String,
}

#[derive(Serialize)]
pub struct PropertyDetail {
    property: Property,
    owner: UserSummary,
    images: Vec<PropertyImage>,
    comments: Vec<Comment>,
}

#[derive(Serialize)]
pub struct PropertySaved {
    success: bool,
    property: Property,
    images: Vec<PropertyImage>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<PropertyCard>>, ServerError> {
    let filter = query.into_filter();
    let page = state.db.lock().await.list_properties(&filter)?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<PropertyRequest>,
) -> Result<(StatusCode, Json<PropertySaved>), ServerError> {
    let db = state.db.lock().await;
    let property = db.create_property(current.user.id, &req.form, &req.images)?;
    let images = db.images_for_property(property.id)?;
    Ok((
        StatusCode::CREATED,
        Json(PropertySaved {
            success: true,
            property,
            images,
        }),
    ))
}

/// Public detail page; every visit counts as a view.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<PropertyId>,
) -> Result<Json<PropertyDetail>, ServerError> {
    let db = state.db.lock().await;
    let property = db.record_view(id)?;
    let owner = UserSummary::from(&db.get_user(property.created_by)?);
    let images = db.images_for_property(id)?;
    let comments = db.comments_for_property(id)?;
    Ok(Json(PropertyDetail {
        property,
        owner,
        images,
        comments,
    }))
}

pub async fn edit(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<PropertyId>,
    Json(req): Json<PropertyRequest>,
) -> Result<Json<PropertySaved>, ServerError> {
    let db = state.db.lock().await;
    let property = db.update_property(current.user.id, id, &req.form, &req.images)?;
    let images = db.images_for_property(id)?;
    Ok(Json(PropertySaved {
        success: true,
        property,
        images,
    }))
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<PropertyId>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.db.lock().await.delete_property(current.user.id, id)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn mark_sold(
    state: State<AppState>,
    current: CurrentUser,
    id: Path<PropertyId>,
) -> Result<Json<Property>, ServerError> {
    change_status(state, current, id, PropertyStatus::Sold).await
}

pub async fn hide(
    state: State<AppState>,
    current: CurrentUser,
    id: Path<PropertyId>,
) -> Result<Json<Property>, ServerError> {
    change_status(state, current, id, PropertyStatus::Hidden).await
}

pub async fn reactivate(
    state: State<AppState>,
    current: CurrentUser,
    id: Path<PropertyId>,
) -> Result<Json<Property>, ServerError> {
    change_status(state, current, id, PropertyStatus::Active).await
}

async fn change_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<PropertyId>,
    status: PropertyStatus,
) -> Result<Json<Property>, ServerError> {
    let property = state
        .db
        .lock()
        .await
        .set_property_status(current.user.id, id, status)?;
    Ok(Json(property))
}

pub async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<PropertyId>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ServerError> {
    let comment = state
        .db
        .lock()
        .await
        .add_comment(current.user.id, id, &req.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
