//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the HTTP
//! layer as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use realty_shared::{
    CommentId, Gender, ImageId, MessageId, PropertyId, PropertySort, PropertyStatus,
    PropertyType, UserId, UserType,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub phone: String,
    pub bio: String,
    pub gender: Option<Gender>,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user, embedded in dialogues, comments and listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            user_type: u.user_type,
        }
    }
}

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: String,
    pub password1: String,
    pub password2: String,
}

/// Editable profile fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub gender: Option<Gender>,
}

// ---------------------------------------------------------------------------
// Property
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    pub property_type: PropertyType,
    /// Square metres.
    pub area: f64,
    pub rooms: Option<i64>,
    pub location: String,
    pub created_by: UserId,
    pub status: PropertyStatus,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create / edit form for a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyForm {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub property_type: PropertyType,
    pub area: f64,
    #[serde(default)]
    pub rooms: Option<i64>,
    pub location: String,
    #[serde(default)]
    pub status: PropertyStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PropertyImage {
    pub id: ImageId,
    pub property_id: PropertyId,
    pub image_path: String,
    pub is_main: bool,
}

/// Search-result row: the listing plus its main image.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertyCard {
    #[serde(flatten)]
    pub property: Property,
    pub main_image: Option<String>,
}

/// Search filters. `None` means "do not filter on this".
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub property_type: Option<PropertyType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub rooms: Option<i64>,
    pub search: Option<String>,
    pub sort: PropertySort,
    /// 1-based page number.
    pub page: u32,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Counters shown on the home page.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SiteStats {
    pub properties_count: u64,
    pub users_count: u64,
    pub realtors_count: u64,
    pub sold_count: u64,
    pub featured: Vec<PropertyCard>,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub property_id: PropertyId,
    pub author: UserSummary,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

/// A directed message between two users.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Conversation with one counterparty, seen from the listing user's side.
/// Derived on every read; never stored.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Dialogue {
    pub counterparty: UserSummary,
    pub last_message: Message,
    pub unread_count: u64,
}

/// `user_id` blocks `blocked_user_id`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub id: i64,
    pub user_id: UserId,
    pub blocked_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Result of a block request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BlockOutcome {
    pub entry: BlacklistEntry,
    /// `false` when the entry already existed.
    pub created: bool,
    /// Messages from the blocked user that were deleted.
    pub purged: usize,
}
