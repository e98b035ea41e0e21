use tempfile::TempDir;

use realty_shared::{PropertyStatus, PropertyType, UserType};

use crate::database::Database;
use crate::models::{NewUser, PropertyForm};

/// Fresh on-disk database; keep the `TempDir` alive for the test's duration.
pub(crate) fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db")).unwrap();
    (db, dir)
}

/// Valid registration form; the password is always `secret1`.
pub(crate) fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: "Test".into(),
        last_name: "User".into(),
        user_type: UserType::Client,
        gender: None,
        phone: String::new(),
        bio: String::new(),
        password1: "secret1".into(),
        password2: "secret1".into(),
    }
}

pub(crate) fn property_form(title: &str, price: i64) -> PropertyForm {
    PropertyForm {
        title: title.to_string(),
        description: "Bright, quiet, close to transport".into(),
        price,
        property_type: PropertyType::Apartment,
        area: 54.5,
        rooms: None,
        location: "12 Central Street".into(),
        status: PropertyStatus::Active,
    }
}
