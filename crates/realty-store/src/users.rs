//! Registration, authentication and profile operations for [`User`] records.

use rusqlite::{params, OptionalExtension};

use realty_shared::validation;
use realty_shared::{Gender, UserId, UserType, ValidationError};

use crate::database::{enum_from_sql, now_ts, ts_from_sql, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::{NewUser, ProfileUpdate, User, UserSummary};
use crate::password;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, user_type, phone, bio, gender, date_joined";

/// Column list for [`summary_from_row`], qualified with the `u` alias.
pub(crate) const SUMMARY_COLUMNS: &str = "u.id, u.username, u.first_name, u.last_name, u.user_type";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Validate a registration form and insert the user.
    ///
    /// All field errors are collected before failing, including username
    /// and email uniqueness.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let password_hash = password::hash_password(&new.password1)?;
        self.insert_user(new, &password_hash)
    }

    /// [`Database::create_user`] with the password already hashed by
    /// [`password::hash_password`], so callers can hash without holding the
    /// connection. The form is validated in full, password rules included.
    pub fn insert_user(&self, new: &NewUser, password_hash: &str) -> Result<User> {
        let username = new.username.trim();
        let email = new.email.trim();
        let first_name = new.first_name.trim();
        let last_name = new.last_name.trim();
        let phone = new.phone.trim();

        let mut errors = ValidationError::new();
        validation::check_username(username, &mut errors);
        if !errors.has("username") && self.username_exists(username)? {
            errors.add("username", "This username is already taken");
        }
        validation::check_email(email, &mut errors);
        if !errors.has("email") && self.email_exists(email)? {
            errors.add("email", "This email is already in use");
        }
        validation::check_name("first_name", first_name, &mut errors);
        validation::check_name("last_name", last_name, &mut errors);
        validation::check_password(&new.password1, &new.password2, &mut errors);
        validation::check_phone(phone, &mut errors);
        errors.into_result()?;

        let date_joined = now_ts();

        self.conn().execute(
            "INSERT INTO users (username, email, first_name, last_name, user_type,
                                phone, bio, gender, password_hash, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                username,
                email,
                first_name,
                last_name,
                new.user_type.as_str(),
                phone,
                new.bio,
                new.gender.map(|g| g.as_str()),
                password_hash,
                ts_to_sql(&date_joined),
            ],
        )?;
        let id = UserId(self.conn().last_insert_rowid());

        tracing::info!(user_id = %id, username, user_type = new.user_type.as_str(), "user registered");

        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            user_type: new.user_type,
            phone: phone.to_string(),
            bio: new.bio.clone(),
            gender: new.gender,
            date_joined,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        let exists = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![username],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let exists = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool> {
        let exists = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.0],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    /// Check credentials. Unknown usernames are `NotFound`, a wrong password
    /// is `Forbidden`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let (user, hash) = self.credentials(username)?;
        if !password::verify_password(password, &hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(StoreError::Forbidden("invalid credentials".into()));
        }
        Ok(user)
    }

    /// The user and their stored PHC hash, for verification outside the
    /// connection. Unknown usernames are `NotFound`.
    pub fn credentials(&self, username: &str) -> Result<(User, String)> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"),
                params![username.trim()],
                |row| Ok((row_to_user(row)?, row.get::<_, String>(10)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Everyone except `user`, for the "choose recipient" screen.
    pub fn list_users_except(&self, user: UserId) -> Result<Vec<UserSummary>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM users u WHERE u.id <> ?1 ORDER BY u.username ASC"
        ))?;
        let rows = stmt.query_map(params![user.0], |row| summary_from_row(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn count_users(&self, user_type: Option<UserType>) -> Result<u64> {
        let count: i64 = match user_type {
            Some(t) => self.conn().query_row(
                "SELECT COUNT(*) FROM users WHERE user_type = ?1",
                params![t.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn()
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    pub fn update_profile(&self, user: UserId, update: &ProfileUpdate) -> Result<User> {
        let email = update.email.trim();
        let first_name = update.first_name.trim();
        let last_name = update.last_name.trim();
        let phone = update.phone.trim();

        let mut errors = ValidationError::new();
        validation::check_email(email, &mut errors);
        if !errors.has("email") {
            let taken: bool = self.conn().query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id <> ?2)",
                params![email, user.0],
                |row| row.get(0),
            )?;
            if taken {
                errors.add("email", "This email is already in use");
            }
        }
        validation::check_name("first_name", first_name, &mut errors);
        validation::check_name("last_name", last_name, &mut errors);
        validation::check_phone(phone, &mut errors);
        errors.into_result()?;

        let affected = self.conn().execute(
            "UPDATE users
             SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, bio = ?5, gender = ?6
             WHERE id = ?7",
            params![
                first_name,
                last_name,
                email,
                phone,
                update.bio,
                update.gender.map(|g| g.as_str()),
                user.0,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::info!(user_id = %user, "profile updated");
        self.get_user(user)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let user_type: String = row.get(5)?;
    let gender: Option<String> = row.get(8)?;
    let joined: String = row.get(9)?;

    Ok(User {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        user_type: enum_from_sql(5, &user_type, UserType::parse)?,
        phone: row.get(6)?,
        bio: row.get(7)?,
        gender: gender
            .map(|g| enum_from_sql(8, &g, Gender::parse))
            .transpose()?,
        date_joined: ts_from_sql(9, &joined)?,
    })
}

/// Read [`SUMMARY_COLUMNS`] starting at column `offset`.
pub(crate) fn summary_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<UserSummary> {
    let user_type: String = row.get(offset + 4)?;
    Ok(UserSummary {
        id: UserId(row.get(offset)?),
        username: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        last_name: row.get(offset + 3)?,
        user_type: enum_from_sql(offset + 4, &user_type, UserType::parse)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, test_db};

    #[test]
    fn test_register_and_authenticate() {
        let (db, _dir) = test_db();
        let user = db.create_user(&new_user("alice")).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(db.get_user(user.id).unwrap(), user);
        assert!(db.username_exists("alice").unwrap());
        assert!(db.email_exists("alice@example.com").unwrap());

        let authed = db.authenticate("alice", "secret1").unwrap();
        assert_eq!(authed.id, user.id);
        assert!(matches!(
            db.authenticate("alice", "wrong1"),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            db.authenticate("nobody", "secret1"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn test_prehashed_insert_and_credentials() {
        let (db, _dir) = test_db();
        let hash = password::hash_password("secret1").unwrap();
        let user = db.insert_user(&new_user("alice"), &hash).unwrap();

        let (found, stored) = db.credentials(" alice ").unwrap();
        assert_eq!(found, user);
        assert_eq!(stored, hash);
        assert!(password::verify_password("secret1", &stored).unwrap());
        assert_eq!(db.authenticate("alice", "secret1").unwrap().id, user.id);
        assert!(matches!(db.credentials("nobody"), Err(StoreError::NotFound)));

        // The hash does not stand in for the form's password rules.
        let mut form = new_user("bob");
        form.password2 = "other1".into();
        let Err(StoreError::Validation(errors)) = db.insert_user(&form, &hash) else {
            panic!("expected validation error");
        };
        assert!(errors.has("password2"));
        assert!(!db.username_exists("bob").unwrap());
    }

    #[test]
    fn test_register_collects_all_errors() {
        let (db, _dir) = test_db();
        db.create_user(&new_user("alice")).unwrap();

        let mut form = new_user("alice");
        form.first_name = "  ".into();
        form.password1 = "abc".into();
        form.password2 = "abd".into();
        form.phone = "call me".into();

        let Err(StoreError::Validation(errors)) = db.create_user(&form) else {
            panic!("expected validation error");
        };
        for field in ["username", "email", "first_name", "password1", "password2", "phone"] {
            assert!(errors.has(field), "missing error for {field}");
        }
        assert_eq!(db.count_users(None).unwrap(), 1);
    }

    #[test]
    fn test_update_profile() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        let mut update = ProfileUpdate {
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            email: "alice@example.com".into(),
            phone: "+44 20 7946 0000".into(),
            bio: "Selling flats since 2010".into(),
            gender: Some(Gender::Female),
        };
        let updated = db.update_profile(alice.id, &update).unwrap();
        assert_eq!(updated.last_name, "Liddell");
        assert_eq!(updated.gender, Some(Gender::Female));

        update.email = bob.email.clone();
        assert!(matches!(
            db.update_profile(alice.id, &update),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_list_users_except_and_counts() {
        let (db, _dir) = test_db();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let mut realtor = new_user("rita");
        realtor.user_type = UserType::Realtor;
        db.create_user(&realtor).unwrap();

        let others = db.list_users_except(alice.id).unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].username, "rita");

        assert_eq!(db.count_users(None).unwrap(), 2);
        assert_eq!(db.count_users(Some(UserType::Realtor)).unwrap(), 1);
    }
}
