//! Listings, their image galleries, and the filtered search.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};

use realty_shared::constants::{HOME_FEATURED_COUNT, PROPERTIES_PER_PAGE};
use realty_shared::validation;
use realty_shared::{
    ImageId, PropertyId, PropertySort, PropertyStatus, PropertyType, UserId, UserType,
    ValidationError,
};

use crate::database::{enum_from_sql, now_ts, ts_from_sql, ts_to_sql, Database};
use crate::error::{Result, StoreError};
use crate::models::{
    Page, Property, PropertyCard, PropertyFilter, PropertyForm, PropertyImage, SiteStats,
};

const PROPERTY_COLUMNS: &str = "p.id, p.title, p.description, p.price, p.property_type, p.area, \
     p.rooms, p.location, p.created_by, p.status, p.views, p.created_at, p.updated_at";

const MAIN_IMAGE_COLUMN: &str = "(SELECT i.image_path FROM property_images i \
     WHERE i.property_id = p.id AND i.is_main = 1 ORDER BY i.id LIMIT 1)";

/// Trimmed text fields of a form that passed validation.
struct CleanForm {
    title: String,
    description: String,
    location: String,
}

fn clean_form(form: &PropertyForm) -> Result<CleanForm> {
    let mut errors = ValidationError::new();
    let title = validation::check_title(&form.title, &mut errors);
    let description = validation::required_text("description", &form.description, None, &mut errors);
    let location = validation::check_location(&form.location, &mut errors);
    if form.price < 0 {
        errors.add("price", "Price cannot be negative");
    }
    if !form.area.is_finite() || form.area <= 0.0 {
        errors.add("area", "Area must be a positive number");
    }
    if matches!(form.rooms, Some(r) if r < 0) {
        errors.add("rooms", "Rooms cannot be negative");
    }
    errors.into_result()?;

    Ok(CleanForm {
        title,
        description,
        location,
    })
}

fn sort_clause(sort: PropertySort) -> &'static str {
    match sort {
        PropertySort::PriceAsc => "p.price ASC, p.id ASC",
        PropertySort::PriceDesc => "p.price DESC, p.id DESC",
        PropertySort::CreatedAsc => "p.created_at ASC, p.id ASC",
        PropertySort::CreatedDesc => "p.created_at DESC, p.id DESC",
        PropertySort::ViewsAsc => "p.views ASC, p.id ASC",
        PropertySort::ViewsDesc => "p.views DESC, p.id DESC",
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a listing owned by `owner`. The first image becomes the main one.
    pub fn create_property(
        &self,
        owner: UserId,
        form: &PropertyForm,
        image_paths: &[String],
    ) -> Result<Property> {
        let clean = clean_form(form)?;
        let now = now_ts();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO properties (title, description, price, property_type, area, rooms,
                                     location, created_by, status, views, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
            params![
                clean.title,
                clean.description,
                form.price,
                form.property_type.as_str(),
                form.area,
                form.rooms,
                clean.location,
                owner.0,
                form.status.as_str(),
                ts_to_sql(&now),
            ],
        )?;
        let id = PropertyId(tx.last_insert_rowid());
        insert_images(&tx, id, image_paths, true)?;
        tx.commit()?;

        tracing::info!(property_id = %id, owner = %owner, images = image_paths.len(), "property created");

        Ok(Property {
            id,
            title: clean.title,
            description: clean.description,
            price: form.price,
            property_type: form.property_type,
            area: form.area,
            rooms: form.rooms,
            location: clean.location,
            created_by: owner,
            status: form.status,
            views: 0,
            created_at: now,
            updated_at: now,
        })
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_property(&self, id: PropertyId) -> Result<Property> {
        self.conn()
            .query_row(
                &format!("SELECT {PROPERTY_COLUMNS} FROM properties p WHERE p.id = ?1"),
                params![id.0],
                row_to_property,
            )
            .map_err(StoreError::from_query)
    }

    /// Bump the view counter and return the updated listing.
    pub fn record_view(&self, id: PropertyId) -> Result<Property> {
        let affected = self.conn().execute(
            "UPDATE properties SET views = views + 1 WHERE id = ?1",
            params![id.0],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_property(id)
    }

    /// Main image first, then upload order.
    pub fn images_for_property(&self, id: PropertyId) -> Result<Vec<PropertyImage>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, property_id, image_path, is_main
             FROM property_images
             WHERE property_id = ?1
             ORDER BY is_main DESC, id ASC",
        )?;
        let rows = stmt.query_map(params![id.0], |row| {
            Ok(PropertyImage {
                id: ImageId(row.get(0)?),
                property_id: PropertyId(row.get(1)?),
                image_path: row.get(2)?,
                is_main: row.get(3)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Active listings matching `filter`, one page at a time.
    ///
    /// Page numbers below 1 read page 1; numbers past the end read the last
    /// page.
    pub fn list_properties(&self, filter: &PropertyFilter) -> Result<Page<PropertyCard>> {
        let mut clauses = vec!["p.status = ?".to_string()];
        let mut values = vec![Value::Text(PropertyStatus::Active.as_str().to_string())];

        if let Some(t) = filter.property_type {
            clauses.push("p.property_type = ?".into());
            values.push(Value::Text(t.as_str().to_string()));
        }
        if let Some(min) = filter.min_price {
            clauses.push("p.price >= ?".into());
            values.push(Value::Integer(min));
        }
        if let Some(max) = filter.max_price {
            clauses.push("p.price <= ?".into());
            values.push(Value::Integer(max));
        }
        if let Some(rooms) = filter.rooms {
            clauses.push("p.rooms = ?".into());
            values.push(Value::Integer(rooms));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push(
                "(casefold(p.title) LIKE ? ESCAPE '\\' \
                 OR casefold(p.description) LIKE ? ESCAPE '\\' \
                 OR casefold(p.location) LIKE ? ESCAPE '\\')"
                    .into(),
            );
            let pattern = like_pattern(&search.to_lowercase());
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }
        let where_sql = clauses.join(" AND ");

        let total_items: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM properties p WHERE {where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        let total_items = total_items as u64;

        let per_page = u64::from(PROPERTIES_PER_PAGE);
        let total_pages = total_items.div_ceil(per_page).max(1) as u32;
        let number = filter.page.clamp(1, total_pages);

        let items = self.query_cards(
            &where_sql,
            values,
            sort_clause(filter.sort),
            PROPERTIES_PER_PAGE,
            (number - 1) * PROPERTIES_PER_PAGE,
        )?;

        tracing::debug!(total_items, page = number, "property search");

        Ok(Page {
            items,
            number,
            total_pages,
            total_items,
            has_next: number < total_pages,
            has_previous: number > 1,
        })
    }

    /// All of `owner`'s listings regardless of status, newest first.
    pub fn properties_for_owner(&self, owner: UserId) -> Result<Vec<PropertyCard>> {
        self.query_cards(
            "p.created_by = ?",
            vec![Value::Integer(owner.0)],
            sort_clause(PropertySort::CreatedDesc),
            u32::MAX,
            0,
        )
    }

    /// Home page counters plus the newest active listings.
    pub fn site_stats(&self) -> Result<SiteStats> {
        let featured = self.query_cards(
            "p.status = ?",
            vec![Value::Text(PropertyStatus::Active.as_str().to_string())],
            sort_clause(PropertySort::CreatedDesc),
            HOME_FEATURED_COUNT,
            0,
        )?;

        Ok(SiteStats {
            properties_count: self.count_properties(PropertyStatus::Active)?,
            users_count: self.count_users(None)?,
            realtors_count: self.count_users(Some(UserType::Realtor))?,
            sold_count: self.count_properties(PropertyStatus::Sold)?,
            featured,
        })
    }

    pub fn count_properties(&self, status: PropertyStatus) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM properties WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn query_cards(
        &self,
        where_sql: &str,
        mut values: Vec<Value>,
        order_sql: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PropertyCard>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS}, {MAIN_IMAGE_COLUMN}
             FROM properties p
             WHERE {where_sql}
             ORDER BY {order_sql}
             LIMIT ? OFFSET ?"
        );
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(i64::from(offset)));

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(PropertyCard {
                property: row_to_property(row)?,
                main_image: row.get(13)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Edit a listing owned by `owner` and append `new_images`.
    ///
    /// A listing that belongs to someone else is reported as `NotFound`.
    pub fn update_property(
        &self,
        owner: UserId,
        id: PropertyId,
        form: &PropertyForm,
        new_images: &[String],
    ) -> Result<Property> {
        let clean = clean_form(form)?;
        self.ensure_owner(owner, id)?;

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "UPDATE properties
             SET title = ?1, description = ?2, price = ?3, property_type = ?4, area = ?5,
                 rooms = ?6, location = ?7, status = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                clean.title,
                clean.description,
                form.price,
                form.property_type.as_str(),
                form.area,
                form.rooms,
                clean.location,
                form.status.as_str(),
                ts_to_sql(&now_ts()),
                id.0,
            ],
        )?;
        let has_main: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM property_images WHERE property_id = ?1 AND is_main = 1)",
            params![id.0],
            |row| row.get(0),
        )?;
        insert_images(&tx, id, new_images, !has_main)?;
        tx.commit()?;

        tracing::info!(property_id = %id, added_images = new_images.len(), "property updated");
        self.get_property(id)
    }

    pub fn set_property_status(
        &self,
        owner: UserId,
        id: PropertyId,
        status: PropertyStatus,
    ) -> Result<Property> {
        let affected = self.conn().execute(
            "UPDATE properties SET status = ?1, updated_at = ?2 WHERE id = ?3 AND created_by = ?4",
            params![status.as_str(), ts_to_sql(&now_ts()), id.0, owner.0],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::info!(property_id = %id, status = status.as_str(), "property status changed");
        self.get_property(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    // ON DELETE CASCADE: images + comments go with it
    pub fn delete_property(&self, owner: UserId, id: PropertyId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM properties WHERE id = ?1 AND created_by = ?2",
            params![id.0, owner.0],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(property_id = %id, "property deleted");
        Ok(())
    }

    fn ensure_owner(&self, owner: UserId, id: PropertyId) -> Result<()> {
        let owned: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM properties WHERE id = ?1 AND created_by = ?2)",
            params![id.0, owner.0],
            |row| row.get(0),
        )?;
        if owned {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_images(
    conn: &rusqlite::Connection,
    property: PropertyId,
    paths: &[String],
    first_is_main: bool,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO property_images (property_id, image_path, is_main) VALUES (?1, ?2, ?3)",
    )?;
    for (i, path) in paths.iter().enumerate() {
        stmt.execute(params![property.0, path, first_is_main && i == 0])?;
    }
    Ok(())
}

fn row_to_property(row: &rusqlite::Row<'_>) -> rusqlite::Result<Property> {
    let property_type: String = row.get(4)?;
    let status: String = row.get(9)?;
    let created: String = row.get(11)?;
    let updated: String = row.get(12)?;

    Ok(Property {
        id: PropertyId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        property_type: enum_from_sql(4, &property_type, PropertyType::parse)?,
        area: row.get(5)?,
        rooms: row.get(6)?,
        location: row.get(7)?,
        created_by: UserId(row.get(8)?),
        status: enum_from_sql(9, &status, PropertyStatus::parse)?,
        views: row.get(10)?,
        created_at: ts_from_sql(11, &created)?,
        updated_at: ts_from_sql(12, &updated)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_user, property_form, test_db};

    #[test]
    fn test_create_with_gallery() {
        let (db, _dir) = test_db();
        let owner = db.create_user(&new_user("rita")).unwrap();

        let images = vec!["img/front.jpg".to_string(), "img/kitchen.jpg".to_string()];
        let property = db
            .create_property(owner.id, &property_form("Flat", 100_000), &images)
            .unwrap();

        assert_eq!(db.get_property(property.id).unwrap(), property);
        let gallery = db.images_for_property(property.id).unwrap();
        assert_eq!(gallery.len(), 2);
        assert!(gallery[0].is_main);
        assert_eq!(gallery[0].image_path, "img/front.jpg");
        assert!(!gallery[1].is_main);
    }

    #[test]
    fn test_invalid_form_rejected() {
        let (db, _dir) = test_db();
        let owner = db.create_user(&new_user("rita")).unwrap();

        let mut form = property_form(" ", -5);
        form.area = 0.0;
        let Err(StoreError::Validation(errors)) = db.create_property(owner.id, &form, &[]) else {
            panic!("expected validation error");
        };
        assert!(errors.has("title"));
        assert!(errors.has("price"));
        assert!(errors.has("area"));
    }

    #[test]
    fn test_views_and_owner_checks() {
        let (db, _dir) = test_db();
        let owner = db.create_user(&new_user("rita")).unwrap();
        let other = db.create_user(&new_user("mallory")).unwrap();
        let property = db
            .create_property(owner.id, &property_form("House", 5_000_000), &[])
            .unwrap();

        db.record_view(property.id).unwrap();
        assert_eq!(db.record_view(property.id).unwrap().views, 2);

        let edit = property_form("House with garden", 5_500_000);
        assert!(matches!(
            db.update_property(other.id, property.id, &edit, &[]),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.set_property_status(other.id, property.id, PropertyStatus::Sold),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.delete_property(other.id, property.id),
            Err(StoreError::NotFound)
        ));

        let updated = db
            .update_property(owner.id, property.id, &edit, &["img/garden.jpg".into()])
            .unwrap();
        assert_eq!(updated.title, "House with garden");
        assert!(db.images_for_property(property.id).unwrap()[0].is_main);

        let sold = db
            .set_property_status(owner.id, property.id, PropertyStatus::Sold)
            .unwrap();
        assert_eq!(sold.status, PropertyStatus::Sold);

        db.delete_property(owner.id, property.id).unwrap();
        assert!(matches!(db.get_property(property.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_search_filters_and_sorting() {
        let (db, _dir) = test_db();
        let owner = db.create_user(&new_user("rita")).unwrap();

        let mut cheap = property_form("Studio by the river", 50_000);
        cheap.rooms = Some(1);
        let mut mid = property_form("Family flat", 120_000);
        mid.rooms = Some(3);
        let mut house = property_form("Country house", 300_000);
        house.property_type = PropertyType::House;
        house.location = "Riverside village".into();
        let mut hidden = property_form("Hidden river loft", 80_000);
        hidden.status = PropertyStatus::Hidden;

        for form in [&cheap, &mid, &house, &hidden] {
            db.create_property(owner.id, form, &[]).unwrap();
        }

        let filter = PropertyFilter {
            search: Some("RIVER".into()),
            sort: PropertySort::PriceAsc,
            page: 1,
            ..Default::default()
        };
        let page = db.list_properties(&filter).unwrap();
        let titles: Vec<_> = page.items.iter().map(|c| c.property.title.as_str()).collect();
        assert_eq!(titles, vec!["Studio by the river", "Country house"]);

        let filter = PropertyFilter {
            property_type: Some(PropertyType::Apartment),
            min_price: Some(60_000),
            max_price: Some(200_000),
            page: 1,
            ..Default::default()
        };
        let page = db.list_properties(&filter).unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].property.title, "Family flat");

        let filter = PropertyFilter {
            rooms: Some(1),
            page: 1,
            ..Default::default()
        };
        assert_eq!(db.list_properties(&filter).unwrap().total_items, 1);

        let filter = PropertyFilter {
            search: Some("100%".into()),
            page: 1,
            ..Default::default()
        };
        assert_eq!(db.list_properties(&filter).unwrap().total_items, 0);

        // Case folding is not limited to ASCII.
        let mut flat = property_form("Квартира у реки", 90_000);
        flat.location = "Москва".into();
        db.create_property(owner.id, &flat, &[]).unwrap();
        for needle in ["москва", "КВАРТИРА", "У Реки"] {
            let filter = PropertyFilter {
                search: Some(needle.into()),
                page: 1,
                ..Default::default()
            };
            let page = db.list_properties(&filter).unwrap();
            assert_eq!(page.total_items, 1, "search {needle:?}");
            assert_eq!(page.items[0].property.title, "Квартира у реки");
        }
    }

    #[test]
    fn test_pagination_clamps() {
        let (db, _dir) = test_db();
        let owner = db.create_user(&new_user("rita")).unwrap();
        for i in 0..(PROPERTIES_PER_PAGE + 3) {
            db.create_property(owner.id, &property_form(&format!("Flat {i}"), 1_000), &[])
                .unwrap();
        }

        let mut filter = PropertyFilter {
            page: 0,
            ..Default::default()
        };
        let first = db.list_properties(&filter).unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items.len(), PROPERTIES_PER_PAGE as usize);
        assert!(first.has_next && !first.has_previous);

        filter.page = 99;
        let last = db.list_properties(&filter).unwrap();
        assert_eq!(last.number, 2);
        assert_eq!(last.items.len(), 3);
        assert!(!last.has_next && last.has_previous);
    }

    #[test]
    fn test_empty_search_has_one_page() {
        let (db, _dir) = test_db();
        let page = db.list_properties(&PropertyFilter::default()).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.number, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_site_stats() {
        let (db, _dir) = test_db();
        let mut realtor = new_user("rita");
        realtor.user_type = UserType::Realtor;
        let owner = db.create_user(&realtor).unwrap();
        db.create_user(&new_user("carl")).unwrap();

        let a = db
            .create_property(owner.id, &property_form("A", 1), &["a.jpg".into()])
            .unwrap();
        let b = db.create_property(owner.id, &property_form("B", 2), &[]).unwrap();
        db.set_property_status(owner.id, b.id, PropertyStatus::Sold)
            .unwrap();

        let stats = db.site_stats().unwrap();
        assert_eq!(stats.properties_count, 1);
        assert_eq!(stats.sold_count, 1);
        assert_eq!(stats.users_count, 2);
        assert_eq!(stats.realtors_count, 1);
        assert_eq!(stats.featured.len(), 1);
        assert_eq!(stats.featured[0].property.id, a.id);
        assert_eq!(stats.featured[0].main_image.as_deref(), Some("a.jpg"));

        assert_eq!(db.properties_for_owner(owner.id).unwrap().len(), 2);
    }
}
