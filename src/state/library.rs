use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::data::{Template, TemplateFields, TemplateId};
use crate::error::StoreError;

type StoreResult<T> = Result<T, StoreError>;

const SELECT_TEMPLATE: &str =
    "SELECT id, name, crop_photo, crop_number, template_img, created_at FROM photo_templates";

/// The Library manages the SQLite template store.
/// It stores template names, their crop regions, and the path of the template image.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the template database at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(db_path)?;
        let mut library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;

        log::debug!("📁 Template store opened at: {}", db_path.display());
        Ok(library)
    }

    /// In-memory store, used by tests
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let mut library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Create the templates table if it doesn't exist.
    fn init_schema(&mut self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS photo_templates (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                crop_photo      TEXT NOT NULL,
                crop_number     TEXT NOT NULL,
                template_img    TEXT NOT NULL,
                created_at      INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    /// All templates in creation order
    pub fn list(&self) -> StoreResult<Vec<Template>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id", SELECT_TEMPLATE))?;

        let template_iter = stmt.query_map([], template_from_row)?;

        let mut templates = Vec::new();
        for template in template_iter {
            templates.push(template?);
        }

        Ok(templates)
    }

    pub fn get(&self, id: TemplateId) -> StoreResult<Template> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_TEMPLATE),
                params![id],
                template_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    /// Insert a new template and return the stored row
    pub fn create(&self, fields: &TemplateFields) -> StoreResult<Template> {
        validate(fields)?;

        self.conn.execute(
            "INSERT INTO photo_templates (name, crop_photo, crop_number, template_img, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fields.name,
                fields.crop_photo,
                fields.crop_number,
                fields.template_img,
                chrono::Utc::now().timestamp(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        log::info!("Created template {} ({})", id, fields.name);
        self.get(id)
    }

    /// Replace all editable fields of a template
    pub fn update(&self, id: TemplateId, fields: &TemplateFields) -> StoreResult<Template> {
        validate(fields)?;

        let changed = self.conn.execute(
            "UPDATE photo_templates
             SET name = ?1, crop_photo = ?2, crop_number = ?3, template_img = ?4
             WHERE id = ?5",
            params![
                fields.name,
                fields.crop_photo,
                fields.crop_number,
                fields.template_img,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        log::info!("Updated template {} ({})", id, fields.name);
        self.get(id)
    }

    pub fn delete(&self, id: TemplateId) -> StoreResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM photo_templates WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }

        log::info!("🗑️  Deleted template {}", id);
        Ok(())
    }
}

fn template_from_row(row: &Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        crop_photo: row.get(2)?,
        crop_number: row.get(3)?,
        template_img: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn validate(fields: &TemplateFields) -> StoreResult<()> {
    if fields.name.trim().is_empty() {
        return Err(StoreError::Validation("name must not be empty".to_string()));
    }
    if fields.template_img.trim().is_empty() {
        return Err(StoreError::Validation(
            "template image must not be empty".to_string(),
        ));
    }
    Ok(())
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

// Async entry points for the UI.
// rusqlite::Connection is not Sync, so every call opens its own connection
// on the blocking pool.

async fn with_library<T, F>(db_path: PathBuf, op: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Library) -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let library = Library::open(&db_path)?;
        op(&library)
    })
    .await
    .map_err(|e| StoreError::Task(e.to_string()))?
}

pub async fn list_templates(db_path: PathBuf) -> StoreResult<Vec<Template>> {
    with_library(db_path, |library| library.list()).await
}

pub async fn create_template(db_path: PathBuf, fields: TemplateFields) -> StoreResult<Template> {
    with_library(db_path, move |library| library.create(&fields)).await
}

pub async fn update_template(
    db_path: PathBuf,
    id: TemplateId,
    fields: TemplateFields,
) -> StoreResult<Template> {
    with_library(db_path, move |library| library.update(id, &fields)).await
}

pub async fn delete_template(db_path: PathBuf, id: TemplateId) -> StoreResult<()> {
    with_library(db_path, move |library| library.delete(id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> TemplateFields {
        TemplateFields {
            name: name.to_string(),
            crop_photo: r#"{"x":10.0,"y":10.0,"width":100.0,"height":150.0}"#.to_string(),
            crop_number: r#"{"x":5.0,"y":200.0,"width":40.0,"height":20.0}"#.to_string(),
            template_img: "/tmp/card.png".to_string(),
        }
    }

    #[test]
    fn test_create_and_list() {
        let library = Library::open_in_memory().unwrap();
        assert!(library.list().unwrap().is_empty());

        let first = library.create(&fields("ID Card")).unwrap();
        let second = library.create(&fields("Badge")).unwrap();
        assert!(second.id > first.id);
        assert_eq!(first.fields(), fields("ID Card"));

        let names: Vec<String> = library.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["ID Card", "Badge"]);
    }

    #[test]
    fn test_update_replaces_fields() {
        let library = Library::open_in_memory().unwrap();
        let template = library.create(&fields("ID Card")).unwrap();

        let mut changed = fields("Member Card");
        changed.crop_number = String::new();
        let updated = library.update(template.id, &changed).unwrap();

        assert_eq!(updated.id, template.id);
        assert_eq!(updated.fields(), changed);
        assert_eq!(library.get(template.id).unwrap(), updated);
    }

    #[test]
    fn test_missing_ids() {
        let library = Library::open_in_memory().unwrap();
        assert_eq!(library.get(42), Err(StoreError::NotFound(42)));
        assert_eq!(library.update(42, &fields("x")), Err(StoreError::NotFound(42)));
        assert_eq!(library.delete(42), Err(StoreError::NotFound(42)));
    }

    #[test]
    fn test_delete() {
        let library = Library::open_in_memory().unwrap();
        let template = library.create(&fields("ID Card")).unwrap();
        library.delete(template.id).unwrap();
        assert!(library.list().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_blank_name_and_image() {
        let library = Library::open_in_memory().unwrap();
        assert!(matches!(
            library.create(&fields("  ")),
            Err(StoreError::Validation(_))
        ));

        let mut no_image = fields("ID Card");
        no_image.template_img.clear();
        assert!(matches!(
            library.create(&no_image),
            Err(StoreError::Validation(_))
        ));
        assert!(library.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_async_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("photo_template.db");

        let created = create_template(db_path.clone(), fields("ID Card"))
            .await
            .unwrap();
        let listed = list_templates(db_path.clone()).await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        let updated = update_template(db_path.clone(), created.id, fields("Renamed"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");

        delete_template(db_path.clone(), created.id).await.unwrap();
        assert!(list_templates(db_path).await.unwrap().is_empty());
    }
}
