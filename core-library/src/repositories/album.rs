//! Album repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{is_descendant_path, Album};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its ID
    ///
    /// # Returns
    /// - `Ok(Some(album))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>>;

    /// Find an album by its canonical path
    async fn find_by_path(&self, path: &str) -> Result<Option<Album>>;

    /// Insert an album unless one already exists at the same path
    ///
    /// # Returns
    /// - `Ok(true)` if the album was created
    /// - `Ok(false)` if an album already existed at that path
    ///
    /// # Errors
    /// Returns error if:
    /// - Album validation fails
    /// - The parent album does not exist
    /// - The album path is not below its parent's path
    /// - Database error occurs
    async fn insert_if_missing(&self, album: &Album) -> Result<bool>;

    /// Update the name and description of an existing album
    ///
    /// # Errors
    /// Returns error if:
    /// - Album does not exist
    /// - Album validation fails
    /// - Database error occurs
    async fn update(&self, album: &Album) -> Result<()>;

    /// Delete an album by ID
    ///
    /// Child albums and all their media are removed by the schema's
    /// cascading foreign keys.
    ///
    /// # Returns
    /// - `Ok(true)` if album was deleted
    /// - `Ok(false)` if album was not found
    async fn delete(&self, id: &str) -> Result<bool>;

    /// List every album ordered by path
    async fn list_all(&self) -> Result<Vec<Album>>;

    /// List direct children of an album ordered by name
    async fn list_children(&self, parent_id: &str) -> Result<Vec<Album>>;

    /// Count total albums
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn check_parent(&self, album: &Album) -> Result<()> {
        let Some(parent_id) = &album.parent_id else {
            return Ok(());
        };

        let parent = self
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "Album".to_string(),
                id: parent_id.clone(),
            })?;

        if !is_descendant_path(&album.path, &parent.path) {
            return Err(LibraryError::InvalidInput {
                field: "path".to_string(),
                message: format!(
                    "Album path '{}' is not below parent path '{}'",
                    album.path, parent.path
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<Album>> {
        let album = query_as::<_, Album>("SELECT * FROM albums WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn insert_if_missing(&self, album: &Album) -> Result<bool> {
        album.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        self.check_parent(album).await?;

        let result = query(
            r#"
            INSERT INTO albums (
                id, path, name, description, parent_id,
                thumbnail_media_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path) DO NOTHING
            "#,
        )
        .bind(&album.id)
        .bind(&album.path)
        .bind(&album.name)
        .bind(&album.description)
        .bind(&album.parent_id)
        .bind(&album.thumbnail_media_id)
        .bind(album.created_at)
        .bind(album.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, album: &Album) -> Result<()> {
        album.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            UPDATE albums
            SET name = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&album.name)
        .bind(&album.description)
        .bind(album.updated_at)
        .bind(&album.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Album".to_string(),
                id: album.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM albums WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<Album>> {
        let albums = query_as::<_, Album>("SELECT * FROM albums ORDER BY path ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(albums)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<Album>> {
        let albums =
            query_as::<_, Album>("SELECT * FROM albums WHERE parent_id = ? ORDER BY name ASC")
                .bind(parent_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(albums)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM albums")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteAlbumRepository {
        SqliteAlbumRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_album() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        assert!(repo.insert_if_missing(&root).await.unwrap());

        let found = repo.find_by_id(&root.id).await.unwrap().unwrap();
        assert_eq!(found.path, "/");
        assert_eq!(found.name, "Library");

        let by_path = repo.find_by_path("/").await.unwrap();
        assert_eq!(by_path.map(|a| a.id), Some(root.id));
    }

    #[tokio::test]
    async fn test_insert_if_missing_is_idempotent() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        let child = Album::child_of(&root, "trip");
        repo.insert_if_missing(&root).await.unwrap();

        assert!(repo.insert_if_missing(&child).await.unwrap());
        assert!(!repo.insert_if_missing(&child).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_requires_existing_parent() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        let child = Album::child_of(&root, "trip");

        let result = repo.insert_if_missing(&child).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_insert_rejects_path_outside_parent() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        let trip = Album::child_of(&root, "trip");
        let other = Album::child_of(&root, "other");
        repo.insert_if_missing(&root).await.unwrap();
        repo.insert_if_missing(&trip).await.unwrap();
        repo.insert_if_missing(&other).await.unwrap();

        let mut misplaced = Album::child_of(&trip, "day-1");
        misplaced.parent_id = Some(other.id.clone());

        let result = repo.insert_if_missing(&misplaced).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_update_album() {
        let repo = setup_repo().await;

        let mut root = Album::root("Library");
        repo.insert_if_missing(&root).await.unwrap();

        root.description = Some("Everything".to_string());
        repo.update(&root).await.unwrap();

        let found = repo.find_by_id(&root.id).await.unwrap().unwrap();
        assert_eq!(found.description.as_deref(), Some("Everything"));
    }

    #[tokio::test]
    async fn test_update_missing_album() {
        let repo = setup_repo().await;
        let result = repo.update(&Album::root("Library")).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_children_and_all() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        let b = Album::child_of(&root, "b");
        let a = Album::child_of(&root, "a");
        let nested = Album::child_of(&a, "nested");
        for album in [&root, &b, &a, &nested] {
            repo.insert_if_missing(album).await.unwrap();
        }

        let children = repo.list_children(&root.id).await.unwrap();
        let names: Vec<_> = children.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let all = repo.list_all().await.unwrap();
        let paths: Vec<_> = all.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a", "/a/nested", "/b"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let repo = setup_repo().await;

        let root = Album::root("Library");
        let trip = Album::child_of(&root, "trip");
        let day = Album::child_of(&trip, "day-1");
        for album in [&root, &trip, &day] {
            repo.insert_if_missing(album).await.unwrap();
        }

        assert!(repo.delete(&trip.id).await.unwrap());
        assert!(!repo.delete(&trip.id).await.unwrap());
        assert!(repo.find_by_id(&day.id).await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
