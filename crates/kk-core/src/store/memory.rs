use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{
    domain::{Category, ImageDescriptor, SavedId, SavedImage, UserId},
    ports::{CategoryCatalog, CategoryStore, SavedStore},
    Result,
};

/// Category store kept in memory. Lost on restart.
pub struct MemoryCategoryStore {
    catalog: Arc<CategoryCatalog>,
    rows: Mutex<HashMap<UserId, String>>,
}

impl MemoryCategoryStore {
    pub fn new(catalog: Arc<CategoryCatalog>) -> Self {
        Self {
            catalog,
            rows: Mutex::new(HashMap::new()),
        }
    }

    async fn put(&self, user_id: UserId, name: &str) -> Category {
        self.rows.lock().await.insert(user_id, name.to_string());
        Category {
            user_id,
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Category>> {
        Ok(self.rows.lock().await.get(&user_id).map(|name| Category {
            user_id,
            name: name.clone(),
        }))
    }

    async fn set_default(&self, user_id: UserId) -> Result<Category> {
        Ok(self.put(user_id, self.catalog.default_name()).await)
    }

    async fn update(&self, user_id: UserId, name: &str) -> Result<Category> {
        self.catalog.validate(name)?;
        Ok(self.put(user_id, name).await)
    }
}

#[derive(Default)]
struct SavedRows {
    next_id: i64,
    rows: Vec<SavedImage>,
}

/// Saved-image store kept in memory. Rows are kept in insertion order, which
/// is also creation order.
#[derive(Default)]
pub struct MemorySavedStore {
    inner: Mutex<SavedRows>,
}

impl MemorySavedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedStore for MemorySavedStore {
    async fn save(&self, user_id: UserId, image: &ImageDescriptor) -> Result<SavedImage> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner
            .rows
            .iter()
            .find(|r| r.user_id == user_id && r.external_id == image.external_id)
        {
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let row = SavedImage {
            id: SavedId(inner.next_id),
            user_id,
            external_id: image.external_id.clone(),
            image_url: image.image_url.clone(),
            category_name: image.category_name.clone(),
            created_at: Utc::now(),
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn list_ordered(&self, user_id: UserId) -> Result<Vec<SavedImage>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn exists_for_user(&self, user_id: UserId) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.rows.iter().any(|r| r.user_id == user_id))
    }

    async fn delete_by_id(&self, id: SavedId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id != id);
        Ok(inner.rows.len() != before)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.user_id != user_id);
        Ok(before - inner.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    fn image(id: &str) -> ImageDescriptor {
        ImageDescriptor {
            external_id: id.to_string(),
            image_url: format!("https://img.example/{id}.jpg"),
            category_name: "maid".to_string(),
        }
    }

    fn catalog() -> Arc<CategoryCatalog> {
        Arc::new(CategoryCatalog::new(vec!["maid".into(), "wink".into()]).unwrap())
    }

    #[tokio::test]
    async fn category_defaults_then_updates() {
        let store = MemoryCategoryStore::new(catalog());
        let user = UserId(1);
        assert!(store.get(user).await.unwrap().is_none());

        let cat = store.set_default(user).await.unwrap();
        assert_eq!(cat.name, "maid");

        store.update(user, "wink").await.unwrap();
        assert_eq!(store.get(user).await.unwrap().unwrap().name, "wink");

        assert!(matches!(
            store.update(user, "nope").await,
            Err(Error::Validation(_))
        ));
        assert_eq!(store.get(user).await.unwrap().unwrap().name, "wink");
    }

    #[tokio::test]
    async fn save_is_idempotent_per_user_and_external_id() {
        let store = MemorySavedStore::new();
        let a = store.save(UserId(1), &image("x")).await.unwrap();
        let again = store.save(UserId(1), &image("x")).await.unwrap();
        assert_eq!(a.id, again.id);
        assert_eq!(store.list_ordered(UserId(1)).await.unwrap().len(), 1);

        // Same external id for another user is a separate row.
        let other = store.save(UserId(2), &image("x")).await.unwrap();
        assert_ne!(other.id, a.id);
    }

    #[tokio::test]
    async fn list_is_ordered_and_scoped_to_user() {
        let store = MemorySavedStore::new();
        store.save(UserId(1), &image("a")).await.unwrap();
        store.save(UserId(2), &image("z")).await.unwrap();
        store.save(UserId(1), &image("b")).await.unwrap();

        let ids: Vec<_> = store
            .list_ordered(UserId(1))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.external_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn deletes_by_id_and_by_owner() {
        let store = MemorySavedStore::new();
        let a = store.save(UserId(1), &image("a")).await.unwrap();
        store.save(UserId(1), &image("b")).await.unwrap();
        store.save(UserId(2), &image("c")).await.unwrap();

        assert!(store.delete_by_id(a.id).await.unwrap());
        assert!(!store.delete_by_id(a.id).await.unwrap());

        assert_eq!(store.delete_all_for_user(UserId(1)).await.unwrap(), 1);
        assert!(!store.exists_for_user(UserId(1)).await.unwrap());
        assert!(store.list_ordered(UserId(1)).await.unwrap().is_empty());
        assert!(store.exists_for_user(UserId(2)).await.unwrap());
    }
}
