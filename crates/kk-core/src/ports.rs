//! Ports (traits) for the collaborators the handlers depend on.
//!
//! Adapter crates implement these: `kk-sqlite` for the stores, `kk-imageapi`
//! for the image source. `crate::store::memory` has in-process versions.

use async_trait::async_trait;

use crate::{
    domain::{Category, ImageDescriptor, SavedId, SavedImage, UserId},
    errors::Error,
    Result,
};

/// Ordered allow-list of category names. The first entry is the default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCatalog {
    names: Vec<String>,
}

impl CategoryCatalog {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::Config(
                "category catalog must contain at least one name".to_string(),
            ));
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn default_name(&self) -> &str {
        &self.names[0]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Fails with `Error::Validation` if `name` is not in the allow-list.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(Error::Validation(format!("category {name:?} not found")))
        }
    }
}

/// Per-user current category.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<Category>>;

    /// Create (or overwrite) the user's category with the catalog default.
    async fn set_default(&self, user_id: UserId) -> Result<Category>;

    /// Overwrite the user's category. Fails with `Error::Validation` if `name`
    /// is not in the catalog.
    async fn update(&self, user_id: UserId, name: &str) -> Result<Category>;
}

/// Per-user saved-image collection, ordered by creation time ascending.
#[async_trait]
pub trait SavedStore: Send + Sync {
    /// Persist `image` for `user_id`.
    ///
    /// Idempotent on `(user_id, external_id)`: re-saving returns the existing row.
    async fn save(&self, user_id: UserId, image: &ImageDescriptor) -> Result<SavedImage>;

    async fn list_ordered(&self, user_id: UserId) -> Result<Vec<SavedImage>>;

    async fn exists_for_user(&self, user_id: UserId) -> Result<bool>;

    /// Returns `false` if no row had that id.
    async fn delete_by_id(&self, id: SavedId) -> Result<bool>;

    /// Atomically delete every row owned by `user_id`. Returns the number removed.
    async fn delete_all_for_user(&self, user_id: UserId) -> Result<usize>;
}

/// Upstream image catalog.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Next image of `category` for the user's feed session.
    async fn poll_next(&self, category: &Category) -> Result<ImageDescriptor>;

    async fn get_by_external_id(&self, external_id: &str) -> Result<ImageDescriptor>;
}
