// User-defined categories

use crate::collection;
use crate::error::{Result, StoreError};
use crate::models::{Category, DEFAULT_CATEGORY_COLOR, FALLBACK_CATEGORY_ID, Todo, default_categories, now};
use crate::storage::Storage;
use crate::store::TodoStore;
use std::rc::Rc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Category list with write-through persistence
pub struct CategoryStore {
    storage: Rc<dyn Storage>,
    categories: Vec<Category>,
    warning: Option<StoreError>,
}

impl CategoryStore {
    /// Open over the given storage, seeding the built-in categories when none are stored
    pub fn open(storage: Rc<dyn Storage>) -> Self {
        let mut store = Self {
            storage,
            categories: Vec::new(),
            warning: None,
        };

        match collection::load::<Category>(store.storage.as_ref()) {
            Ok(Some(decoded)) => {
                store.categories = decoded.records;
                let restored = store.restore_fallback();
                // Stamps filled in on load must survive the next open
                if restored || decoded.filled > 0 {
                    info!(restored, filled = decoded.filled, "Repaired stored categories");
                    store.persist();
                }
            }
            Ok(None) => {
                info!("No stored categories, seeding defaults");
                store.categories = default_categories();
                store.persist();
            }
            Err(err) => {
                warn!(error = %err, "Failed to load categories, using defaults");
                store.categories = default_categories();
                store.warning = Some(err);
            }
        }

        store
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Like `get`, but a missing category is an error
    pub fn require(&self, id: &str) -> Result<&Category> {
        self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// File a todo under an existing category; `None` resets it to the fallback
    pub fn assign(&self, todos: &mut TodoStore, todo_id: &str, category: Option<&str>) -> Result<Todo> {
        if let Some(category) = category {
            self.require(category)?;
        }
        todos.assign_category(todo_id, category)
    }

    pub fn add(&mut self, name: &str, description: Option<&str>, color: Option<&str>) -> Result<Category> {
        let name = validate_name(name)?;

        let category = Category {
            id: Uuid::now_v7().to_string(),
            name,
            description: clean_description(description),
            color: color.unwrap_or(DEFAULT_CATEGORY_COLOR).to_string(),
            created_at: now(),
        };

        self.categories.push(category.clone());
        info!(id = %category.id, name = %category.name, "Added category");
        self.persist();

        Ok(category)
    }

    /// Rename a category and replace its description
    pub fn edit(&mut self, id: &str, name: &str, description: Option<&str>) -> Result<Category> {
        let name = validate_name(name)?;
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        category.name = name;
        category.description = clean_description(description);
        let updated = category.clone();

        debug!(id, "Edited category");
        self.persist();
        Ok(updated)
    }

    /// Delete a category and move its todos to the fallback category
    ///
    /// Returns how many todos were reassigned.
    pub fn remove(&mut self, id: &str, todos: &mut TodoStore) -> Result<usize> {
        if id == FALLBACK_CATEGORY_ID {
            return Err(StoreError::ProtectedCategory(id.to_string()));
        }
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        self.categories.remove(index);
        self.persist();

        let reassigned = todos.reassign_category(id, FALLBACK_CATEGORY_ID);
        info!(id, reassigned, "Removed category");
        Ok(reassigned)
    }

    /// Number of todos referencing `id`
    pub fn count_for(&self, id: &str, todos: &TodoStore) -> usize {
        todos.count_in_category(id)
    }

    /// Returns and clears the latest recoverable storage error
    pub fn take_warning(&mut self) -> Option<StoreError> {
        self.warning.take()
    }

    /// Put the built-in fallback category back when stored data lacks it
    fn restore_fallback(&mut self) -> bool {
        if self.get(FALLBACK_CATEGORY_ID).is_some() {
            return false;
        }
        match default_categories().into_iter().find(|c| c.id == FALLBACK_CATEGORY_ID) {
            Some(fallback) => {
                warn!(id = FALLBACK_CATEGORY_ID, "Stored categories lack the fallback category, restoring it");
                self.categories.insert(0, fallback);
                true
            }
            None => false,
        }
    }

    fn persist(&mut self) {
        if let Err(err) = collection::persist(self.storage.as_ref(), &self.categories) {
            warn!(error = %err, "Failed to persist categories, continuing in memory");
            self.warning = Some(err);
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}
