// Todo list state with write-through persistence

use crate::collection;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::filter::{SortOrder, TodoFilter, TodoQuery};
use crate::models::{Stats, TODOS_KEY, Todo, now};
use crate::settings::Settings;
use crate::snapshot::{self, Snapshot};
use crate::storage::Storage;
use std::rc::Rc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Authoritative in-memory todo list mirrored into a backing store
///
/// Every mutation persists the full list before returning. Storage failures
/// never fail an operation: the in-memory state stands and the error is kept
/// for `take_warning`.
pub struct TodoStore {
    storage: Rc<dyn Storage>,
    config: StoreConfig,
    todos: Vec<Todo>,
    warning: Option<StoreError>,
}

impl TodoStore {
    /// Open a store over the given backing storage
    ///
    /// Missing data starts an empty list. Unavailable storage or malformed
    /// data also starts empty and leaves a warning.
    pub fn open(storage: Rc<dyn Storage>, config: StoreConfig) -> Self {
        let mut warning = None;
        let todos = match collection::load::<Todo>(storage.as_ref()) {
            Ok(Some(decoded)) => decoded.records,
            Ok(None) => {
                debug!("No stored todos, starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "Failed to load todos, starting empty");
                warning = Some(err);
                Vec::new()
            }
        };

        Self {
            storage,
            config,
            todos,
            warning,
        }
    }

    /// All todos in list order (newest insertion first)
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Returns and clears the latest recoverable storage error
    pub fn take_warning(&mut self) -> Option<StoreError> {
        self.warning.take()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a todo with the store's configured text limit
    pub fn add(&mut self, text: &str) -> Result<Todo> {
        self.add_with_limit(text, self.config.max_text_len)
    }

    pub fn add_with_limit(&mut self, text: &str, max_len: usize) -> Result<Todo> {
        let text = validate_text(text, max_len)?;
        let created_at = now();

        let todo = Todo {
            id: self.fresh_id(),
            text,
            completed: false,
            created_at,
            updated_at: created_at,
            category: None,
        };

        self.todos.insert(0, todo.clone());
        info!(id = %todo.id, "Added todo");
        self.persist();

        Ok(todo)
    }

    /// Replace a todo's text with the store's configured text limit
    pub fn update(&mut self, id: &str, text: &str) -> Result<Todo> {
        self.update_with_limit(id, text, self.config.max_text_len)
    }

    pub fn update_with_limit(&mut self, id: &str, text: &str, max_len: usize) -> Result<Todo> {
        let text = validate_text(text, max_len)?;
        self.modify(id, |todo| todo.text = text)
    }

    pub fn toggle_completion(&mut self, id: &str) -> Result<Todo> {
        self.modify(id, |todo| todo.completed = !todo.completed)
    }

    /// Set or clear the category; `None` means the fallback category
    pub fn assign_category(&mut self, id: &str, category: Option<&str>) -> Result<Todo> {
        let category = category.map(str::to_string);
        self.modify(id, |todo| todo.category = category)
    }

    /// Remove a todo if present
    ///
    /// Removing an unknown id is a no-op that returns `None`; the list is
    /// persisted either way.
    pub fn remove(&mut self, id: &str) -> Option<Todo> {
        let index = self.todos.iter().position(|t| t.id == id);
        let removed = index.map(|index| self.todos.remove(index));

        match &removed {
            Some(_) => info!(id, "Removed todo"),
            None => debug!(id, "Remove of unknown todo"),
        }
        self.persist();

        removed
    }

    /// Remove every completed todo, returning how many were removed
    pub fn clear_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        let removed = before - self.todos.len();

        info!(removed, "Cleared completed todos");
        self.persist();
        removed
    }

    /// Remove every todo, returning how many were removed
    pub fn clear_all(&mut self) -> usize {
        let removed = self.todos.len();
        self.todos.clear();

        info!(removed, "Cleared all todos");
        self.persist();
        removed
    }

    /// Point every todo in category `from` at `to`
    pub fn reassign_category(&mut self, from: &str, to: &str) -> usize {
        let mut count = 0;
        for todo in self.todos.iter_mut().filter(|t| t.category_id() == from) {
            todo.category = Some(to.to_string());
            todo.touch();
            count += 1;
        }

        if count > 0 {
            info!(from, to, count, "Reassigned todos to another category");
            self.persist();
        }
        count
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn filtered_view(&self, filter: TodoFilter) -> Vec<&Todo> {
        self.todos.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn sorted_view(&self, order: SortOrder) -> Vec<&Todo> {
        let mut view: Vec<&Todo> = self.todos.iter().collect();
        order.sort(&mut view);
        view
    }

    /// Case-insensitive text search; a blank term matches everything
    pub fn search(&self, term: &str) -> Vec<&Todo> {
        self.query(&TodoQuery {
            search: Some(term.to_string()),
            ..TodoQuery::default()
        })
    }

    pub fn in_category(&self, category_id: &str) -> Vec<&Todo> {
        self.query(&TodoQuery {
            category: Some(category_id.to_string()),
            ..TodoQuery::default()
        })
    }

    pub fn count_in_category(&self, category_id: &str) -> usize {
        self.todos.iter().filter(|t| t.category_id() == category_id).count()
    }

    pub fn query(&self, query: &TodoQuery) -> Vec<&Todo> {
        query.apply(&self.todos)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_todos(&self.todos)
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn has_completed(&self) -> bool {
        self.todos.iter().any(|t| t.completed)
    }

    pub fn has_pending(&self) -> bool {
        self.todos.iter().any(|t| !t.completed)
    }

    // ========================================================================
    // Snapshots and external changes
    // ========================================================================

    pub fn export_snapshot(&self, settings: Option<&Settings>) -> Result<String> {
        snapshot::export(&self.todos, settings)
    }

    /// Replace the list with the todos of an import blob
    ///
    /// On error the current list is left untouched.
    pub fn import_snapshot(&mut self, blob: &str) -> Result<Snapshot> {
        let snapshot = snapshot::parse(blob, self.config.import_policy)?;

        self.todos = snapshot.todos.clone();
        info!(count = self.todos.len(), dropped = snapshot.dropped, "Imported todos");
        self.persist();

        Ok(snapshot)
    }

    /// React to another writer changing a storage key
    ///
    /// Last writer wins: a valid new todo list replaces ours wholesale.
    /// Returns whether the list was reloaded.
    pub fn handle_external_change(&mut self, key: &str, new_value: Option<&str>) -> bool {
        if key != TODOS_KEY {
            return false;
        }
        let Some(raw) = new_value else {
            return false;
        };

        match collection::decode_collection::<Todo>(raw).map(|decoded| decoded.records) {
            Ok(todos) => {
                info!(count = todos.len(), "Reloaded todos after external change");
                self.todos = todos;
                true
            }
            Err(err) => {
                warn!(error = %err, "Ignoring malformed external change");
                self.warning = Some(err);
                false
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn modify(&mut self, id: &str, f: impl FnOnce(&mut Todo)) -> Result<Todo> {
        let todo = self
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        f(todo);
        todo.touch();
        let updated = todo.clone();

        debug!(id, "Updated todo");
        self.persist();
        Ok(updated)
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::now_v7().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn persist(&mut self) {
        if let Err(err) = collection::persist(self.storage.as_ref(), &self.todos) {
            warn!(error = %err, "Failed to persist todos, continuing in memory");
            self.warning = Some(err);
        }
    }
}

/// Trim and check todo text against a length limit in characters
pub fn validate_text(text: &str, max_len: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyText);
    }

    let len = trimmed.chars().count();
    if len > max_len {
        return Err(StoreError::TextTooLong { len, max: max_len });
    }

    Ok(trimmed.to_string())
}
