// Derived views over the todo list

use crate::models::Todo;
use std::cmp::Ordering;
use std::str::FromStr;

/// Completion filter for listing todos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TodoFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl TodoFilter {
    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            TodoFilter::All => true,
            TodoFilter::Completed => todo.completed,
            TodoFilter::Pending => !todo.completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TodoFilter::All => "all",
            TodoFilter::Completed => "completed",
            TodoFilter::Pending => "pending",
        }
    }
}

impl FromStr for TodoFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TodoFilter::All),
            "completed" => Ok(TodoFilter::Completed),
            "pending" => Ok(TodoFilter::Pending),
            other => Err(format!("unknown filter: {} (expected all, completed or pending)", other)),
        }
    }
}

impl std::fmt::Display for TodoFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordering criteria for listing todos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    CreatedDesc,
    CreatedAsc,
    UpdatedDesc,
    /// Case-insensitive on text
    Alphabetical,
    /// Incomplete before completed, newest first within each group
    Completion,
}

impl SortOrder {
    pub fn compare(self, a: &Todo, b: &Todo) -> Ordering {
        match self {
            SortOrder::CreatedDesc => b.created_at.cmp(&a.created_at),
            SortOrder::CreatedAsc => a.created_at.cmp(&b.created_at),
            SortOrder::UpdatedDesc => b.updated_at.cmp(&a.updated_at),
            SortOrder::Alphabetical => a.text.to_lowercase().cmp(&b.text.to_lowercase()),
            SortOrder::Completion => a
                .completed
                .cmp(&b.completed)
                .then_with(|| b.created_at.cmp(&a.created_at)),
        }
    }

    /// Stable sort, so ties keep list order
    pub fn sort(self, todos: &mut [&Todo]) {
        todos.sort_by(|a, b| self.compare(a, b));
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::CreatedDesc => "createdAt-desc",
            SortOrder::CreatedAsc => "createdAt-asc",
            SortOrder::UpdatedDesc => "updatedAt-desc",
            SortOrder::Alphabetical => "alphabetical",
            SortOrder::Completion => "completion",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt-desc" => Ok(SortOrder::CreatedDesc),
            "createdAt-asc" => Ok(SortOrder::CreatedAsc),
            "updatedAt-desc" => Ok(SortOrder::UpdatedDesc),
            "alphabetical" => Ok(SortOrder::Alphabetical),
            "completion" => Ok(SortOrder::Completion),
            other => Err(format!(
                "unknown sort order: {} (expected createdAt-desc, createdAt-asc, updatedAt-desc, alphabetical or completion)",
                other
            )),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Combined listing query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoQuery {
    pub filter: TodoFilter,
    pub sort: SortOrder,
    /// Case-insensitive substring on text; blank matches everything
    pub search: Option<String>,
    pub category: Option<String>,
}

impl TodoQuery {
    pub fn apply<'a>(&self, todos: &'a [Todo]) -> Vec<&'a Todo> {
        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut results: Vec<&Todo> = todos
            .iter()
            .filter(|t| self.filter.matches(t))
            .filter(|t| needle.as_ref().is_none_or(|n| t.text.to_lowercase().contains(n.as_str())))
            .filter(|t| self.category.as_deref().is_none_or(|c| t.category_id() == c))
            .collect();

        self.sort.sort(&mut results);
        results
    }
}
