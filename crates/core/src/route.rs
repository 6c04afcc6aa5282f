//! The console's route table.

use std::fmt;

use crate::model::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Books { author_id: Option<EntityId> },
    Authors,
    Categories,
    Reviews { book_id: EntityId },
    Users,
    Profile { user_id: EntityId },
}

impl Default for Route {
    fn default() -> Self {
        Route::Books { author_id: None }
    }
}

impl Route {
    pub fn books() -> Self {
        Route::Books { author_id: None }
    }

    /// Parses `/books`, `/books?authorId=3`, `/books/3/reviews`, `/users/3/profile`, ...
    /// `/` and the empty path map to the book list.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (path, query) = match input.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (input, None),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] | ["books"] => {
                let author_id = query
                    .into_iter()
                    .flat_map(|q| q.split('&'))
                    .filter_map(|pair| pair.split_once('='))
                    .find(|(key, _)| *key == "authorId")
                    .and_then(|(_, value)| value.parse::<EntityId>().ok());
                Some(Route::Books { author_id })
            }
            ["authors"] => Some(Route::Authors),
            ["categories"] => Some(Route::Categories),
            ["users"] => Some(Route::Users),
            ["books", id, "reviews"] => id
                .parse::<EntityId>()
                .ok()
                .map(|book_id| Route::Reviews { book_id }),
            ["users", id, "profile"] => id
                .parse::<EntityId>()
                .ok()
                .map(|user_id| Route::Profile { user_id }),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Books { author_id: None } => "/books".to_string(),
            Route::Books {
                author_id: Some(id),
            } => format!("/books?authorId={id}"),
            Route::Authors => "/authors".to_string(),
            Route::Categories => "/categories".to_string(),
            Route::Reviews { book_id } => format!("/books/{book_id}/reviews"),
            Route::Users => "/users".to_string(),
            Route::Profile { user_id } => format!("/users/{user_id}/profile"),
        }
    }

    /// Routes that only make sense for the signed-in principal.
    pub fn is_principal_scoped(&self) -> bool {
        matches!(
            self,
            Route::Profile { .. }
                | Route::Books {
                    author_id: Some(_)
                }
        )
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Books { .. } => "Books",
            Route::Authors => "Authors",
            Route::Categories => "Categories",
            Route::Reviews { .. } => "Reviews",
            Route::Users => "Users",
            Route::Profile { .. } => "Profile",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

impl std::str::FromStr for Route {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Route::parse(value).ok_or("unknown route")
    }
}
