//! Entities as the backend serves them, plus the payloads the console writes back.

use serde::{Deserialize, Deserializer, Serialize};

pub type EntityId = i64;

/// A related entity embedded in its parent, either as a bare name or as an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Name(String),
    Entry(LabelEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Label {
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Name(name) => Some(name.as_str()),
            Label::Entry(entry) => entry.name.as_deref(),
        }
    }

    pub fn display(&self) -> &str {
        self.name().unwrap_or("—")
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::Name(name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub page_amount: u32,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub authors: Vec<Label>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub categories: Vec<Label>,
    /// Only the count is shown; the reviews themselves live under the book's route.
    #[serde(default, deserialize_with = "nullable_list")]
    pub reviews: Vec<serde_json::Value>,
}

impl Book {
    /// The backend encodes an unknown year as `0`.
    pub fn known_year(&self) -> Option<i32> {
        self.year.filter(|year| *year != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub books: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "bookAmount")]
    pub book_count: Option<u32>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub books: Vec<Label>,
}

impl Category {
    pub fn book_count(&self) -> usize {
        self.book_count
            .map(|count| count as usize)
            .unwrap_or(self.books.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUser {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: EntityId,
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "userDto")]
    pub user: Option<ReviewUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// The authenticated principal as kept in local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Self {
            id: response.user_id,
            name: response.name,
            email: response.email,
            token: response.token,
        }
    }
}

// Write payloads.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBody {
    pub name: String,
    pub author_ids: Vec<EntityId>,
    pub category_ids: Vec<EntityId>,
    pub year: serde_json::Value,
    pub page_amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBody {
    pub name: String,
    pub info: Option<String>,
    pub book_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBody {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_ids: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    pub rating: u8,
    pub comment: Option<String>,
    pub user_id: EntityId,
    pub book_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserBody {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
