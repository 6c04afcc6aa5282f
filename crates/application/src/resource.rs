//! Per-entity descriptions plugged into the generic resource panel.

use std::fmt;

use catalog_core::form::{Checks, FieldError};
use catalog_core::model::{AuthorBody, BookBody, CategoryBody, ReviewBody, UserBody};
use catalog_core::{
    ApiRequest, Author, Book, Category, Collection, EntityId, Field, FormState, Label, Method,
    Relations, Review, Route, Session, User,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Whether the editor is creating a new entity or updating an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(EntityId),
}

/// What a body builder may need besides the form itself.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    pub mode: EditorMode,
    pub session: Option<&'a Session>,
    pub parent: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBy {
    Name,
    Author,
    Category,
}

impl SearchBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBy::Name => "name",
            SearchBy::Author => "author",
            SearchBy::Category => "category",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SearchBy::Name => SearchBy::Author,
            SearchBy::Author => SearchBy::Category,
            SearchBy::Category => SearchBy::Name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub by: SearchBy,
    pub text: String,
}

/// Narrowing applied to a panel's list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<Search>,
    pub author_id: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    /// Share of the table width, in percent.
    pub width: u16,
}

const fn column(title: &'static str, width: u16) -> Column {
    Column { title, width }
}

/// Everything the generic panel needs to know about one backend collection.
pub trait Resource {
    type Entity: DeserializeOwned + Clone + fmt::Debug;
    type Body: Serialize;

    /// Singular lower-case noun used in notifications.
    const NOUN: &'static str;
    const TITLE: &'static str;
    const UPDATE_METHOD: Method = Method::Put;
    /// Auxiliary collections loaded alongside the list for relation editing.
    const RELATIONS: &'static [Collection] = &[];
    /// Opening the editor needs a signed-in principal.
    const REQUIRES_SESSION: bool = false;
    const SEARCHABLE: bool = false;

    fn collection_path(parent: Option<EntityId>) -> String;
    fn id(entity: &Self::Entity) -> EntityId;
    fn blank_form() -> FormState;
    fn form_for(entity: &Self::Entity, relations: &Relations) -> FormState;
    fn body(form: &FormState, ctx: &WriteContext<'_>) -> Result<Self::Body, Vec<FieldError>>;
    fn columns() -> &'static [Column];
    fn row(entity: &Self::Entity) -> Vec<String>;

    /// Short label used in the delete confirmation.
    fn label(entity: &Self::Entity) -> String;

    fn list_request(parent: Option<EntityId>, _query: &ListQuery) -> ApiRequest {
        ApiRequest::get(Self::collection_path(parent))
    }

    fn retain(_entity: &Self::Entity, _query: &ListQuery, _relations: &Relations) -> bool {
        true
    }

    /// Whether a 404 for this list means "no matches" rather than a failure.
    fn empty_on_not_found(_query: &ListQuery) -> bool {
        false
    }

    fn drill_down(_entity: &Self::Entity) -> Option<Route> {
        None
    }

    /// The session after a successful edit of `id`, when that edit changed the principal.
    fn principal_update(_id: EntityId, _form: &FormState, _session: &Session) -> Option<Session> {
        None
    }
}

fn join_labels(labels: &[Label]) -> String {
    if labels.is_empty() {
        return "—".to_string();
    }
    labels
        .iter()
        .map(Label::display)
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => "—".to_string(),
    }
}

/// Blank stays unknown, whole numbers go out as numbers, anything else as typed.
pub fn year_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    match raw.parse::<i64>() {
        Ok(year) => Value::from(year),
        Err(_) => Value::String(raw.to_string()),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Books;

impl Resource for Books {
    type Entity = Book;
    type Body = BookBody;

    const NOUN: &'static str = "book";
    const TITLE: &'static str = "Books";
    const RELATIONS: &'static [Collection] = &[Collection::Authors, Collection::Categories];
    const SEARCHABLE: bool = true;

    fn collection_path(_parent: Option<EntityId>) -> String {
        "/books".to_string()
    }

    fn id(entity: &Book) -> EntityId {
        entity.id
    }

    fn blank_form() -> FormState {
        FormState::new(vec![
            Field::text("name", "Name"),
            Field::multi("authorIds", "Authors", Collection::Authors),
            Field::multi("categoryIds", "Categories", Collection::Categories),
            Field::text("year", "Year").hint("optional"),
            Field::number("pageAmount", "Pages"),
        ])
    }

    fn form_for(book: &Book, relations: &Relations) -> FormState {
        let mut form = Self::blank_form();
        form.set_text("name", book.name.clone());
        form.set_ids(
            "authorIds",
            relations.resolve(Collection::Authors, &book.authors),
        );
        form.set_ids(
            "categoryIds",
            relations.resolve(Collection::Categories, &book.categories),
        );
        form.set_text(
            "year",
            book.known_year().map(|y| y.to_string()).unwrap_or_default(),
        );
        form.set_text("pageAmount", book.page_amount.to_string());
        form
    }

    fn body(form: &FormState, _ctx: &WriteContext<'_>) -> Result<BookBody, Vec<FieldError>> {
        let mut checks = Checks::new(form);
        let name = checks.required("name", "Please enter the book name");
        checks.length("name", &name, 1, 255, "Name must be at most 255 characters");
        let pages = checks.integer(
            "pageAmount",
            1,
            i64::from(u32::MAX),
            "Please enter the page count",
            "Page count must be a whole number of at least 1",
        );
        let body = BookBody {
            name,
            author_ids: checks.ids("authorIds"),
            category_ids: checks.ids("categoryIds"),
            year: year_value(form.text("year")),
            page_amount: pages.and_then(|p| u32::try_from(p).ok()).unwrap_or(0),
        };
        checks.finish(body)
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            column("Name", 26),
            column("Authors", 20),
            column("Categories", 16),
            column("Year", 8),
            column("Pages", 8),
            column("Rating", 8),
            column("Reviews", 8),
        ];
        COLUMNS
    }

    fn row(book: &Book) -> Vec<String> {
        vec![
            book.name.clone(),
            join_labels(&book.authors),
            join_labels(&book.categories),
            book.known_year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| "—".to_string()),
            book.page_amount.to_string(),
            book.rating
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| "—".to_string()),
            book.reviews.len().to_string(),
        ]
    }

    fn label(book: &Book) -> String {
        book.name.clone()
    }

    fn list_request(parent: Option<EntityId>, query: &ListQuery) -> ApiRequest {
        let Some(search) = query.search.as_ref().filter(|s| !s.text.trim().is_empty()) else {
            return ApiRequest::get(Self::collection_path(parent));
        };
        let path = match search.by {
            SearchBy::Name => "/books/search",
            SearchBy::Author => "/books/search/author",
            SearchBy::Category => "/books/search/category",
        };
        ApiRequest::get(path).with_query("name", search.text.trim())
    }

    /// The search endpoints answer 404 when nothing matches.
    fn empty_on_not_found(query: &ListQuery) -> bool {
        query
            .search
            .as_ref()
            .is_some_and(|search| !search.text.trim().is_empty())
    }

    /// An author-scoped list keeps the books naming that author; until the author
    /// options arrive nothing matches.
    fn retain(book: &Book, query: &ListQuery, relations: &Relations) -> bool {
        let Some(author_id) = query.author_id else {
            return true;
        };
        let Some(author) = relations.name_of(Collection::Authors, author_id) else {
            return false;
        };
        book.authors.iter().any(|label| label.name() == Some(author))
    }

    fn drill_down(book: &Book) -> Option<Route> {
        Some(Route::Reviews { book_id: book.id })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Authors;

impl Resource for Authors {
    type Entity = Author;
    type Body = AuthorBody;

    const NOUN: &'static str = "author";
    const TITLE: &'static str = "Authors";
    const RELATIONS: &'static [Collection] = &[Collection::Books];

    fn collection_path(_parent: Option<EntityId>) -> String {
        "/authors".to_string()
    }

    fn id(entity: &Author) -> EntityId {
        entity.id
    }

    fn blank_form() -> FormState {
        FormState::new(vec![
            Field::text("name", "Name"),
            Field::text("info", "Info").hint("optional"),
            Field::multi("bookIds", "Books", Collection::Books),
        ])
    }

    fn form_for(author: &Author, relations: &Relations) -> FormState {
        let mut form = Self::blank_form();
        form.set_text("name", author.name.clone());
        form.set_text("info", author.info.clone().unwrap_or_default());
        form.set_ids("bookIds", relations.resolve(Collection::Books, &author.books));
        form
    }

    fn body(form: &FormState, _ctx: &WriteContext<'_>) -> Result<AuthorBody, Vec<FieldError>> {
        let mut checks = Checks::new(form);
        let name = checks.required("name", "Please enter the author's name");
        checks.length(
            "name",
            &name,
            2,
            255,
            "Name must be between 2 and 255 characters",
        );
        let body = AuthorBody {
            name,
            info: checks.optional("info"),
            book_ids: checks.ids("bookIds"),
        };
        checks.finish(body)
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            column("Name", 28),
            column("Info", 36),
            column("Books", 36),
        ];
        COLUMNS
    }

    fn row(author: &Author) -> Vec<String> {
        vec![
            author.name.clone(),
            or_dash(author.info.as_deref()),
            join_labels(&author.books),
        ]
    }

    fn label(author: &Author) -> String {
        author.name.clone()
    }

    fn drill_down(author: &Author) -> Option<Route> {
        Some(Route::Books {
            author_id: Some(author.id),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Categories;

impl Resource for Categories {
    type Entity = Category;
    type Body = CategoryBody;

    const NOUN: &'static str = "category";
    const TITLE: &'static str = "Categories";
    const RELATIONS: &'static [Collection] = &[Collection::Books];

    fn collection_path(_parent: Option<EntityId>) -> String {
        "/categories".to_string()
    }

    fn id(entity: &Category) -> EntityId {
        entity.id
    }

    fn blank_form() -> FormState {
        FormState::new(vec![Field::text("name", "Name")])
    }

    /// Book assignment is only offered once the category exists.
    fn form_for(category: &Category, relations: &Relations) -> FormState {
        let mut form = Self::blank_form();
        form.fields
            .push(Field::multi("bookIds", "Books", Collection::Books));
        form.set_text("name", category.name.clone());
        form.set_ids(
            "bookIds",
            relations.resolve(Collection::Books, &category.books),
        );
        form
    }

    fn body(form: &FormState, ctx: &WriteContext<'_>) -> Result<CategoryBody, Vec<FieldError>> {
        let mut checks = Checks::new(form);
        let name = checks.required("name", "Please enter the category name");
        checks.length("name", &name, 1, 100, "Name must be at most 100 characters");
        let book_ids = match ctx.mode {
            EditorMode::Create => None,
            EditorMode::Edit(_) => Some(checks.ids("bookIds")),
        };
        checks.finish(CategoryBody { name, book_ids })
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            column("Name", 40),
            column("Books", 12),
            column("Titles", 48),
        ];
        COLUMNS
    }

    fn row(category: &Category) -> Vec<String> {
        vec![
            category.name.clone(),
            category.book_count().to_string(),
            join_labels(&category.books),
        ]
    }

    fn label(category: &Category) -> String {
        category.name.clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Reviews;

impl Resource for Reviews {
    type Entity = Review;
    type Body = ReviewBody;

    const NOUN: &'static str = "review";
    const TITLE: &'static str = "Reviews";
    const REQUIRES_SESSION: bool = true;

    fn collection_path(parent: Option<EntityId>) -> String {
        format!("/books/{}/reviews", parent.unwrap_or_default())
    }

    fn id(entity: &Review) -> EntityId {
        entity.id
    }

    fn blank_form() -> FormState {
        FormState::new(vec![
            Field::number("rating", "Rating").hint("1-5"),
            Field::text("comment", "Comment").hint("optional"),
        ])
    }

    fn form_for(review: &Review, _relations: &Relations) -> FormState {
        let mut form = Self::blank_form();
        form.set_text("rating", review.rating.to_string());
        form.set_text("comment", review.comment.clone().unwrap_or_default());
        form
    }

    fn body(form: &FormState, ctx: &WriteContext<'_>) -> Result<ReviewBody, Vec<FieldError>> {
        let mut checks = Checks::new(form);
        let rating = checks.integer(
            "rating",
            1,
            5,
            "Please choose a rating",
            "Rating must be a whole number from 1 to 5",
        );
        let user_id = match ctx.session {
            Some(session) => session.id,
            None => {
                checks.fail("rating", "Please log in to write a review");
                0
            }
        };
        let body = ReviewBody {
            rating: rating.and_then(|r| u8::try_from(r).ok()).unwrap_or(0),
            comment: checks.optional("comment"),
            user_id,
            book_id: ctx.parent.unwrap_or_default(),
        };
        checks.finish(body)
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            column("Rating", 12),
            column("Comment", 58),
            column("By", 30),
        ];
        COLUMNS
    }

    fn row(review: &Review) -> Vec<String> {
        let stars = usize::try_from(review.rating.clamp(0, 5)).unwrap_or(0);
        let by = review
            .user
            .as_ref()
            .and_then(|user| user.name.as_deref().or(user.email.as_deref()));
        vec![
            format!("{}{}", "★".repeat(stars), "☆".repeat(5 - stars)),
            or_dash(review.comment.as_deref()),
            or_dash(by),
        ]
    }

    fn label(review: &Review) -> String {
        format!("review #{}", review.id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    type Entity = User;
    type Body = UserBody;

    const NOUN: &'static str = "user";
    const TITLE: &'static str = "Users";
    const UPDATE_METHOD: Method = Method::Patch;

    fn collection_path(_parent: Option<EntityId>) -> String {
        "/users".to_string()
    }

    fn id(entity: &User) -> EntityId {
        entity.id
    }

    fn blank_form() -> FormState {
        user_form()
    }

    fn form_for(user: &User, _relations: &Relations) -> FormState {
        let mut form = user_form();
        form.set_text("name", user.name.clone());
        form.set_text("email", user.email.clone());
        if let Some(field) = form.field_mut("password") {
            field.hint = "leave blank to keep";
        }
        form
    }

    fn body(form: &FormState, ctx: &WriteContext<'_>) -> Result<UserBody, Vec<FieldError>> {
        user_body(form, ctx.mode == EditorMode::Create)
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[column("Name", 40), column("Email", 60)];
        COLUMNS
    }

    fn row(user: &User) -> Vec<String> {
        vec![user.name.clone(), user.email.clone()]
    }

    fn label(user: &User) -> String {
        user.email.clone()
    }

    fn principal_update(id: EntityId, form: &FormState, session: &Session) -> Option<Session> {
        (session.id == id).then(|| Session {
            name: form.text("name").to_string(),
            email: form.text("email").trim().to_string(),
            ..session.clone()
        })
    }
}

/// The user editor shared by the admin list, registration and the profile view.
pub fn user_form() -> FormState {
    FormState::new(vec![
        Field::text("name", "Name"),
        Field::text("email", "Email"),
        Field::password("password", "Password"),
    ])
}

/// Name 2-100 chars, a valid email, and a password of at least 8 chars that is
/// mandatory only when `creating`.
pub fn user_body(form: &FormState, creating: bool) -> Result<UserBody, Vec<FieldError>> {
    let mut checks = Checks::new(form);
    let name = checks.required("name", "Please enter a name");
    checks.length(
        "name",
        &name,
        2,
        100,
        "Name must be between 2 and 100 characters",
    );
    let email = checks.required("email", "Please enter an email");
    checks.email("email", &email, "Please enter a valid email");

    let password = if creating {
        Some(checks.required("password", "Please enter a password"))
    } else {
        checks.optional("password")
    };
    if let Some(password) = &password {
        checks.length(
            "password",
            password,
            8,
            usize::MAX,
            "Password must be at least 8 characters",
        );
    }

    checks.finish(UserBody {
        name,
        email: email.trim().to_string(),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::RelationOption;
    use catalog_core::model::LabelEntry;
    use serde_json::json;

    fn edit(id: EntityId) -> WriteContext<'static> {
        WriteContext {
            mode: EditorMode::Edit(id),
            session: None,
            parent: None,
        }
    }

    fn create() -> WriteContext<'static> {
        WriteContext {
            mode: EditorMode::Create,
            session: None,
            parent: None,
        }
    }

    fn session() -> Session {
        Session {
            id: 7,
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            token: Some("t0k".to_string()),
        }
    }

    fn to_json<T: Serialize>(body: &T) -> Value {
        serde_json::to_value(body).unwrap()
    }

    #[test]
    fn book_edit_roundtrip_keeps_editable_fields() {
        let book: Book = serde_json::from_value(json!({
            "id": 3,
            "name": "Dune",
            "year": 1965,
            "pageAmount": 412,
            "authors": ["Frank Herbert"],
            "categories": [{"id": 2, "name": "Science Fiction"}]
        }))
        .unwrap();
        let relations = Relations::default()
            .with(
                Collection::Authors,
                vec![RelationOption::new(1, "Frank Herbert"), RelationOption::new(4, "Le Guin")],
            )
            .with(
                Collection::Categories,
                vec![RelationOption::new(2, "Science Fiction")],
            );

        let form = Books::form_for(&book, &relations);
        let body = Books::body(&form, &edit(3)).unwrap();
        assert_eq!(
            to_json(&body),
            json!({
                "name": "Dune",
                "authorIds": [1],
                "categoryIds": [2],
                "year": 1965,
                "pageAmount": 412
            })
        );
    }

    #[test]
    fn unknown_year_roundtrips_as_null() {
        let book: Book =
            serde_json::from_value(json!({"id": 1, "name": "X", "year": 0, "pageAmount": 9}))
                .unwrap();
        let form = Books::form_for(&book, &Relations::default());
        assert_eq!(form.text("year"), "");
        let body = Books::body(&form, &edit(1)).unwrap();
        assert_eq!(body.year, Value::Null);
    }

    #[test]
    fn page_count_rejects_non_positive_and_fractional() {
        for raw in ["0", "-1", "12.5", "many", ""] {
            let mut form = Books::blank_form();
            form.set_text("name", "Dune");
            form.set_text("pageAmount", raw);
            let errors = Books::body(&form, &create()).unwrap_err();
            assert_eq!(errors.len(), 1, "input {raw:?}");
            assert_eq!(errors[0].field, "pageAmount");
        }
    }

    #[test]
    fn blank_year_does_not_block_submission() {
        let mut form = Books::blank_form();
        form.set_text("name", "Dune");
        form.set_text("pageAmount", "412");
        form.set_text("year", "   ");
        let body = Books::body(&form, &create()).unwrap();
        assert_eq!(body.year, Value::Null);
        assert!(body.category_ids.is_empty());
    }

    #[test]
    fn year_passes_free_text_through() {
        assert_eq!(year_value("1965"), json!(1965));
        assert_eq!(year_value(" c. 1600 "), json!("c. 1600"));
        assert_eq!(year_value(""), Value::Null);
    }

    #[test]
    fn book_name_is_bounded() {
        let mut form = Books::blank_form();
        form.set_text("name", "x".repeat(256));
        form.set_text("pageAmount", "1");
        let errors = Books::body(&form, &create()).unwrap_err();
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn book_search_uses_search_endpoints() {
        let mut query = ListQuery::default();
        assert_eq!(Books::list_request(None, &query).to_string(), "GET /books");

        query.search = Some(Search {
            by: SearchBy::Author,
            text: " Herbert ".to_string(),
        });
        assert_eq!(
            Books::list_request(None, &query).to_string(),
            "GET /books/search/author?name=Herbert"
        );

        query.search = Some(Search {
            by: SearchBy::Category,
            text: "SF".to_string(),
        });
        assert_eq!(
            Books::list_request(None, &query).to_string(),
            "GET /books/search/category?name=SF"
        );

        query.search = Some(Search {
            by: SearchBy::Name,
            text: "  ".to_string(),
        });
        assert_eq!(Books::list_request(None, &query).to_string(), "GET /books");
    }

    #[test]
    fn author_scope_filters_by_author_name() {
        let book: Book = serde_json::from_value(json!({
            "id": 1, "name": "Dune", "pageAmount": 1, "authors": ["Frank Herbert"]
        }))
        .unwrap();
        let query = ListQuery {
            search: None,
            author_id: Some(1),
        };
        assert!(!Books::retain(&book, &query, &Relations::default()));

        let relations = Relations::default().with(
            Collection::Authors,
            vec![RelationOption::new(1, "Frank Herbert"), RelationOption::new(2, "Other")],
        );
        assert!(Books::retain(&book, &query, &relations));
        let other = ListQuery {
            search: None,
            author_id: Some(2),
        };
        assert!(!Books::retain(&book, &other, &relations));
        assert!(Books::retain(&book, &ListQuery::default(), &relations));
    }

    #[test]
    fn author_edit_roundtrip() {
        let author = Author {
            id: 4,
            name: "Ursula K. Le Guin".to_string(),
            info: Some("Earthsea".to_string()),
            books: vec![Label::Entry(LabelEntry {
                id: None,
                name: Some("A Wizard of Earthsea".to_string()),
            })],
        };
        let relations = Relations::default().with(
            Collection::Books,
            vec![RelationOption::new(10, "A Wizard of Earthsea")],
        );
        let form = Authors::form_for(&author, &relations);
        let body = Authors::body(&form, &edit(4)).unwrap();
        assert_eq!(
            to_json(&body),
            json!({"name": "Ursula K. Le Guin", "info": "Earthsea", "bookIds": [10]})
        );
    }

    #[test]
    fn author_name_length_rules() {
        let mut form = Authors::blank_form();
        form.set_text("name", "A");
        let errors = Authors::body(&form, &create()).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::new("name", "Name must be between 2 and 255 characters")]
        );

        form.set_text("name", "Al");
        let body = Authors::body(&form, &create()).unwrap();
        assert_eq!(to_json(&body), json!({"name": "Al", "info": null, "bookIds": []}));
    }

    #[test]
    fn category_create_and_update_bodies_differ() {
        let category = Category {
            id: 2,
            name: "Science Fiction".to_string(),
            book_count: None,
            books: vec![Label::from("Dune")],
        };
        let relations =
            Relations::default().with(Collection::Books, vec![RelationOption::new(3, "Dune")]);

        let form = Categories::form_for(&category, &relations);
        let update = Categories::body(&form, &edit(2)).unwrap();
        assert_eq!(
            to_json(&update),
            json!({"name": "Science Fiction", "bookIds": [3]})
        );

        let mut blank = Categories::blank_form();
        blank.set_text("name", "Poetry");
        let create_body = Categories::body(&blank, &create()).unwrap();
        assert_eq!(to_json(&create_body), json!({"name": "Poetry"}));
    }

    #[test]
    fn category_name_is_bounded() {
        let mut form = Categories::blank_form();
        form.set_text("name", "c".repeat(101));
        assert!(Categories::body(&form, &create()).is_err());
        form.set_text("name", "c".repeat(100));
        assert!(Categories::body(&form, &create()).is_ok());
    }

    #[test]
    fn review_body_carries_principal_and_book() {
        let session = session();
        let ctx = WriteContext {
            mode: EditorMode::Create,
            session: Some(&session),
            parent: Some(12),
        };
        let mut form = Reviews::blank_form();
        form.set_text("rating", "4");
        form.set_text("comment", "Great");
        let body = Reviews::body(&form, &ctx).unwrap();
        assert_eq!(
            to_json(&body),
            json!({"rating": 4, "comment": "Great", "userId": 7, "bookId": 12})
        );
        assert_eq!(Reviews::collection_path(Some(12)), "/books/12/reviews");
    }

    #[test]
    fn review_edit_roundtrip() {
        let session = session();
        let review: Review = serde_json::from_value(json!({
            "id": 5, "rating": 3, "comment": "Fine", "userDto": {"id": 7, "name": "Ann"}
        }))
        .unwrap();
        let form = Reviews::form_for(&review, &Relations::default());
        let ctx = WriteContext {
            mode: EditorMode::Edit(5),
            session: Some(&session),
            parent: Some(12),
        };
        let body = Reviews::body(&form, &ctx).unwrap();
        assert_eq!(body.rating, 3);
        assert_eq!(body.comment.as_deref(), Some("Fine"));
        assert_eq!(Reviews::row(&review)[0], "★★★☆☆");
        assert_eq!(Reviews::row(&review)[2], "Ann");
    }

    #[test]
    fn review_rating_range() {
        let session = session();
        let ctx = WriteContext {
            mode: EditorMode::Create,
            session: Some(&session),
            parent: Some(1),
        };
        for raw in ["0", "6", "3.5", ""] {
            let mut form = Reviews::blank_form();
            form.set_text("rating", raw);
            assert!(Reviews::body(&form, &ctx).is_err(), "input {raw:?}");
        }
    }

    #[test]
    fn user_rules_on_create() {
        let mut form = user_form();
        form.set_text("name", "A");
        form.set_text("email", "not-an-email");
        let errors = user_body(&form, true).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "password"]);

        form.set_text("name", "Ann");
        form.set_text("email", "ann@example.com");
        form.set_text("password", "short");
        let errors = user_body(&form, true).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::new("password", "Password must be at least 8 characters")]
        );
    }

    #[test]
    fn user_update_omits_blank_password() {
        let user = User {
            id: 7,
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
        };
        let form = Users::form_for(&user, &Relations::default());
        assert_eq!(form.text("password"), "");
        let body = Users::body(&form, &edit(7)).unwrap();
        assert_eq!(
            to_json(&body),
            json!({"name": "Ann", "email": "ann@example.com"})
        );

        let mut form = form;
        form.set_text("password", "correct horse");
        let body = Users::body(&form, &edit(7)).unwrap();
        assert_eq!(body.password.as_deref(), Some("correct horse"));
    }

    #[test]
    fn self_edit_updates_principal_and_keeps_token() {
        let mut form = user_form();
        form.set_text("name", "Ann B");
        form.set_text("email", "annb@example.com");
        let updated = Users::principal_update(7, &form, &session()).unwrap();
        assert_eq!(updated.name, "Ann B");
        assert_eq!(updated.email, "annb@example.com");
        assert_eq!(updated.token.as_deref(), Some("t0k"));
        assert!(Users::principal_update(8, &form, &session()).is_none());
    }

    #[test]
    fn drill_down_targets() {
        let book: Book =
            serde_json::from_value(json!({"id": 9, "name": "Dune", "pageAmount": 1})).unwrap();
        assert_eq!(Books::drill_down(&book), Some(Route::Reviews { book_id: 9 }));
        let author = Author {
            id: 2,
            name: "Frank Herbert".to_string(),
            info: None,
            books: Vec::new(),
        };
        assert_eq!(
            Authors::drill_down(&author),
            Some(Route::Books { author_id: Some(2) })
        );
    }
}
