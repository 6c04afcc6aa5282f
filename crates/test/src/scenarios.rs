use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use catalog_api::ApiWorker;
use catalog_application::{
    AuthMode, CallTag, Panel, Search, SearchBy, SessionStore, Shell, View,
};
use catalog_core::{Level, Route, SessionPersistence};
use catalog_storage::Storage;
use serde_json::json;

use crate::{
    MemorySessions, ScriptedTransport, drive, make_book, make_options, make_session,
    make_settings,
};

fn shell_with(sessions: Rc<dyn SessionPersistence>, route: Route) -> Shell {
    Shell::new(
        make_settings("http://catalog.test/api"),
        SessionStore::load(sessions),
        route,
    )
}

fn script_book_relations(transport: &ScriptedTransport) {
    transport
        .ok("GET /authors", make_options(&[(1, "Frank Herbert"), (3, "Jane Austen")]))
        .ok("GET /categories", make_options(&[(2, "Science Fiction")]));
}

fn panel(shell: &Shell) -> &dyn Panel {
    match shell.panel() {
        Some(panel) => panel,
        None => panic!("expected a list panel on {}", shell.route()),
    }
}

#[test]
fn create_book_posts_body_and_refetches() {
    let transport = ScriptedTransport::new();
    script_book_relations(&transport);
    transport
        .ok("GET /books", json!([]))
        .ok(
            "GET /books",
            json!([make_book(9, "Dune", &["Frank Herbert"], &["Science Fiction"], 412)]),
        )
        .ok("POST /books", json!({"id": 9}));

    let mut shell = shell_with(Rc::new(MemorySessions::default()), Route::books());
    drive(&mut shell, &transport);
    assert!(panel(&shell).is_empty());
    transport.clear_requests();

    shell.open_editor(None);
    {
        let editor = shell.panel_mut().and_then(|p| p.editor_mut()).unwrap();
        editor.form.set_text("name", "Dune");
        editor.form.toggle_id("authorIds", 1);
        editor.form.toggle_id("categoryIds", 2);
        editor.form.set_text("pageAmount", "412");
    }
    shell.submit();
    drive(&mut shell, &transport);

    let requests = transport.requests();
    assert_eq!(transport.lines(), vec!["POST /books", "GET /books"]);
    assert_eq!(
        requests[0].body,
        Some(json!({
            "name": "Dune",
            "authorIds": [1],
            "categoryIds": [2],
            "year": null,
            "pageAmount": 412
        }))
    );

    let panel = panel(&shell);
    assert!(panel.editor().is_none());
    assert_eq!(panel.rows()[0][0], "Dune");
    assert_eq!(panel.rows()[0][1], "Frank Herbert");
    let last = &shell.notices().last().unwrap().notice;
    assert_eq!(last.level, Level::Success);
    assert_eq!(last.text, "Book created");
}

#[test]
fn every_entity_edits_back_to_its_own_fields() {
    let transport = ScriptedTransport::new();
    script_book_relations(&transport);
    transport
        .ok(
            "GET /books",
            json!([
                make_book(9, "Dune", &["Frank Herbert"], &["Science Fiction"], 412),
                {"id": 4, "name": "Emma", "year": 1815, "pageAmount": 474,
                 "authors": [{"id": 3, "name": "Jane Austen"}], "categories": null}
            ]),
        )
        .ok(
            "GET /authors",
            json!([{"id": 1, "name": "Frank Herbert", "info": "American", "books": ["Dune"]}]),
        )
        .ok("GET /categories", json!([{"id": 2, "name": "Science Fiction", "books": ["Dune"]}]))
        .ok("GET /users", json!([{"id": 5, "name": "Bo", "email": "bo@example.com"}]))
        .ok(
            "GET /books/9/reviews",
            json!([{"id": 6, "rating": 4, "comment": "Spice", "user": {"id": 5, "name": "Bo"}}]),
        );

    let session = make_session(5, "Bo");
    let cases = [
        (
            Route::books(),
            1,
            "PUT /books/4",
            json!({"name": "Emma", "authorIds": [3], "categoryIds": [], "year": 1815, "pageAmount": 474}),
        ),
        (
            Route::Authors,
            0,
            "PUT /authors/1",
            json!({"name": "Frank Herbert", "info": "American", "bookIds": [9]}),
        ),
        (
            Route::Categories,
            0,
            "PUT /categories/2",
            json!({"name": "Science Fiction", "bookIds": [9]}),
        ),
        (
            Route::Users,
            0,
            "PATCH /users/5",
            json!({"name": "Bo", "email": "bo@example.com"}),
        ),
        (
            Route::Reviews { book_id: 9 },
            0,
            "PUT /books/9/reviews/6",
            json!({"rating": 4, "comment": "Spice", "userId": 5, "bookId": 9}),
        ),
    ];

    for (route, row, line, body) in cases {
        let mut shell = shell_with(Rc::new(MemorySessions::with(session.clone())), route);
        drive(&mut shell, &transport);
        transport.clear_requests();

        shell.open_editor(Some(row));
        shell.submit();
        let outbox = shell.take_outbox();
        assert_eq!(outbox.len(), 1, "{route}");
        assert_eq!(outbox[0].1.to_string(), line, "{route}");
        assert_eq!(outbox[0].1.body.as_ref(), Some(&body), "{route}");
    }
}

#[test]
fn review_without_session_never_reaches_the_backend() {
    let transport = ScriptedTransport::new();
    let mut shell = shell_with(
        Rc::new(MemorySessions::default()),
        Route::Reviews { book_id: 9 },
    );
    drive(&mut shell, &transport);
    transport.clear_requests();

    shell.open_editor(None);
    drive(&mut shell, &transport);

    assert!(transport.requests().is_empty());
    let warnings: Vec<_> = shell
        .notices()
        .iter()
        .filter(|n| n.notice.level == Level::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(panel(&shell).editor().is_none());
}

#[test]
fn delete_needs_the_confirm_step() {
    let transport = ScriptedTransport::new();
    transport.ok("GET /categories", json!([{"id": 2, "name": "Poetry", "bookCount": 0}]));
    let mut shell = shell_with(Rc::new(MemorySessions::default()), Route::Categories);
    drive(&mut shell, &transport);
    transport.clear_requests();

    shell.request_delete();
    drive(&mut shell, &transport);
    assert!(transport.requests().is_empty());

    shell.cancel_delete();
    shell.confirm_delete();
    drive(&mut shell, &transport);
    assert!(transport.requests().is_empty());

    shell.request_delete();
    shell.confirm_delete();
    drive(&mut shell, &transport);
    assert_eq!(
        transport.lines(),
        vec!["DELETE /categories/2", "GET /categories"]
    );
    assert_eq!(
        shell.notices().last().map(|n| n.notice.text.as_str()),
        Some("Category deleted")
    );
}

#[test]
fn conflict_on_user_create_is_shown_verbatim() {
    let transport = ScriptedTransport::new();
    transport.fail("POST /users", 409, json!("Email already exists"));
    let mut shell = shell_with(Rc::new(MemorySessions::default()), Route::Users);
    drive(&mut shell, &transport);

    shell.open_editor(None);
    {
        let editor = shell.panel_mut().and_then(|p| p.editor_mut()).unwrap();
        editor.form.set_text("name", "Ann");
        editor.form.set_text("email", "ann@example.com");
        editor.form.set_text("password", "long enough");
    }
    shell.submit();
    drive(&mut shell, &transport);

    let panel = panel(&shell);
    assert!(panel.editor().is_some());
    assert!(!panel.is_submitting());
    assert_eq!(
        shell.notices().last().map(|n| n.notice.text.as_str()),
        Some("Email already exists")
    );
}

#[test]
fn login_persists_to_storage_and_logout_clears_it() -> anyhow::Result<()> {
    let storage = Rc::new(Storage::open_in_memory()?);
    let transport = ScriptedTransport::new();
    transport.ok(
        "POST /users/login",
        json!({"userId": 5, "name": "Bo", "email": "bo@example.com", "token": "abc"}),
    );

    let mut shell = shell_with(storage.clone(), Route::books());
    drive(&mut shell, &transport);

    shell.open_auth(AuthMode::Login);
    {
        let modal = shell.auth_mut().unwrap();
        modal.form.set_text("email", "bo@example.com");
        modal.form.set_text("password", "secret");
    }
    shell.submit_auth();
    drive(&mut shell, &transport);

    assert_eq!(shell.session().map(|s| s.id), Some(5));
    let stored = storage.load_session()?;
    assert_eq!(stored.and_then(|s| s.token), Some("abc".to_string()));

    shell.open_profile();
    assert_eq!(shell.route(), Route::Profile { user_id: 5 });
    shell.logout();
    assert_eq!(shell.route(), Route::books());
    assert!(storage.load_session()?.is_none());
    Ok(())
}

#[test]
fn attach_token_setting_adds_bearer() {
    let transport = ScriptedTransport::new();
    let mut settings = make_settings("http://catalog.test/api");
    settings.attach_token = true;
    let mut shell = Shell::new(
        settings,
        SessionStore::load(Rc::new(MemorySessions::with(make_session(5, "Bo")))),
        Route::Authors,
    );
    drive(&mut shell, &transport);
    let requests = transport.requests();
    assert!(!requests.is_empty());
    assert!(
        requests
            .iter()
            .all(|r| r.bearer.as_deref() == Some("token-5"))
    );
}

#[test]
fn book_search_and_author_scope() {
    let transport = ScriptedTransport::new();
    script_book_relations(&transport);
    transport.ok(
        "GET /books",
        json!([
            make_book(9, "Dune", &["Frank Herbert"], &[], 412),
            make_book(4, "Emma", &["Jane Austen"], &[], 474)
        ]),
    );
    transport.ok(
        "GET /books/search/author",
        json!([make_book(4, "Emma", &["Jane Austen"], &[], 474)]),
    );

    let mut shell = shell_with(
        Rc::new(MemorySessions::default()),
        Route::Books { author_id: Some(3) },
    );
    drive(&mut shell, &transport);
    assert_eq!(panel(&shell).rows().len(), 1);
    assert_eq!(panel(&shell).title(), "Books by Jane Austen");

    shell.navigate(Route::books());
    drive(&mut shell, &transport);
    assert_eq!(panel(&shell).len(), 2);

    transport.clear_requests();
    shell.search(Some(Search {
        by: SearchBy::Author,
        text: "Austen".to_string(),
    }));
    drive(&mut shell, &transport);
    assert_eq!(transport.lines(), vec!["GET /books/search/author?name=Austen"]);
    assert_eq!(panel(&shell).len(), 1);
}

#[test]
fn profile_view_updates_the_stored_session() {
    let sessions = Rc::new(MemorySessions::with(make_session(5, "Bo")));
    let transport = ScriptedTransport::new();
    let mut shell = shell_with(sessions.clone(), Route::Profile { user_id: 5 });
    drive(&mut shell, &transport);

    if let View::Profile(profile) = shell.view_mut() {
        profile.form.set_text("name", "Bob");
    }
    shell.submit();
    drive(&mut shell, &transport);

    assert_eq!(transport.lines(), vec!["PATCH /users/5"]);
    let stored = sessions.stored().unwrap();
    assert_eq!(stored.name, "Bob");
    assert_eq!(stored.token.as_deref(), Some("token-5"));
}

#[test]
fn worker_drives_the_shell_off_thread() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    transport.ok("GET /users", json!([{"id": 1, "name": "Ann", "email": "ann@example.com"}]));

    let mut worker: ApiWorker<CallTag> = ApiWorker::spawn(transport.clone())?;
    let mut shell = shell_with(Rc::new(MemorySessions::default()), Route::Users);
    for (tag, request) in shell.take_outbox() {
        worker.submit(tag, request)?;
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while worker.is_busy() && Instant::now() < deadline {
        for (tag, result) in worker.poll() {
            shell.handle_result(tag, result);
        }
        thread::sleep(Duration::from_millis(5));
    }

    assert!(!worker.is_busy());
    assert!(!shell.is_loading());
    assert_eq!(panel(&shell).rows(), vec![vec!["Ann".to_string(), "ann@example.com".to_string()]]);
    assert_eq!(transport.lines(), vec!["GET /users"]);
    assert_eq!(shell.notices().len(), 0);
    Ok(())
}
