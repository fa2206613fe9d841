use waymark::{MatchError, Router};

#[test]
fn remove_basic() {
    let mut router = Router::new();
    router.insert("/home", "home").unwrap();
    router.insert("/home/{id}", "id").unwrap();
    router.insert("/home/{id}/posts", "posts").unwrap();

    assert_eq!(router.remove("/home/{id}"), Some("id"));
    assert_eq!(router.at("/home/1").unwrap_err(), MatchError::NotFound);

    // the sibling routes survive
    assert_eq!(*router.at("/home").unwrap().value, "home");
    assert_eq!(*router.at("/home/1/posts").unwrap().value, "posts");

    router.check_priorities().unwrap();
}

#[test]
fn remove_returns_none_for_missing_routes() {
    let mut router = Router::new();
    router.insert("/users/{id}", 1).unwrap();

    assert_eq!(router.remove("/users"), None);
    assert_eq!(router.remove("/users/"), None);
    assert_eq!(router.remove("/users/{id}/posts"), None);
    assert_eq!(router.remove(""), None);
    // malformed patterns cannot have been registered
    assert_eq!(router.remove("/users/{"), None);

    assert_eq!(*router.at("/users/1").unwrap().value, 1);
    router.check_priorities().unwrap();
}

#[test]
fn remove_is_verbatim() {
    let mut router = Router::new();
    router.insert("/users/{id}", "id").unwrap();

    // a pattern only removes the route it spells exactly
    assert_eq!(router.remove("/users/{other}"), None);
    assert_eq!(router.remove("/users/{id}"), Some("id"));

    router.insert("/lit/{{a}}", "literal").unwrap();
    assert_eq!(router.remove("/lit/{a}"), None);
    assert_eq!(router.remove("/lit/{{a}}"), Some("literal"));
}

#[test]
fn remove_catchall() {
    let mut router = Router::new();
    router.insert("/static/{*path}", true).unwrap();

    assert_eq!(router.remove("/static/{*other}"), None);
    assert_eq!(router.remove("/static/{*path}"), Some(true));
    assert!(router.at("/static/css/app.css").is_err());

    // the slot is free again
    router.insert("/static/{*other}", true).unwrap();
    assert_eq!(
        router.at("/static/css").unwrap().params.get("other"),
        Some("css")
    );
}

#[test]
fn remove_suffix_param() {
    let mut router = Router::new();
    router.insert("/files/{name}.txt", 1).unwrap();

    assert_eq!(router.remove("/files/{name}"), None);
    assert_eq!(router.remove("/files/{name}.md"), None);
    assert_eq!(router.remove("/files/{name}.txt"), Some(1));
    assert!(router.at("/files/readme.txt").is_err());
}

#[test]
fn remove_merges_split_nodes() {
    let mut router = Router::new();
    router.insert("/foo", 1).unwrap();
    router.insert("/foobar", 2).unwrap();

    assert_eq!(router.remove("/foo"), Some(1));
    assert_eq!(*router.at("/foobar").unwrap().value, 2);
    assert!(router.at("/foo").is_err());
    router.check_priorities().unwrap();

    // and the split can be re-created
    router.insert("/foo", 3).unwrap();
    assert_eq!(*router.at("/foo").unwrap().value, 3);
    assert_eq!(*router.at("/foobar").unwrap().value, 2);
    router.check_priorities().unwrap();
}

#[test]
fn remove_and_reinsert() {
    let mut router = Router::new();
    let routes = [
        "/",
        "/users/{id}",
        "/users/{id}/posts",
        "/files/{name}.txt",
        "/static/{*path}",
        "/lit/{{a}}",
    ];

    for route in routes {
        router.insert(route, route.to_owned()).unwrap();
    }

    // removing and re-inserting every route leaves the router equivalent
    for route in routes {
        assert_eq!(router.remove(route), Some(route.to_owned()), "{route}");
        router.insert(route, route.to_owned()).unwrap();
        router.check_priorities().unwrap();
    }

    assert_eq!(*router.at("/users/4/posts").unwrap().value, "/users/{id}/posts");
    assert_eq!(*router.at("/static/a/b/c").unwrap().value, "/static/{*path}");
    assert_eq!(*router.at("/lit/{a}").unwrap().value, "/lit/{{a}}");
}

#[test]
fn drain_by_removal() {
    let mut router = Router::new();
    let routes = ["/a", "/a/b", "/a/{x}", "/a/{x}/y", "/z/{*rest}"];

    for route in routes {
        router.insert(route, route.to_owned()).unwrap();
    }

    for route in routes {
        assert_eq!(router.remove(route), Some(route.to_owned()), "{route}");
        assert_eq!(router.remove(route), None, "{route}");
        router.check_priorities().unwrap();
    }

    // the router is empty again
    for route in routes {
        assert!(router.at("/a").is_err(), "{route}");
    }
    router.insert("/", 0.to_string()).unwrap();
    assert_eq!(*router.at("/").unwrap().value, 0.to_string());
}
