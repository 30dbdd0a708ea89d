/// A request path looked up in the route table of its group.
#[derive(Debug, Copy, Clone)]
pub struct RouteCase {
    name: &'static str,
    group: TestGroup,
    path: &'static str,
}

impl RouteCase {
    pub const fn new(name: &'static str, group: TestGroup, path: &'static str) -> Self {
        Self { name, group, path }
    }

    pub const fn small(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Small, path)
    }

    pub const fn large(name: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Large, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn templates(&self) -> &'static [&'static str] {
        self.group.templates()
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// The size of the api a route table is built from.
#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

impl TestGroup {
    pub const ALL: [TestGroup; 2] = [TestGroup::Small, TestGroup::Large];

    pub fn name(self) -> &'static str {
        match self {
            TestGroup::Small => "small",
            TestGroup::Large => "large",
        }
    }

    pub fn templates(self) -> &'static [&'static str] {
        match self {
            TestGroup::Small => SMALL_API,
            TestGroup::Large => LARGE_API,
        }
    }
}

pub static SMALL_API: &[&str] = &["/ping", "/users", "/users/{id}", "/users/{id}/posts", "/users/{id}/posts/{post}"];

pub static LARGE_API: &[&str] = &[
    "/ping",
    "/health",
    "/metrics",
    "/users",
    "/users/me",
    "/users/{id}",
    "/users/{id}/avatar",
    "/users/{id}/followers",
    "/users/{id}/following",
    "/users/{id}/posts",
    "/users/{id}/posts/{post}",
    "/users/{id}/posts/{post}/comments",
    "/users/{id}/posts/{post}/comments/{comment}",
    "/users/{id}/posts/{post}/likes",
    "/orders",
    "/orders/{order}",
    "/orders/{order}/items",
    "/orders/{order}/items/{item}",
    "/orders/{order}/invoice",
    "/catalog",
    "/catalog/{category}",
    "/catalog/{category}/{product}",
    "/catalog/{category}/{product}/reviews",
    "/search",
    "/files/{bucket}/{name}",
];

pub fn route_cases() -> Vec<RouteCase> {
    vec![
        RouteCase::small("static_first", "/ping"),
        RouteCase::small("placeholder_last", "/users/42/posts/hello-world"),
        RouteCase::small("miss", "/unknown/path"),
        RouteCase::large("static", "/search"),
        RouteCase::large("nested", "/users/42/posts/7/comments/99"),
        RouteCase::large("last_registered", "/files/assets/logo.min.png"),
        RouteCase::large("miss", "/users/42/posts/7/comments/99/replies"),
    ]
}
