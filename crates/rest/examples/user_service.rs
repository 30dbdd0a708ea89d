use micro_rest::error::HandlerError;
use micro_rest::http::header::{ACCEPT, CONTENT_TYPE};
use micro_rest::http::{HeaderValue, Method};
use micro_rest::{Dispatcher, HandlerMethod, Json, NotFound, Param, RequestContext, RouteTable, Serializers, ServiceRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct User {
    name: String,
    zip: String,
}

#[derive(Default)]
pub struct UserService {
    users: RwLock<BTreeMap<u64, User>>,
}

impl UserService {
    async fn create(&self, user: User) -> u64 {
        let mut users = self.users.write().await;
        let id = users.keys().next_back().map_or(1, |id| id + 1);
        users.insert(id, user);
        id
    }

    async fn find(&self, id: u64) -> Result<User, HandlerError> {
        self.users.read().await.get(&id).cloned().ok_or_else(|| HandlerError::failed(format!("no user {id}")))
    }

    async fn list(&self, zip: Option<String>, limit: usize) -> Vec<User> {
        let users = self.users.read().await;
        users.values().filter(|user| zip.as_ref().is_none_or(|zip| user.zip == *zip)).take(limit).cloned().collect()
    }
}

fn routes() -> RouteTable {
    RouteTable::build([
        // curl -X POST -H 'Content-Type: application/json' -d '{"name":"hello","zip":"world"}' /users
        HandlerMethod::of::<UserService>("create").post("/users").param(Param::body()).deferred(
            |service: Arc<UserService>, Json(user): Json<User>| async move { service.create(user).await },
        ),
        HandlerMethod::of::<UserService>("find")
            .get("/users/{id}")
            .param(Param::path("id"))
            .deferred(|service: Arc<UserService>, id: u64| async move { service.find(id).await.map(Json) }),
        HandlerMethod::of::<UserService>("list")
            .get("/users")
            .param(Param::query("zip"))
            .param(Param::query("limit").default_value("10"))
            .deferred(|service: Arc<UserService>, zip: String, limit: usize| async move {
                let zip = if zip.is_empty() { None } else { Some(zip) };
                Json(service.list(zip, limit).await)
            }),
        HandlerMethod::of::<UserService>("version").get("/version").direct(|_: &UserService| env!("CARGO_PKG_VERSION")),
    ])
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let dispatcher = Dispatcher::builder()
        .route_table(routes())
        .service_provider(ServiceRegistry::builder().singleton(UserService::default()).build())
        .serializers(Serializers::default())
        .build()
        .expect("dispatcher configuration is complete");

    let requests = [
        RequestContext::new(Method::POST, "/users")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"name":"hello","zip":"world"}"#),
        RequestContext::new(Method::POST, "/users")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
            .with_body("name=other&zip=place"),
        RequestContext::new(Method::GET, "/users/1"),
        RequestContext::new(Method::GET, "/users").with_query("zip", "place"),
        RequestContext::new(Method::GET, "/users/2").with_header(ACCEPT, HeaderValue::from_static("application/x-www-form-urlencoded")),
        RequestContext::new(Method::GET, "/users/9"),
        RequestContext::new(Method::GET, "/version"),
        RequestContext::new(Method::GET, "/missing"),
    ];

    for request in requests {
        let (method, path) = (request.method().clone(), request.path().to_owned());
        let response = dispatcher.serve(request, &NotFound).await;
        info!(%method, path = %path, status = %response.status(), body = %response.body(), "dispatched");
    }
}
