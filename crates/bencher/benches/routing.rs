use bencher::{TestGroup, route_cases};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use micro_rest::http::{HeaderValue, Method, header::CONTENT_TYPE};
use micro_rest::{Dispatcher, HandlerMethod, Json, Param, RequestContext, RouteTable, ServiceRegistry};
use serde::{Deserialize, Serialize};
use std::hint::black_box;

struct Bench;

#[derive(Deserialize, Serialize)]
struct Item {
    name: String,
    tags: Vec<String>,
}

fn route_table(templates: &[&'static str]) -> RouteTable {
    RouteTable::build(templates.iter().enumerate().map(|(n, template)| {
        HandlerMethod::of::<Bench>(format!("route_{n}")).get(*template).direct(|_: &Bench| ())
    }))
}

fn benchmark_route_matching(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("route_matching");

    for case in route_cases() {
        let table = route_table(case.templates());
        group.bench_with_input(BenchmarkId::new(case.group().name(), case.name()), &case, |b, case| {
            b.iter(|| black_box(table.find(&Method::GET, black_box(case.path())).is_some()));
        });
    }

    group.finish();
}

fn benchmark_route_table_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("route_table_build");

    for test_group in TestGroup::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(test_group.name()), test_group.templates(), |b, templates| {
            b.iter(|| black_box(route_table(templates).len()));
        });
    }

    group.finish();
}

fn benchmark_dispatch(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime should build");

    let routes = RouteTable::build([HandlerMethod::of::<Bench>("tag")
        .post("/items/{id}")
        .param(Param::path("id"))
        .param(Param::body())
        .deferred(|_: std::sync::Arc<Bench>, id: u64, Json(mut item): Json<Item>| async move {
            item.tags.push(id.to_string());
            Json(item)
        })]);
    let dispatcher = Dispatcher::builder()
        .route_table(routes)
        .service_provider(ServiceRegistry::builder().singleton(Bench).build())
        .build()
        .expect("dispatcher should build");

    criterion.bench_function("dispatch_deferred_json", |b| {
        b.iter_batched(
            || {
                RequestContext::new(Method::POST, "/items/42")
                    .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .with_body(r#"{"name":"x","tags":["a","b"]}"#)
            },
            |request| black_box(runtime.block_on(dispatcher.serve(request, &micro_rest::NotFound))),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(routing, benchmark_route_matching, benchmark_route_table_build, benchmark_dispatch);
criterion_main!(routing);
