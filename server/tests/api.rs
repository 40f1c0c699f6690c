use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use scraping::models::{Course, Discipline, Requirement, Semester, SemesterEntry, Variant};
use search::SearchCache;
use server::services::{CourseDirectory, DisciplineDirectory};
use server::{build_app, AppState, Bootstrap, Config, Profile};

fn disciplines() -> Vec<Discipline> {
    vec![
        Discipline {
            code: "MC102".into(),
            name: "Algoritmos e Programação de Computadores".into(),
            credits: 6,
            reqs: None,
            req_by: Some(["MC202".to_string()].into_iter().collect()),
            syllabus: "Conceitos básicos de organização de computadores.".into(),
        },
        Discipline {
            code: "MC202".into(),
            name: "Estruturas de Dados".into(),
            credits: 6,
            reqs: Some(vec![vec![Requirement::new("MC102")]]),
            req_by: None,
            syllabus: "Listas lineares, árvores e suas generalizações.".into(),
        },
        Discipline {
            code: "F 128".into(),
            name: "Física Geral I".into(),
            credits: 4,
            reqs: None,
            req_by: None,
            syllabus: "Mecânica newtoniana da partícula.".into(),
        },
    ]
}

fn courses() -> Vec<Course> {
    let first = Semester {
        disciplines: vec![
            SemesterEntry { code: "F 128".into(), credits: 4 },
            SemesterEntry { code: "MA111".into(), credits: 6 },
        ],
        electives: 0,
    };
    let second = Semester {
        disciplines: vec![SemesterEntry { code: "F 228".into(), credits: 4 }],
        electives: 8,
    };
    vec![Course {
        code: "34".into(),
        name: "Física".into(),
        variants: vec![
            Variant { code: "AA".into(), name: "Física".into(), tree: vec![first.clone()] },
            Variant { code: "AB".into(), name: "Física Aplicada".into(), tree: vec![first.clone()] },
            Variant { code: "AX".into(), name: "Núcleo Comum".into(), tree: vec![first, second] },
        ],
        tree: None,
    }]
}

fn app(profile: Profile) -> (Router, tempfile::TempDir) {
    let resources = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::new(profile, resources.path().to_path_buf(), 0));

    let cache = Arc::new(SearchCache::new());
    cache.overwrite(disciplines());
    cache.overwrite(courses());

    let boot = Arc::new(Bootstrap::new(config.scrape_env().unwrap(), cache));
    boot.install(DisciplineDirectory::new(disciplines()));
    boot.install(CourseDirectory::new(courses()));

    (build_app(AppState { config, boot }), resources)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn discipline_lookup_returns_the_record() {
    let (app, _dir) = app(Profile::Testing);
    let (status, json) = get_json(app, "/api/disciplina/MC102").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "MC102");
    assert_eq!(json["credits"], 6);
    assert_eq!(json["name"], "Algoritmos e Programação de Computadores");
    let req_by = json["reqBy"].as_array().unwrap();
    assert!(req_by.contains(&Value::String("MC202".into())));
}

#[tokio::test]
async fn discipline_lookup_is_exact_and_case_sensitive() {
    let (app, _dir) = app(Profile::Testing);
    let (status, _) = get(app.clone(), "/api/disciplina/MC1022").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(app, "/api/disciplina/mc102").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn course_preview_lists_variants() {
    let (app, _dir) = app(Profile::Testing);
    let (status, json) = get_json(app, "/api/curso/34").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "34");
    let variants: Vec<&str> =
        json["variants"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(variants, vec!["AA", "AB", "AX"]);
}

#[tokio::test]
async fn course_tree_resolves_variants_by_index() {
    let (app, _dir) = app(Profile::Testing);
    let (status, json) = get_json(app.clone(), "/api/curso/34/2").await;
    assert_eq!(status, StatusCode::OK);
    let first_semester = &json[0];
    assert_eq!(first_semester["electives"], 0);
    let disciplines = first_semester["disciplines"].as_array().unwrap();
    assert!(disciplines
        .iter()
        .any(|d| d["code"] == "F 128" && d["credits"] == 4));

    let (status, _) = get(app, "/api/curso/34/3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_limit_must_be_a_plain_integer() {
    let (app, _dir) = app(Profile::Testing);
    for uri in ["/api/busca?query=mc102&limit=cinco", "/api/busca?query=mc102&limit=10.0"] {
        let (status, _) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn empty_query_returns_an_empty_page() {
    let (app, _dir) = app(Profile::Testing);
    let (status, json) = get_json(app, "/api/busca?query=&limit=25").await;
    assert_eq!(status, StatusCode::OK);
    let results = json.as_array().unwrap();
    assert!(results.len() <= 25);
}

#[tokio::test]
async fn searching_a_tree_discipline_code_ranks_it_first() {
    let (app, _dir) = app(Profile::Testing);
    let (status, json) = get_json(app, "/api/busca?query=F%20128&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let results = json.as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["code"], "F 128");
    assert_eq!(results[0]["content"], "discipline");
}

#[tokio::test]
async fn results_hide_scores_and_hidden_fields_by_default() {
    let (app, _dir) = app(Profile::Testing);
    let (_, json) = get_json(app, "/api/busca?query=mc102&limit=5").await;
    for result in json.as_array().unwrap() {
        assert!(result.get("score").is_none());
        assert!(result.get("syllabus").is_none());
    }
}

#[tokio::test]
async fn development_profile_exposes_scores_and_hidden_fields() {
    let (app, _dir) = app(Profile::Development);
    let (_, json) = get_json(app, "/api/busca?query=mc102&limit=5").await;
    let results = json.as_array().unwrap();
    assert!(!results.is_empty());
    for result in results {
        assert!(result["score"].is_f64());
        if result["content"] == "discipline" {
            assert!(result.get("syllabus").is_some());
        }
    }
}

#[tokio::test]
async fn merged_results_are_sorted_across_corpora() {
    let (app, _dir) = app(Profile::Development);
    let (_, json) = get_json(app, "/api/busca?query=fisica&limit=50").await;
    let scores: Vec<f64> =
        json.as_array().unwrap().iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(!scores.is_empty());
    for pair in scores.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    // both corpora respond to "fisica"
    let contents: Vec<&str> =
        json.as_array().unwrap().iter().filter_map(|r| r["content"].as_str()).collect();
    assert!(contents.contains(&"discipline"));
    assert!(contents.contains(&"course"));
}

#[tokio::test]
async fn api_root_and_unknown_api_paths() {
    let (app, _dir) = app(Profile::Testing);
    let (status, _) = get(app.clone(), "/api/").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(app, "/api/nope/nada").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_query_parameter_is_a_bad_request() {
    let (app, _dir) = app(Profile::Testing);
    let (status, _) = get(app, "/api/busca?limit=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uninitialized_services_yield_503() {
    let resources = tempfile::tempdir().unwrap();
    let config = Arc::new(Config::new(Profile::Testing, resources.path().to_path_buf(), 0));
    let boot =
        Arc::new(Bootstrap::new(config.scrape_env().unwrap(), Arc::new(SearchCache::new())));
    let app = build_app(AppState { config, boot });

    let (status, _) = get(app.clone(), "/api/disciplina/MC102").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = get(app.clone(), "/api/curso/34").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    // search still answers, just with nothing in the caches
    let (status, json) = get_json(app, "/api/busca?query=mc102").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Array(vec![]));
}

#[tokio::test]
async fn non_api_paths_stream_the_static_index() {
    let resources = tempfile::tempdir().unwrap();
    let public = resources.path().join("Public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<html>planner</html>").unwrap();

    let config = Arc::new(Config::new(Profile::Testing, resources.path().to_path_buf(), 0));
    let boot =
        Arc::new(Bootstrap::new(config.scrape_env().unwrap(), Arc::new(SearchCache::new())));
    let app = build_app(AppState { config, boot });

    for uri in ["/", "/planejador/qualquer/rota"] {
        let (status, body) = get(app.clone(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body.as_ref(), b"<html>planner</html>");
    }
}
