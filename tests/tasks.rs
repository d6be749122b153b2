use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{rt, test, web, App, HttpServer};
use dotenv::dotenv;
use serde_json::json;
use sqlx::PgPool;
use std::net::TcpListener;
use taskvault::auth::{ApiKeyAuth, AuthResponse};
use taskvault::routes;
use taskvault::routes::health;

// Helper struct to hold auth details
struct TestUser {
    id: i32,
    api_key: String,
}

async fn connect_pool() -> PgPool {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB")
}

async fn register_and_login_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    email: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req_register = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp_register = test::call_service(app, req_register).await;
    let resp_status = resp_register.status();
    let auth_response_bytes = test::read_body(resp_register).await;

    if !resp_status.is_success() {
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            resp_status,
            String::from_utf8_lossy(&auth_response_bytes)
        ));
    }
    let auth_response: AuthResponse = serde_json::from_slice(&auth_response_bytes)
        .map_err(|e| format!("Failed to parse registration response: {}", e))?;

    Ok(TestUser {
        id: auth_response.user_id,
        api_key: auth_response.api_key,
    })
}

async fn cleanup_user(pool: &PgPool, username: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(pool)
        .await;
}

fn test_app_config(
    pool: PgPool,
) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(pool)).service(health::health).service(
            web::scope("/api")
                .wrap(ApiKeyAuth)
                .configure(routes::config),
        );
    }
}

// These tests need a provisioned Postgres reachable via DATABASE_URL.
#[ignore]
#[actix_rt::test]
async fn test_task_ownership_isolation() {
    let pool = connect_pool().await;
    cleanup_user(&pool, "owner_a").await;
    cleanup_user(&pool, "owner_b").await;

    let app = test::init_service(
        App::new()
            .wrap(Logger::default())
            .configure(test_app_config(pool.clone())),
    )
    .await;

    let user_a = register_and_login_user(&app, "owner_a", "owner_a@example.com", "Password123!")
        .await
        .expect("Setup: user A");
    let user_b = register_and_login_user(&app, "owner_b", "owner_b@example.com", "Password123!")
        .await
        .expect("Setup: user B");

    // A creates a task
    let req_create = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(("Authorization", format!("Bearer {}", user_a.api_key)))
        .set_json(&json!({ "title": "A's private task" }))
        .to_request();
    let resp_create = test::call_service(&app, req_create).await;
    assert_eq!(resp_create.status(), actix_web::http::StatusCode::CREATED);
    let created: serde_json::Value =
        serde_json::from_slice(&test::read_body(resp_create).await).unwrap();
    let task_id = created.get("id").and_then(|id| id.as_i64()).unwrap();
    assert_eq!(
        created.get("user_id").and_then(|uid| uid.as_i64()),
        Some(user_a.id as i64)
    );

    // B's listing does not include it
    let req_list = test::TestRequest::get()
        .uri("/api/tasks")
        .append_header(("Authorization", format!("Bearer {}", user_b.api_key)))
        .to_request();
    let resp_list = test::call_service(&app, req_list).await;
    assert_eq!(resp_list.status(), actix_web::http::StatusCode::OK);
    let listed: Vec<serde_json::Value> =
        serde_json::from_slice(&test::read_body(resp_list).await).unwrap();
    assert!(
        listed
            .iter()
            .all(|t| t.get("id").and_then(|id| id.as_i64()) != Some(task_id)),
        "B's listing must not contain A's task"
    );

    // B fetching it by id gets NotFound, never Forbidden
    let req_get = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task_id))
        .append_header(("Authorization", format!("Bearer {}", user_b.api_key)))
        .to_request();
    let resp_get = test::call_service(&app, req_get).await;
    assert_eq!(resp_get.status(), actix_web::http::StatusCode::NOT_FOUND);

    // Neither can B update it...
    let req_update = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", task_id))
        .append_header(("Authorization", format!("Bearer {}", user_b.api_key)))
        .set_json(&json!({ "title": "hijacked", "completed": true }))
        .to_request();
    let resp_update = test::call_service(&app, req_update).await;
    assert_eq!(resp_update.status(), actix_web::http::StatusCode::NOT_FOUND);

    // ...or delete it
    let req_delete = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", task_id))
        .append_header(("Authorization", format!("Bearer {}", user_b.api_key)))
        .to_request();
    let resp_delete = test::call_service(&app, req_delete).await;
    assert_eq!(resp_delete.status(), actix_web::http::StatusCode::NOT_FOUND);

    // A still sees it untouched
    let req_get_a = test::TestRequest::get()
        .uri(&format!("/api/tasks/{}", task_id))
        .append_header(("Authorization", format!("Bearer {}", user_a.api_key)))
        .to_request();
    let resp_get_a = test::call_service(&app, req_get_a).await;
    assert_eq!(resp_get_a.status(), actix_web::http::StatusCode::OK);
    let fetched: serde_json::Value =
        serde_json::from_slice(&test::read_body(resp_get_a).await).unwrap();
    assert_eq!(
        fetched.get("title").and_then(|t| t.as_str()),
        Some("A's private task")
    );
    assert_eq!(fetched.get("completed").and_then(|c| c.as_bool()), Some(false));

    cleanup_user(&pool, "owner_a").await;
    cleanup_user(&pool, "owner_b").await;
}

// These tests need a provisioned Postgres reachable via DATABASE_URL.
#[ignore]
#[actix_rt::test]
async fn test_task_filters_stay_owner_scoped() {
    let pool = connect_pool().await;
    cleanup_user(&pool, "filter_user").await;
    cleanup_user(&pool, "filter_bystander").await;

    let app = test::init_service(
        App::new()
            .wrap(Logger::default())
            .configure(test_app_config(pool.clone())),
    )
    .await;

    let user =
        register_and_login_user(&app, "filter_user", "filter_user@example.com", "Password123!")
            .await
            .expect("Setup: filter user");
    let bystander = register_and_login_user(
        &app,
        "filter_bystander",
        "filter_bystander@example.com",
        "Password123!",
    )
    .await
    .expect("Setup: bystander");

    for (title, completed) in [
        ("water the plants", false),
        ("water the garden", true),
        ("file taxes", false),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .append_header(("Authorization", format!("Bearer {}", user.api_key)))
            .set_json(&json!({ "title": title, "completed": completed }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    }
    // A bystander task that matches the search term but belongs to someone else
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(("Authorization", format!("Bearer {}", bystander.api_key)))
        .set_json(&json!({ "title": "water the horses" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

    let req_search = test::TestRequest::get()
        .uri("/api/tasks?search=water&completed=false")
        .append_header(("Authorization", format!("Bearer {}", user.api_key)))
        .to_request();
    let resp_search = test::call_service(&app, req_search).await;
    assert_eq!(resp_search.status(), actix_web::http::StatusCode::OK);
    let found: Vec<serde_json::Value> =
        serde_json::from_slice(&test::read_body(resp_search).await).unwrap();
    assert_eq!(found.len(), 1, "Filters apply on top of the owner scope");
    assert_eq!(
        found[0].get("title").and_then(|t| t.as_str()),
        Some("water the plants")
    );

    cleanup_user(&pool, "filter_user").await;
    cleanup_user(&pool, "filter_bystander").await;
}

// These tests need a provisioned Postgres reachable via DATABASE_URL.
#[ignore]
#[actix_rt::test]
async fn test_admin_endpoints_require_staff() {
    let pool = connect_pool().await;
    cleanup_user(&pool, "plain_user").await;
    cleanup_user(&pool, "staff_user").await;

    let app = test::init_service(
        App::new()
            .wrap(Logger::default())
            .configure(test_app_config(pool.clone())),
    )
    .await;

    let plain =
        register_and_login_user(&app, "plain_user", "plain_user@example.com", "Password123!")
            .await
            .expect("Setup: plain user");
    let staff =
        register_and_login_user(&app, "staff_user", "staff_user@example.com", "Password123!")
            .await
            .expect("Setup: staff user");

    // Registration never yields staff; promotion happens out of band.
    sqlx::query("UPDATE users SET is_staff = TRUE WHERE id = $1")
        .bind(staff.id)
        .execute(&pool)
        .await
        .expect("Setup: failed to promote staff user");

    // Give the plain user a task for the staff listing to find
    let req_task = test::TestRequest::post()
        .uri("/api/tasks")
        .append_header(("Authorization", format!("Bearer {}", plain.api_key)))
        .set_json(&json!({ "title": "inspectable task" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req_task).await.status(),
        actix_web::http::StatusCode::CREATED
    );

    // Non-staff gets Forbidden on the user listing (the endpoint is not secret)
    let req_users = test::TestRequest::get()
        .uri("/api/users")
        .append_header(("Authorization", format!("Bearer {}", plain.api_key)))
        .to_request();
    let resp_users = test::call_service(&app, req_users).await;
    assert_eq!(resp_users.status(), actix_web::http::StatusCode::FORBIDDEN);

    // ...and on another user's task listing
    let req_other = test::TestRequest::get()
        .uri(&format!("/api/users/{}/tasks", staff.id))
        .append_header(("Authorization", format!("Bearer {}", plain.api_key)))
        .to_request();
    let resp_other = test::call_service(&app, req_other).await;
    assert_eq!(resp_other.status(), actix_web::http::StatusCode::FORBIDDEN);

    // Staff sees the full account list
    let req_staff_users = test::TestRequest::get()
        .uri("/api/users")
        .append_header(("Authorization", format!("Bearer {}", staff.api_key)))
        .to_request();
    let resp_staff_users = test::call_service(&app, req_staff_users).await;
    assert_eq!(resp_staff_users.status(), actix_web::http::StatusCode::OK);
    let users: Vec<serde_json::Value> =
        serde_json::from_slice(&test::read_body(resp_staff_users).await).unwrap();
    let ids: Vec<i64> = users
        .iter()
        .filter_map(|u| u.get("id").and_then(|id| id.as_i64()))
        .collect();
    assert!(ids.contains(&(plain.id as i64)));
    assert!(ids.contains(&(staff.id as i64)));

    // Staff can inspect the plain user's tasks
    let req_inspect = test::TestRequest::get()
        .uri(&format!("/api/users/{}/tasks", plain.id))
        .append_header(("Authorization", format!("Bearer {}", staff.api_key)))
        .to_request();
    let resp_inspect = test::call_service(&app, req_inspect).await;
    assert_eq!(resp_inspect.status(), actix_web::http::StatusCode::OK);
    let tasks: Vec<serde_json::Value> =
        serde_json::from_slice(&test::read_body(resp_inspect).await).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(
        tasks[0].get("title").and_then(|t| t.as_str()),
        Some("inspectable task")
    );

    // Absent target user is NotFound even for staff
    let req_absent = test::TestRequest::get()
        .uri("/api/users/2147483646/tasks")
        .append_header(("Authorization", format!("Bearer {}", staff.api_key)))
        .to_request();
    let resp_absent = test::call_service(&app, req_absent).await;
    assert_eq!(resp_absent.status(), actix_web::http::StatusCode::NOT_FOUND);

    cleanup_user(&pool, "plain_user").await;
    cleanup_user(&pool, "staff_user").await;
}

// These tests need a provisioned Postgres reachable via DATABASE_URL.
// Middleware rejections surface as service errors under test::call_service,
// so this end-to-end flow runs against a real server over HTTP.
#[ignore]
#[actix_rt::test]
async fn test_end_to_end_key_lifecycle() {
    let pool = connect_pool().await;
    cleanup_user(&pool, "e2e_user").await;
    cleanup_user(&pool, "e2e_other").await;

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener); // Drop the listener so the server can bind to it

    let server_pool = pool.clone();
    let _server_handle = rt::spawn(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_pool.clone()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(
                    web::scope("/api")
                        .wrap(ApiKeyAuth)
                        .configure(routes::config),
                )
        })
        .bind(("127.0.0.1", port))
        .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
        .run()
        .await
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    // No key at all -> 401 before any handler runs
    let resp = client
        .post(format!("{}/api/tasks", base))
        .json(&json!({ "title": "Unauthorized Task" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Obtain keys for two identities
    let register: AuthResponse = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({
            "username": "e2e_user",
            "email": "e2e_user@example.com",
            "password": "Password123!"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .expect("Failed to parse registration response");
    let other: AuthResponse = client
        .post(format!("{}/api/auth/register", base))
        .json(&json!({
            "username": "e2e_other",
            "email": "e2e_other@example.com",
            "password": "Password123!"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .expect("Failed to parse registration response");

    // Login with valid credentials returns the same key K
    let login: AuthResponse = client
        .post(format!("{}/api/auth/login", base))
        .json(&json!({ "username": "e2e_user", "password": "Password123!" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .expect("Failed to parse login response");
    assert_eq!(login.api_key, register.api_key);
    let old_key = login.api_key.clone();

    // Present K, create a task
    let create_resp = client
        .post(format!("{}/api/tasks", base))
        .bearer_auth(&old_key)
        .json(&json!({ "title": "buy milk", "completed": false, "due_date": "2026-08-14T12:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), reqwest::StatusCode::CREATED);
    let created: serde_json::Value = create_resp.json().await.unwrap();
    let task_id = created.get("id").and_then(|id| id.as_i64()).unwrap();
    assert_eq!(
        created.get("user_id").and_then(|uid| uid.as_i64()),
        Some(login.user_id as i64)
    );

    // A different identity's key cannot see it
    let other_resp = client
        .get(format!("{}/api/tasks/{}", base, task_id))
        .bearer_auth(&other.api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(other_resp.status(), reqwest::StatusCode::NOT_FOUND);

    // Rotate the key
    let rotated: AuthResponse = client
        .post(format!("{}/api/auth/rotate", base))
        .bearer_auth(&old_key)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .expect("Failed to parse rotation response");
    assert_ne!(rotated.api_key, old_key);

    // The old key is dead for any request
    let stale_resp = client
        .get(format!("{}/api/tasks", base))
        .bearer_auth(&old_key)
        .send()
        .await
        .unwrap();
    assert_eq!(stale_resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // The new key works
    let fresh_resp = client
        .get(format!("{}/api/tasks/{}", base, task_id))
        .bearer_auth(&rotated.api_key)
        .send()
        .await
        .unwrap();
    assert_eq!(fresh_resp.status(), reqwest::StatusCode::OK);

    cleanup_user(&pool, "e2e_user").await;
    cleanup_user(&pool, "e2e_other").await;
}
