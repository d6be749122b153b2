use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Task, TaskInput, TaskQuery},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Retrieves a list of tasks for the authenticated user.
///
/// The query is scoped to the requester's tasks before any filter applies;
/// there is no unscoped listing to post-filter. Supports filtering by
/// `completed` state and a case-insensitive `search` term over titles.
/// Tasks are ordered by creation date in descending order.
///
/// ## Query Parameters:
/// - `completed` (optional): Filters tasks by completion state.
/// - `search` (optional): A string to search for in task titles (case-insensitive).
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    // Base query selects the requester's tasks; optional filters are appended
    // with their bind positions tracked by hand.
    let mut sql = String::from(
        "SELECT id, title, completed, due_date, created_at, user_id \
         FROM tasks WHERE user_id = $1",
    );
    let mut param_count = 2;

    if query_params.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }
    if query_params.search.is_some() {
        sql.push_str(&format!(" AND title ILIKE ${}", param_count));
    }

    sql.push_str(" ORDER BY created_at DESC");

    let mut query_builder = sqlx::query_as::<_, Task>(&sql);

    query_builder = query_builder.bind(user.id);

    if let Some(completed) = query_params.completed {
        query_builder = query_builder.bind(completed);
    }
    if let Some(search) = &query_params.search {
        query_builder = query_builder.bind(format!("%{}%", search));
    }

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// Ownership is assigned from the resolved identity, never from the payload.
///
/// ## Request Body:
/// A JSON object matching the `TaskInput` struct:
/// - `title`: The title of the task (required, 1-200 characters).
/// - `completed` (optional): Completion state, defaults to false.
/// - `due_date` (optional): The due date for the task.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    // Validate input
    task_data.validate()?;

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (title, completed, due_date, user_id)
         VALUES ($1, $2, $3, $4)
         RETURNING id, title, completed, due_date, created_at, user_id",
    )
    .bind(&task_data.title)
    .bind(task_data.completed)
    .bind(task_data.due_date)
    .bind(user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// The lookup filters by `(id, user_id)` in one query, so a task owned by
/// someone else surfaces exactly like a missing one.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON if found and owned by the user.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `404 Not Found`: If the task does not exist or is not owned by the authenticated user.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, title, completed, due_date, created_at, user_id
         FROM tasks WHERE id = $1 AND user_id = $2",
    )
    .bind(task_id.into_inner())
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Updates an existing task.
///
/// The ownership check and the mutation are one filtered UPDATE, not a fetch
/// followed by an in-memory check. Title, completion state, and due date are
/// the only mutable fields; `created_at` and the owner are immutable.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `404 Not Found`: If the task does not exist or is not owned by the authenticated user.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks
         SET title = $1, completed = $2, due_date = $3
         WHERE id = $4 AND user_id = $5
         RETURNING id, title, completed, due_date, created_at, user_id",
    )
    .bind(&task_data.title)
    .bind(task_data.completed)
    .bind(task_data.due_date)
    .bind(task_id.into_inner())
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `401 Unauthorized`: If the request lacks a valid API key.
/// - `404 Not Found`: If the task does not exist or is not owned by the authenticated user.
/// - `500 Internal Server Error`: For database errors or other unexpected issues.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id.into_inner())
        .bind(user.id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
