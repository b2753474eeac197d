use crate::{
    auth::Authenticated,
    error::AppError,
    models::{Task, TaskInput, TaskQuery, TaskUpdate},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `"true"` keeps only finished tasks; any other
///   value keeps only unfinished ones.
/// - `sortBy` (optional): `<field>:<direction>`, e.g. `createdAt:desc`.
///   Direction defaults to ascending unless the segment is exactly "desc".
/// - `limit` / `skip` (optional): page size and offset. Values that do not
///   parse as integers are ignored.
///
/// ## Responses:
/// - `200 OK`: a JSON array of the caller's matching tasks. Never anyone
///   else's, whatever the filters say.
/// - `401 Unauthorized`: missing or invalid token.
/// - `500 Internal Server Error`: database failure.
#[get("/tasks")]
#[allow(unused_assignments)]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    query_params: web::Query<TaskQuery>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    // Base query scoped to the owner; filter and pagination clauses are
    // appended dynamically.
    let mut sql = String::from(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE owner = $1",
    );
    let mut param_count = 2;

    let completed = query_params.completed_filter();
    if completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    // The sort column comes from a fixed whitelist, never from raw input.
    match query_params.sort() {
        Some((column, descending)) => {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                column,
                if descending { "DESC" } else { "ASC" }
            ));
        }
        None => sql.push_str(" ORDER BY created_at ASC"),
    }

    let limit = query_params.limit();
    if limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }

    let skip = query_params.skip();
    if skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
        param_count += 1;
    }

    let mut query_builder = sqlx::query_as::<_, Task>(&sql);

    query_builder = query_builder.bind(auth.user.id);

    if let Some(completed) = completed {
        query_builder = query_builder.bind(completed);
    }
    if let Some(limit) = limit {
        query_builder = query_builder.bind(limit);
    }
    if let Some(skip) = skip {
        query_builder = query_builder.bind(skip);
    }

    let tasks = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: at least 5 characters after trimming (required).
/// - `completed` (optional): defaults to false.
///
/// The owner always comes from the session, never from the body.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: validation failure.
/// - `401 Unauthorized`: missing or invalid token.
#[post("/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    task_data: web::Json<TaskInput>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let mut input = task_data.into_inner();
    input.normalize();
    input.validate()?;

    let task = Task::new(input, auth.user.id);

    let result = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (id, description, completed, owner) VALUES ($1, $2, $3, $4) \
         RETURNING id, description, completed, owner, created_at, updated_at",
    )
    .bind(task.id)
    .bind(&task.description)
    .bind(task.completed)
    .bind(task.owner)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(result))
}

/// Retrieves a single task by id.
///
/// The lookup is scoped to the authenticated owner, so a task belonging to
/// someone else is indistinguishable from one that does not exist.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `401 Unauthorized`: missing or invalid token.
/// - `404 Not Found`: no such task for this owner.
#[get("/tasks/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE id = $1 AND owner = $2",
    )
    .bind(task_id.into_inner())
    .bind(auth.user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("No tasks found".into())),
    }
}

/// Updates a task owned by the authenticated user.
///
/// The body may carry any subset of {description, completed}; any other key
/// fails deserialization with 400 before this handler runs.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: unknown field, validation failure, or no matching
///   task. Absent and foreign tasks answer 400 here rather than the 404 the
///   GET and DELETE routes use; clients rely on this response, so it stays.
/// - `401 Unauthorized`: missing or invalid token.
#[patch("/tasks/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdate>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let mut update = task_data.into_inner();
    update.normalize();
    update.validate()?;

    let task = sqlx::query_as::<_, Task>(
        "SELECT id, description, completed, owner, created_at, updated_at \
         FROM tasks WHERE id = $1 AND owner = $2",
    )
    .bind(task_id.into_inner())
    .bind(auth.user.id)
    .fetch_optional(&**pool)
    .await?;

    let mut task = task.ok_or_else(|| AppError::BadRequest("No task to update".into()))?;

    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(completed) = update.completed {
        task.completed = completed;
    }

    let result = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET description = $1, completed = $2, updated_at = now() \
         WHERE id = $3 AND owner = $4 \
         RETURNING id, description, completed, owner, created_at, updated_at",
    )
    .bind(&task.description)
    .bind(task.completed)
    .bind(task.id)
    .bind(auth.user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// Deletes a task owned by the authenticated user.
///
/// ## Responses:
/// - `200 OK`: the deleted `Task`.
/// - `401 Unauthorized`: missing or invalid token.
/// - `404 Not Found`: no such task for this owner.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    task_id: web::Path<Uuid>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "DELETE FROM tasks WHERE id = $1 AND owner = $2 \
         RETURNING id, description, completed, owner, created_at, updated_at",
    )
    .bind(task_id.into_inner())
    .bind(auth.user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("No tasks found".into())),
    }
}
