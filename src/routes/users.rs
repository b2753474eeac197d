use crate::{
    auth::{generate_token, hash_password, verify_password, AuthResponse, Authenticated, LoginRequest},
    avatar,
    email::Mailer,
    error::AppError,
    models::{User, UserInput, UserUpdate},
};
use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::StreamExt;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Mints a session token for `user_id` and appends it to the user's token
/// list, returning the fresh row.
async fn append_token(pool: &PgPool, user_id: Uuid, token: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET tokens = array_append(tokens, $1), updated_at = now() WHERE id = $2 \
         RETURNING id, name, age, email, password, tokens, avatar, created_at, updated_at",
    )
    .bind(token)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Sign up a new user.
///
/// Persists the account (password stored as a bcrypt hash), fires the welcome
/// email in the background, and opens a first session.
///
/// ## Responses:
/// - `201 Created`: `{user, token}`.
/// - `400 Bad Request`: validation failure or duplicate email.
#[post("/users")]
pub async fn create_user(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    body: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    let mut input = body.into_inner();
    input.normalize();
    input.validate()?;

    // Check if email already exists
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(&input.email)
        .fetch_optional(&**pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Email is already in use".into()));
    }

    let password_hash = hash_password(&input.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, age, email, password) VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, age, email, password, tokens, avatar, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.age)
    .bind(&input.email)
    .bind(&password_hash)
    .fetch_one(&**pool)
    .await?;

    // Best-effort; a mail failure never affects the response.
    mailer.send_welcome(&user.email, &user.name);

    let token = generate_token(user.id)?;
    let user = append_token(&pool, user.id, &token).await?;

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log in with email and password.
///
/// An unknown email and a wrong password produce the identical response, so
/// the two cases cannot be told apart from outside.
///
/// ## Responses:
/// - `200 OK`: `{user, token}` with a freshly minted token.
/// - `400 Bad Request`: "Unable to login!".
#[post("/users/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    body: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let email = body.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, age, email, password, tokens, avatar, created_at, updated_at \
         FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::BadRequest("Unable to login!".into()))?;

    if !verify_password(&body.password, &user.password)? {
        return Err(AppError::BadRequest("Unable to login!".into()));
    }

    let token = generate_token(user.id)?;
    let user = append_token(&pool, user.id, &token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// End the current session: removes exactly the token presented on this
/// request. Other sessions stay valid.
#[post("/users/logout")]
pub async fn logout(
    pool: web::Data<PgPool>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    sqlx::query(
        "UPDATE users SET tokens = array_remove(tokens, $1), updated_at = now() WHERE id = $2",
    )
    .bind(&auth.token)
    .bind(auth.user.id)
    .execute(&**pool)
    .await?;

    Ok(HttpResponse::Ok().finish())
}

/// End every session for the authenticated user.
#[post("/users/logoutAll")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    sqlx::query("UPDATE users SET tokens = '{}', updated_at = now() WHERE id = $1")
        .bind(auth.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

/// The authenticated user's own profile.
#[get("/users/me")]
pub async fn get_me(auth: Authenticated) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(auth.user))
}

/// Update the authenticated user's profile.
///
/// The body may carry any subset of {name, age, email, password}; any other
/// key fails deserialization and the request is rejected with 400 before this
/// handler runs. A changed password is re-hashed.
///
/// ## Responses:
/// - `200 OK`: the updated user.
/// - `400 Bad Request`: unknown field, validation failure, or email collision.
#[patch("/users/me")]
pub async fn update_me(
    pool: web::Data<PgPool>,
    auth: Authenticated,
    body: web::Json<UserUpdate>,
) -> Result<impl Responder, AppError> {
    let mut update = body.into_inner();
    update.normalize();
    update.validate()?;

    let mut user = auth.user;
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(age) = update.age {
        user.age = age;
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(password) = update.password {
        user.password = hash_password(&password)?;
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET name = $1, age = $2, email = $3, password = $4, updated_at = now() \
         WHERE id = $5 \
         RETURNING id, name, age, email, password, tokens, avatar, created_at, updated_at",
    )
    .bind(&user.name)
    .bind(user.age)
    .bind(&user.email)
    .bind(&user.password)
    .bind(user.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(user))
}

/// Delete the authenticated user's account.
///
/// The user's tasks go with it, in the same transaction. A cancellation email
/// is fired best-effort after the commit.
#[delete("/users/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    mailer: web::Data<Mailer>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM tasks WHERE owner = $1")
        .bind(auth.user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(auth.user.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    mailer.send_cancellation(&auth.user.email, &auth.user.name);

    Ok(HttpResponse::Ok().json(auth.user))
}

/// Upload an avatar image.
///
/// Expects a multipart form with a single file field named "avatar". The file
/// must carry a .jpg/.jpeg/.png extension and weigh at most 1,000,000 bytes.
/// The image is resized to 250x250 and stored as PNG, whatever the input
/// format.
///
/// ## Responses:
/// - `200 OK`: empty body.
/// - `400 Bad Request`: missing field, wrong extension, oversize payload, or
///   undecodable image data.
#[post("/users/me/avatar")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    auth: Authenticated,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
        if field.name() != "avatar" {
            continue;
        }

        let filename_ok = field
            .content_disposition()
            .get_filename()
            .map(avatar::is_supported_filename)
            .unwrap_or(false);
        if !filename_ok {
            return Err(AppError::BadRequest(
                "Please select .jpg, .png, and .jpeg files only.".into(),
            ));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
            if data.len() + chunk.len() > avatar::MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest(
                    "Avatar must be 1000000 bytes or smaller".into(),
                ));
            }
            data.extend_from_slice(&chunk);
        }
        upload = Some(data);
    }

    let data =
        upload.ok_or_else(|| AppError::BadRequest("An \"avatar\" file field is required".into()))?;
    let png = avatar::process(&data)?;

    sqlx::query("UPDATE users SET avatar = $1, updated_at = now() WHERE id = $2")
        .bind(&png)
        .bind(auth.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Remove the authenticated user's avatar.
#[delete("/users/me/avatar")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    sqlx::query("UPDATE users SET avatar = NULL, updated_at = now() WHERE id = $1")
        .bind(auth.user.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Fetch any user's avatar by user id. Public.
///
/// ## Responses:
/// - `200 OK`: the PNG bytes, `Content-Type: image/png`.
/// - `404 Not Found`: malformed id, no such user, or no avatar set.
#[get("/users/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = Uuid::parse_str(&path)
        .map_err(|_| AppError::NotFound("Avatar not found".into()))?;

    let avatar = sqlx::query_scalar::<_, Option<Vec<u8>>>("SELECT avatar FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&**pool)
        .await?
        .flatten()
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;

    Ok(HttpResponse::Ok().content_type("image/png").body(avatar))
}
