pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(users::create_user)
        .service(users::login)
        .service(users::logout)
        .service(users::logout_all)
        .service(users::get_me)
        .service(users::update_me)
        .service(users::delete_me)
        .service(users::upload_avatar)
        .service(users::delete_avatar)
        // Registered after the literal /users/me/avatar resources so those
        // win over the {id} pattern.
        .service(users::get_avatar)
        .service(tasks::get_tasks)
        .service(tasks::create_task)
        .service(tasks::get_task)
        .service(tasks::update_task)
        .service(tasks::delete_task);
}
