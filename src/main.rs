use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;

use taskman::auth::AuthMiddleware;
use taskman::config::{Config, MailConfig};
use taskman::email::Mailer;
use taskman::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    let mailer = Mailer::from_config(&MailConfig::from_env());

    log::info!("Starting server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .wrap(AuthMiddleware)
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(routes::config)
    })
    .bind((config.server_host.clone(), config.server_port))?
    .run()
    .await
}
