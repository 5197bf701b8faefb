use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use dotenvy::dotenv;

use wildtrails_tour_service::auth::AuthService;
use wildtrails_tour_service::config::AppConfig;
use wildtrails_tour_service::database::DatabaseService;
use wildtrails_tour_service::email::{LogMailer, Mailer};
use wildtrails_tour_service::handlers::*;
use wildtrails_tour_service::middleware::{OptionalAuth, RequestLog, RequireAuth};
use wildtrails_tour_service::services::{AccountService, TourService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment from .env (if present)
    let _ = dotenv();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize logging: file + stdout (rotating file), env_logger fallback
    if let Ok(logger) = flexi_logger::Logger::try_with_str(config.logging.level.clone()) {
        let file_spec = flexi_logger::FileSpec::default()
            .directory("logs")
            .suppress_timestamp();
        let _ = logger
            .log_to_file(file_spec)
            .duplicate_to_stdout(flexi_logger::Duplicate::Info)
            .start();
    } else {
        env_logger::builder()
            .parse_filters(&config.logging.level)
            .format_timestamp_secs()
            .init();
    }

    log::info!("Starting Wildtrails tour server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Server: {}:{}", config.server.host, config.server.port);

    let db_service = Arc::new(
        DatabaseService::new(&config.database)
            .await
            .expect("Failed to initialize database"),
    );

    if let Err(e) = db_service.init_schema().await {
        log::error!("Failed to initialize DB schema: {}", e);
    } else {
        log::info!("DB schema ensured");
    }

    let auth_service = Arc::new(AuthService::new(config.auth.clone()));
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(config.email.clone()));

    let account_service = Arc::new(AccountService::new(
        Arc::clone(&db_service),
        Arc::clone(&auth_service),
        Arc::clone(&mailer),
        config.email.public_base_url.clone(),
    ));
    let tour_service = Arc::new(TourService::new(Arc::clone(&db_service)));

    println!("Wildtrails tour server started");
    println!("Local access: http://{}:{}", config.server.host, config.server.port);
    println!("Health check: http://{}:{}/health", config.server.host, config.server.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&account_service)))
            .app_data(web::Data::new(Arc::clone(&tour_service)))
            .wrap(RequestLog)
            // Public account routes
            .service(
                web::scope("/api/v1/users")
                    .route("/sign-up", web::post().to(sign_up))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::get().to(logout))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route("/reset-password/{token}", web::patch().to(reset_password)),
            )
            // Routes that require a verified session
            .service(
                web::scope("/api/v1/me")
                    .wrap(RequireAuth {
                        accounts: Arc::clone(&account_service),
                    })
                    .route("", web::get().to(get_me))
                    .route("", web::patch().to(update_me))
                    .route("", web::delete().to(delete_me))
                    .route("/password", web::patch().to(update_my_password)),
            )
            // Admin account listing
            .service(
                web::scope("/api/v1/admin")
                    .wrap(RequireAuth {
                        accounts: Arc::clone(&account_service),
                    })
                    .route("/users", web::get().to(list_users)),
            )
            // Tour catalogue: reads are public but login-aware, writes are
            // restricted to admins and lead guides
            .service(
                web::scope("/api/v1/tours/manage")
                    .wrap(RequireAuth {
                        accounts: Arc::clone(&account_service),
                    })
                    .route("", web::post().to(create_tour))
                    .route("/{id}", web::patch().to(update_tour))
                    .route("/{id}", web::delete().to(delete_tour)),
            )
            .service(
                web::scope("/api/v1/tours")
                    .wrap(OptionalAuth {
                        accounts: Arc::clone(&account_service),
                    })
                    .route("", web::get().to(list_tours))
                    .route("/{id}", web::get().to(get_tour)),
            )
            // Health check (no auth)
            .route("/health", web::get().to(health_check))
    })
    .bind((config.server.host.clone(), config.server.port))?
    .workers(config.server.workers)
    .keep_alive(std::time::Duration::from_secs(config.server.keep_alive_seconds))
    .client_request_timeout(std::time::Duration::from_secs(config.server.client_timeout_seconds))
    .client_disconnect_timeout(std::time::Duration::from_secs(config.server.client_shutdown_seconds))
    .max_connections(config.server.max_connections)
    .run()
    .await
}
