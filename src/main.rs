//! Elimu - enrollment and progress engine
//!
//! "Elimu ni ufunguo wa maisha" - education is the key of life

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elimu::{
    auth::JwtValidator,
    catalog::{CourseCatalog, InMemoryCatalog, MongoCatalog},
    certificate::CertificateView,
    config::Args,
    db::MongoClient,
    enrollment::{
        EnrollmentRepository, EnrollmentService, InMemoryEnrollmentStore, MongoEnrollmentStore,
    },
    identity::{IdentityDirectory, InMemoryIdentity, MongoIdentity},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("elimu={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Elimu - Enrollment & Progress Engine");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Session token validator
    let jwt = match &args.jwt_secret {
        Some(secret) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
        None => {
            warn!("JWT_SECRET not set (dev mode), using dev-only validator");
            JwtValidator::new_dev()
        }
    };

    // Storage: MongoDB in production; dev mode falls back to in-memory
    // stores seeded with a demo catalog when MongoDB is unreachable
    let (repo, catalog, identity, storage): (
        Arc<dyn EnrollmentRepository>,
        Arc<dyn CourseCatalog>,
        Arc<dyn IdentityDirectory>,
        &'static str,
    ) = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            info!("MongoDB connected successfully");
            (
                Arc::new(MongoEnrollmentStore::new(mongo.clone())),
                Arc::new(MongoCatalog::new(mongo.clone())),
                Arc::new(MongoIdentity::new(mongo)),
                "mongodb",
            )
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, using in-memory storage): {}",
                    e
                );
                let catalog = InMemoryCatalog::new();
                let identity = InMemoryIdentity::new();
                seed_dev_data(&catalog, &identity);
                (
                    Arc::new(InMemoryEnrollmentStore::new()),
                    Arc::new(catalog),
                    Arc::new(identity),
                    "memory",
                )
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let enrollments = Arc::new(EnrollmentService::new(repo, catalog));
    let certificates = Arc::new(CertificateView::new(Arc::clone(&enrollments), identity));

    let state = Arc::new(AppState::new(args, jwt, enrollments, certificates, storage));
    server::run(state).await?;

    Ok(())
}

/// Seed a small demo catalog so the API is drivable without MongoDB
fn seed_dev_data(catalog: &InMemoryCatalog, identity: &InMemoryIdentity) {
    let marketing = catalog.add_course("Digital Marketing Fundamentals", "Sarah Mwangi", 8);
    let webdev = catalog.add_course("Web Development Basics", "Ahmed Hassan", 12);
    let learner = identity.add_learner("Asha Njeri", "asha@example.com");

    info!("Seeded dev catalog:");
    info!("  course  {} (Digital Marketing Fundamentals)", marketing);
    info!("  course  {} (Web Development Basics)", webdev);
    info!("  learner {} (use as x-learner-id)", learner);
}
