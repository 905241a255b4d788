//! Database seeder for Claimflow development and testing.
//!
//! Bootstraps a company with an admin, a manager, and an employee so the
//! API can be exercised locally.
//!
//! Usage: cargo run --bin seeder

use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use claimflow_core::approval::Role;
use claimflow_db::entities::companies;
use claimflow_db::repositories::UserRepository;

/// Seed company ID (consistent for all seeds)
const SEED_COMPANY_ID: &str = "00000000-0000-0000-0000-000000000001";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = claimflow_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding company and users...");
    seed_company(&db).await;

    println!("Seeding complete!");
}

fn seed_company_id() -> Uuid {
    Uuid::parse_str(SEED_COMPANY_ID).unwrap()
}

async fn seed_company(db: &DatabaseConnection) {
    if companies::Entity::find_by_id(seed_company_id())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Seed company already exists, skipping...");
        return;
    }

    let users = UserRepository::new(db.clone());

    // Insert with a fixed id so repeated runs can detect the seed.
    let company = {
        use sea_orm::{ActiveModelTrait, Set};
        let now = chrono::Utc::now().into();
        companies::ActiveModel {
            id: Set(seed_company_id()),
            name: Set("Claimflow Demo Co".to_string()),
            country: Set("US".to_string()),
            currency: Set("USD".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("Failed to insert seed company")
    };

    let admin = users
        .create(
            company.id,
            "Demo Admin",
            "admin@claimflow.dev",
            "external-identity",
            Role::Admin,
            None,
        )
        .await
        .expect("Failed to insert admin");
    println!("  admin:    {}", admin.id);

    let manager = users
        .create(
            company.id,
            "Demo Manager",
            "manager@claimflow.dev",
            "external-identity",
            Role::Manager,
            None,
        )
        .await
        .expect("Failed to insert manager");
    println!("  manager:  {}", manager.id);

    let employee = users
        .create(
            company.id,
            "Demo Employee",
            "employee@claimflow.dev",
            "external-identity",
            Role::Employee,
            Some(manager.id),
        )
        .await
        .expect("Failed to insert employee");
    println!("  employee: {}", employee.id);
    println!("  company:  {}", company.id);
}
