//! Database seed script: predefined tags and an optional admin promotion
//! Run with: cargo run --bin seed

use archive_service::config::Config;
use archive_service::db::Database;
use archive_service::services::{TagService, UserService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Connecting to database...");
    let db = Database::connect(&config).await?;
    db.run_migrations().await?;
    println!("Connected and migrated.");

    let seeded = TagService::new(db.clone()).seed_predefined().await?;
    println!("Seeded {} predefined tags.", seeded);

    match std::env::var("ADMIN_EMAIL") {
        Ok(email) if !email.trim().is_empty() => {
            let promoted = UserService::new(db.clone()).promote_by_email(&email).await?;
            if promoted == 0 {
                println!(
                    "No user with email {} yet; sign in once with Google, then re-run the seed.",
                    email.trim()
                );
            } else {
                println!("Promoted {} to admin.", email.trim());
            }
        }
        _ => println!("ADMIN_EMAIL not set; skipping admin promotion."),
    }

    Ok(())
}
