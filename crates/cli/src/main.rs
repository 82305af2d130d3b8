//! Pharmacy CLI - database migrations and bootstrap tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! pharmacy migrate
//!
//! # Create the first administrator
//! pharmacy user create -u admin -n "Site Admin" -p 'a-long-password' -r admin
//!
//! # Load categories, departments, suppliers and drugs
//! pharmacy seed reference --file seed.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `PHARMACY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pharmacy")]
#[command(author, version, about = "Pharmacy Inventory CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an active user account
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Full display name
        #[arg(short, long)]
        name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `pharmacist`, `department_staff`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Email address for password resets
        #[arg(short, long)]
        email: Option<String>,

        /// Department name; created when it does not exist
        #[arg(short, long)]
        department: Option<String>,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load reference data from a YAML file
    Reference {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                name,
                password,
                role,
                email,
                department,
            } => {
                let account = commands::user::NewAccount {
                    username,
                    full_name: name,
                    password,
                    role,
                    email,
                    department,
                };
                commands::user::create(account).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Reference { file } => commands::seed::reference(&file).await?,
        },
    }
    Ok(())
}
