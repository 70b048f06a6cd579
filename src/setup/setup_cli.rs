use bcrypt::{hash, DEFAULT_COST};
use clap::{Parser, Subcommand};
use inkwell_backend::config::Config;
use inkwell_backend::setup::db_setup;
use rusqlite::{params, Connection};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup,
}

#[derive(Subcommand, Debug)]
enum UserAction {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Either 'admin' or 'author'.
        #[arg(long, default_value = "author")]
        role: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        username: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup => setup_blog_database(&config),
        },
        Commands::User { action } => match action {
            UserAction::Create { username, password, role } => {
                create_user(&config, username, password, role);
            }
            UserAction::List => {
                list_users(&config);
            }
            UserAction::ChangePassword { username, new_password } => {
                change_password(&config, username, new_password);
            }
        },
    }
}

fn setup_blog_database(config: &Config) {
    let db_path = config.blog_db_path();
    if db_path.exists() {
        println!("ℹ️ Blog database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up blog database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create blog database file.");
    match db_setup::setup_blog_db(&mut conn) {
        Ok(_) => println!("✅ Blog database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up blog database: {}", e),
    }
}

fn create_user(config: &Config, username: &str, password: &str, role: &str) {
    if !matches!(role, "admin" | "author") {
        eprintln!("❌ Error: Unknown role '{}'. Use 'admin' or 'author'.", role);
        return;
    }
    let db_path = config.blog_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Blog database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return;
    }
    let conn = Connection::open(&db_path).expect("Could not open blog database.");
    let hashed_password = hash(password, DEFAULT_COST).expect("Failed to hash password");

    match conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        params![username, hashed_password, role],
    ) {
        Ok(_) => println!("✅ User '{}' ({}) created successfully.", username, role),
        Err(e) => eprintln!("❌ Error creating user: {}. It might be because the username already exists.", e),
    }
}

fn list_users(config: &Config) {
    let conn = match Connection::open(config.blog_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Blog database not found. Please run `setup_cli db setup` first.");
            return;
        }
    };
    let mut stmt = match conn.prepare("SELECT username, role FROM users ORDER BY username") {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Error preparing database query: {}", e);
            return;
        }
    };
    let user_iter = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    });

    println!("Listing Users:");
    match user_iter {
        Ok(users) => {
            for user in users {
                match user {
                    Ok((username, role)) => println!("- {} ({})", username, role),
                    Err(e) => eprintln!("❌ Error reading user row: {}", e),
                }
            }
        }
        Err(e) => eprintln!("❌ Error fetching users: {}", e),
    }
}

fn change_password(config: &Config, username: &str, new_password: &str) {
    let conn = match Connection::open(config.blog_db_path()) {
        Ok(c) => c,
        Err(_) => {
            eprintln!("❌ Error: Blog database not found.");
            return;
        }
    };
    let hashed_password = hash(new_password, DEFAULT_COST).expect("Failed to hash new password");
    match conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    ) {
        Ok(0) => eprintln!("❌ Error: No user named '{}' found.", username),
        Ok(_) => println!("✅ Password for user '{}' changed successfully.", username),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
