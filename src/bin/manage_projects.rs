//! CLI tool to manage projects.
//!
//! Builds can only be registered against an existing project, so projects
//! are provisioned out of band with this tool.
//!
//! Usage:
//!   cargo run --bin manage-projects -- add --name <name> [--org <uuid>]
//!   cargo run --bin manage-projects -- list
//!   cargo run --bin manage-projects -- builds --id <project-id>

use std::env;

use uuid::Uuid;

use trd_lib::config::Config;
use trd_lib::db::DbPool;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    match command.as_str() {
        "add" => {
            let name = match flag_value(&args, "--name", "-n") {
                Some(n) => n,
                None => {
                    eprintln!("Error: --name is required");
                    std::process::exit(1);
                }
            };
            let organization_id = match flag_value(&args, "--org", "-o") {
                Some(raw) => parse_uuid(&raw),
                None => Uuid::now_v7(),
            };
            add_project(&pool, &name, organization_id).await;
        }
        "list" | "ls" => list_projects(&pool).await,
        "builds" => {
            let id = match flag_value(&args, "--id", "-i") {
                Some(raw) => parse_uuid(&raw),
                None => {
                    eprintln!("Error: --id is required");
                    std::process::exit(1);
                }
            };
            list_builds(&pool, id).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn flag_value(args: &[String], long: &str, short: &str) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == long || args[i] == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn parse_uuid(raw: &str) -> Uuid {
    match Uuid::parse_str(raw) {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: '{}' is not a valid UUID", raw);
            std::process::exit(1);
        }
    }
}

async fn add_project(pool: &DbPool, name: &str, organization_id: Uuid) {
    match pool.insert_project(name, organization_id).await {
        Ok(project) => {
            println!();
            println!("  Project created");
            println!();
            println!("  ID:           {}", project.id);
            println!("  Name:         {}", project.name);
            println!("  Organization: {}", project.organization_id);
            println!();
            println!("  Pass the ID as project_id when registering builds.");
            println!();
        }
        Err(e) => {
            eprintln!("Error creating project: {}", e);
            std::process::exit(1);
        }
    }
}

async fn list_projects(pool: &DbPool) {
    let projects = match pool.list_projects().await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error listing projects: {}", e);
            std::process::exit(1);
        }
    };

    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    println!();
    println!("{:<36} {:<36} {:<24}", "ID", "ORGANIZATION", "NAME");
    println!("{}", "─".repeat(98));

    for project in projects {
        let name = if project.name.chars().count() > 22 {
            format!("{}...", project.name.chars().take(19).collect::<String>())
        } else {
            project.name.clone()
        };

        println!(
            "{:<36} {:<36} {:<24}",
            project.id, project.organization_id, name
        );
    }
    println!();
}

async fn list_builds(pool: &DbPool, project_id: Uuid) {
    let builds = match pool.list_builds_for_project(project_id).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error listing builds: {}", e);
            std::process::exit(1);
        }
    };

    if builds.is_empty() {
        println!("No builds found for project {}.", project_id);
        return;
    }

    println!();
    println!(
        "{:<8} {:<12} {:<10} {:<14} {:<26}",
        "ID", "TYPE", "STATUS", "ENVIRONMENT", "CREATED"
    );
    println!("{}", "─".repeat(72));

    for build in builds {
        println!(
            "{:<8} {:<12} {:<10} {:<14} {:<26}",
            build.id,
            build.build_type,
            build.status,
            build.environment,
            build.created_at.to_rfc3339()
        );
    }
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-projects <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add --name <name> [--org <uuid>]  Create a project");
    eprintln!("  list, ls                          List all projects");
    eprintln!("  builds --id <project-id>          List builds of a project");
    eprintln!("  help                              Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-projects add --name \"webapp-e2e\"");
    eprintln!("  manage-projects builds --id 0192f0c4-7a4e-7c3e-9a51-2f6d8e1b3c4d");
    eprintln!();
}
