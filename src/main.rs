use bi_query_engine::assistant::QueryAssistant;
use bi_query_engine::config::EngineConfig;
use bi_query_engine::response::UserResponse;
use bi_query_engine::schema::SchemaProvider;
use bi_query_engine::security::{Role, SqlPolicyFilter, User};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bi-query")]
#[command(about = "Ask business questions about invoices, customers and sales in plain English")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question in natural language
        question: String,

        /// User id the conversation is kept under
        #[arg(long, default_value = "cli")]
        user: String,

        /// Role to answer as (visitor, viewer, manager, admin)
        #[arg(long, default_value = "viewer")]
        role: String,
    },
    /// Interactive session with conversation memory
    Chat {
        #[arg(long, default_value = "cli")]
        user: String,

        #[arg(long, default_value = "viewer")]
        role: String,
    },
    /// Print the schema a role is allowed to see
    Schema {
        #[arg(long)]
        role: String,
    },
    /// Run a SQL statement through the role policy without executing it
    Check {
        sql: String,

        #[arg(long)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Ask { question, user, role } => ask(question, user, role).await,
        Commands::Chat { user, role } => chat(user, role).await,
        Commands::Schema { role } => {
            println!("{}", SchemaProvider::schema_for_name(&role)?);
            Ok(())
        }
        Commands::Check { sql, role } => check(&sql, &role),
    }
}

async fn connect() -> Result<QueryAssistant> {
    let config = EngineConfig::from_env();
    QueryAssistant::connect(&config)
        .await
        .context("Failed to start the query assistant")
}

async fn ask(question: String, user_id: String, role: String) -> Result<()> {
    let role = Role::parse(&role)?;
    let assistant = connect().await?;
    let user = User::new(user_id.clone(), user_id, role);
    let response = assistant.ask(&user, &question).await;
    print_response(&response);
    Ok(())
}

async fn chat(user_id: String, role: String) -> Result<()> {
    let role = Role::parse(&role)?;
    let assistant = connect().await?;
    let user = User::new(user_id.clone(), user_id, role);
    info!(user_id = %user.user_id, role = %role, "Starting chat session");

    println!("Ask a question about your business data ('/clear' resets the conversation, 'exit' quits).");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}> ", role);
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let question = line.trim();
        match question {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                assistant.end_session(&user.user_id);
                println!("Conversation cleared.");
            }
            _ => {
                let response = assistant.ask(&user, question).await;
                print_response(&response);
            }
        }
    }

    assistant.end_session(&user.user_id);
    Ok(())
}

fn check(sql: &str, role: &str) -> Result<()> {
    let role = Role::parse(role)?;
    match SqlPolicyFilter::new().apply(sql, role) {
        Ok(filtered) => println!("{}", filtered),
        Err(e) => println!("Rejected: {}", e.detail()),
    }
    Ok(())
}

fn print_response(response: &UserResponse) {
    if !response.success {
        println!("Error: {}", response.message);
        return;
    }
    println!("{}", response.message);

    if !response.query.is_empty() {
        println!("\n  SQL: {}", response.query);
    }
    if !response.data.is_empty() {
        println!("  Rows ({} total, showing {}):", response.row_count, response.data.len());
        for record in response.data.iter().take(10) {
            println!("    {}", serde_json::Value::Object(record.clone()));
        }
        if response.data.len() > 10 {
            println!("    ...");
        }
    }
    if let Some(chart) = &response.chart {
        println!("  Chart: {} ({} bytes base64)", chart.chart_type, chart.chart_base64.len());
    }
}
