use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use user_accounts::api::handler::app_router;
use user_accounts::api::model::user::StoredAccount;
use user_accounts::config::app_config::{
    get_server_address, initialize_app_state, initialize_in_memory_app_state,
};
use user_accounts::service::user_service::{self, AccountUpdate};
use user_accounts::{AccountError, AppState};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "user-accounts", version, about = "User account management")]
struct Cli {
    /// Keep accounts in memory instead of PostgreSQL.
    #[arg(long, global = true, env = "IN_MEMORY_STORE")]
    in_memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Create a user. A confirmation link is sent when no password is given
    /// or with --send-email, otherwise the account is verified at once.
    CreateUser {
        email: String,
        password: Option<String>,
        #[arg(short, long = "role")]
        roles: Vec<String>,
        #[arg(long)]
        send_email: bool,
    },
    /// Change the password or roles of a user.
    UpdateUser {
        email: String,
        #[arg(short, long, conflicts_with = "generate_password")]
        password: Option<String>,
        #[arg(long)]
        generate_password: bool,
        /// Send a new confirmation link to a pending user.
        #[arg(long)]
        send_email: bool,
        #[arg(long = "set-role")]
        set_roles: Vec<String>,
        #[arg(long = "add-role")]
        add_roles: Vec<String>,
    },
    /// Delete every expired token.
    DeleteExpiredTokens,
    /// List users, 20 per page.
    ListUsers {
        #[arg(default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        page: i64,
    },
    /// Delete a user and its tokens.
    DeleteUser { id: Uuid },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logging handler using tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let state = if cli.in_memory {
        initialize_in_memory_app_state()
    } else {
        initialize_app_state().await
    };

    match run(cli.command, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_fatal() {
                error!("{} ({})", e, e.message_key());
            } else {
                warn!("{} ({})", e, e.message_key());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, state: Arc<AppState>) -> Result<(), AccountError> {
    match command {
        Command::Serve => serve(state).await,
        Command::CreateUser {
            email,
            password,
            roles,
            send_email,
        } => {
            let created = user_service::admin_create_account(
                &state,
                &email,
                password.as_deref(),
                &roles,
                send_email,
            )
            .await?;
            println!("Email: {}", created.account.email);
            println!("Status: {}", created.account.status);
            if let Some(password) = &created.generated_password {
                println!("Generated password: {}", password);
            }
            if let Some(token) = &created.token {
                println!("Token generated: {}", token.hash);
            }
            println!("User created!");
            Ok(())
        }
        Command::UpdateUser {
            email,
            password,
            generate_password,
            send_email,
            set_roles,
            add_roles,
        } => {
            let update = AccountUpdate {
                password,
                generate_password,
                send_email,
                set_roles,
                add_roles,
            };
            let updated = user_service::update_account(&state, &email, &update).await?;
            println!("Email: {}", updated.account.email);
            println!("Roles: {}", updated.account.effective_roles().join(", "));
            if let Some(password) = &updated.generated_password {
                println!("Generated password: {}", password);
            }
            if let Some(token) = &updated.token {
                println!("Token generated: {}", token.hash);
            }
            println!("User updated!");
            Ok(())
        }
        Command::DeleteExpiredTokens => {
            let deleted = user_service::sweep_expired_tokens(&state).await?;
            println!("{} expired token(s) deleted", deleted);
            Ok(())
        }
        Command::ListUsers { page } => {
            let accounts = user_service::list_accounts(&state, page).await?;
            let listed: Vec<StoredAccount> = accounts.iter().map(StoredAccount::from).collect();
            for account in &listed {
                println!(
                    "{}  {:<40} {:<9} {}",
                    account.id,
                    account.email,
                    account.status.as_str(),
                    account.roles.join(",")
                );
            }
            Ok(())
        }
        Command::DeleteUser { id } => {
            user_service::delete_account(&state, id).await?;
            println!("User {} deleted", id);
            Ok(())
        }
    }
}

async fn serve(state: Arc<AppState>) -> Result<(), AccountError> {
    let server_addr = get_server_address();
    let app = app_router(state);

    // run it
    let server_address: SocketAddr = server_addr
        .parse()
        .unwrap_or_else(|e| panic!("Invalid server address {}: {}", server_addr, e));
    info!("Starting server at {}", server_addr);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", server_addr, e));
    axum::serve(listener, app)
        .await
        .unwrap_or_else(|e| panic!("Server error: {}", e));
    Ok(())
}
