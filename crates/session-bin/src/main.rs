//! Command line front end for the helpdesk session core.
use std::{
    io::{self, Read},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use helpdesk_session::{
    auth::AuthService,
    config::{Settings, CONFIG_FILE},
    error::SessionError,
    http::ReqwestClient,
    validation::{validate_login, validate_registration},
    LoginRequest, Principal, RegisterRequest, SessionContext,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "helpdesk-session", version, about = "Sign in to the helpdesk and manage the stored session")]
struct Cli {
    /// Config file (defaults to ./helpdesk.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: String,
        #[command(flatten)]
        password: PasswordArgs,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        #[command(flatten)]
        password: PasswordArgs,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Clear the stored session
    Logout,
    /// Restore the stored session and show the signed-in user
    Whoami,
    /// Exchange the stored token for a fresh one
    Refresh,
    /// Ask the server whether the stored token is still valid
    Validate,
    /// Show what is stored locally, without contacting the server
    Status,
}

/// Where the password comes from. Prefer the environment or stdin; a value
/// on the command line is visible in the process list.
#[derive(Args)]
struct PasswordArgs {
    #[arg(
        short,
        long,
        env = "HELPDESK_PASSWORD",
        hide_env_values = true,
        required_unless_present = "password_stdin"
    )]
    password: Option<String>,

    /// Read the password from the first line of stdin; wins over the other sources
    #[arg(long)]
    password_stdin: bool,
}

impl std::fmt::Debug for PasswordArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordArgs")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_stdin", &self.password_stdin)
            .finish()
    }
}

impl PasswordArgs {
    fn resolve(self, mut input: impl Read) -> Result<String> {
        if self.password_stdin {
            let mut line = String::new();
            input
                .read_to_string(&mut line)
                .context("failed to read password from stdin")?;
            let password = line.lines().next().unwrap_or_default().to_string();
            if password.is_empty() {
                bail!("no password on stdin");
            }
            return Ok(password);
        }
        self.password
            .context("no password given; use --password-stdin or HELPDESK_PASSWORD")
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if settings.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_principal(principal: &Principal) {
    println!("{} <{}>", principal.display_name(), principal.email);
    println!("  role:   {}", principal.role.display_name());
    println!("  active: {}", principal.is_active);
}

/// Turn a service error into a message for the terminal
fn report(err: SessionError) -> anyhow::Error {
    tracing::debug!(error = %err, code = err.error_code(), "command failed");
    anyhow::anyhow!("{}", err.sanitized_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load_from(CONFIG_FILE),
    }
    .context("failed to load settings")?;
    init_tracing(&settings);

    let http = ReqwestClient::new(&settings.api_base_url, settings.request_timeout())
        .context("failed to create HTTP client")?;
    let hook = Arc::new(|login_path: &str| {
        println!("Signed out. Sign in again at {login_path} or with `helpdesk-session login`.");
    });
    let ctx = SessionContext::with_termination_hook(settings, Arc::new(http), hook)
        .context("failed to open session storage")?;
    let store = &ctx.store;

    match cli.command {
        Command::Login { email, password } => {
            let request = LoginRequest::new(email, password.resolve(io::stdin())?);
            validate_login(&request).map_err(|e| report(e.into()))?;
            let principal = store
                .login(&request.email, &request.password)
                .await
                .map_err(report)?;
            println!("Signed in.");
            print_principal(&principal);
        },
        Command::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let request = RegisterRequest {
                email,
                password: password.resolve(io::stdin())?,
                first_name,
                last_name,
            };
            validate_registration(&request).map_err(|e| report(e.into()))?;
            let principal = store.register(request).await.map_err(report)?;
            println!("Account created.");
            print_principal(&principal);
        },
        Command::Logout => store.logout().await,
        Command::Whoami => {
            store.initialize().await;
            match store.principal() {
                Some(principal) => print_principal(&principal),
                None => bail!("not signed in"),
            }
        },
        Command::Refresh => {
            if !store.refresh_session().await {
                bail!("session could not be refreshed; sign in again");
            }
            println!("Session refreshed.");
        },
        Command::Validate => {
            if ctx.credentials.validate_token().await {
                println!("Token is valid.");
            } else {
                bail!("token is missing or no longer valid");
            }
        },
        Command::Status => {
            let credentials = &ctx.credentials;
            let signed_in = credentials.is_authenticated().map_err(report)?;
            println!("signed in (local): {signed_in}");
            if let Some(user) = credentials.user().map_err(report)? {
                print_principal(&user);
                println!("  support queues: {}", credentials.is_support_agent());
                println!("  admin panel:    {}", credentials.is_admin());
            }
        },
    }

    Ok(())
}
