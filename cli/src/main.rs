use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use tenant_console::config::{ConsoleConfig, normalize_base_url};
use tenant_console::net::api::HttpApi;
use tenant_console::net::types::{ApiError, LoginRequest};
use tenant_console::routes::{Route, redirect_for};
use tenant_console::services::claims::{self, AdminGate};
use tenant_console::services::guard::{GuardPolicy, SessionGuard};
use tenant_console::services::onboarding::{FORM_INVALID_MESSAGE, FieldErrors, OnboardingForm};
use tenant_console::services::session::{self, FlowOutcome};
use tenant_console::state::auth::AuthStatus;
use tenant_console::state::notice::Notice;
use tenant_console::state::store::{FileStore, SessionKey, SessionStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to load .env: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

#[derive(Parser, Debug)]
#[command(name = "tenant-console", about = "Tenant admin console session and onboarding CLI")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "CONSOLE_API_BASE_URL")]
    base_url: Option<String>,

    /// Tenant sent as `X-Tenant-ID` on login.
    #[arg(long, env = "CONSOLE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Where the session tokens are kept between runs.
    #[arg(long, env = "CONSOLE_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the returned token pair.
    Login {
        #[arg(long, env = "CONSOLE_USERNAME")]
        username: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored tokens.
    Logout,
    /// Run the session guard and show the decision.
    Status,
    /// Check whether the stored access token carries a role.
    HasRole { role: String },
    /// Create a tenant and its first user (super admins only).
    Onboard(OnboardArgs),
    /// Validate onboarding fields without contacting the backend.
    CheckOnboarding(OnboardArgs),
}

#[derive(Args, Debug)]
struct OnboardArgs {
    #[arg(long, default_value = "")]
    tenant_id: String,
    #[arg(long, default_value = "")]
    tenant_name: String,
    #[arg(long, default_value = "")]
    contact_email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    sub_domain: String,
    #[arg(long, default_value = "")]
    username: String,
    #[arg(long, env = "CONSOLE_ONBOARD_PASSWORD", hide_env_values = true, default_value = "")]
    password: String,
    #[arg(long, default_value = "")]
    user_email: String,
    #[arg(long, default_value = "")]
    full_name: String,
}

impl From<OnboardArgs> for OnboardingForm {
    fn from(args: OnboardArgs) -> Self {
        Self {
            tenant_id: args.tenant_id,
            tenant_name: args.tenant_name,
            contact_email: args.contact_email,
            phone: args.phone,
            sub_domain: args.sub_domain,
            username: args.username,
            password: args.password,
            user_email: args.user_email,
            full_name: args.full_name,
        }
    }
}

struct CliContext {
    config: ConsoleConfig,
    store: Arc<FileStore>,
}

impl CliContext {
    fn api(&self) -> Result<Arc<HttpApi>, CliError> {
        Ok(Arc::new(HttpApi::from_config(&self.config)?))
    }

    fn guard(&self) -> Result<SessionGuard<Arc<HttpApi>, Arc<FileStore>>, CliError> {
        Ok(SessionGuard::with_policy(self.api()?, Arc::clone(&self.store), GuardPolicy::from(&self.config)))
    }

    fn access_token(&self) -> Option<String> {
        self.store.get(SessionKey::AccessToken)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, CliError> {
    load_dotenv()?;
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = ConsoleConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config.api_base_url = normalize_base_url(&base_url);
    }
    if let Some(tenant_id) = cli.tenant_id {
        config.tenant_id = tenant_id;
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    let store = Arc::new(FileStore::open_or_empty(&config.session_file));
    let ctx = CliContext { config, store };

    match cli.command {
        Command::Login { username, password } => run_login(&ctx, LoginRequest { username, password }).await,
        Command::Logout => Ok(report(&session::logout(&*ctx.store))),
        Command::Status => run_status(&ctx).await,
        Command::HasRole { role } => Ok(run_has_role(&ctx, &role)),
        Command::Onboard(args) => run_onboard(&ctx, args.into()).await,
        Command::CheckOnboarding(args) => Ok(run_check_onboarding(&args.into())),
    }
}

fn load_dotenv() -> Result<(), CliError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn run_login(ctx: &CliContext, credentials: LoginRequest) -> Result<ExitCode, CliError> {
    let api = ctx.api()?;
    let outcome = session::login(&api, &ctx.store, &ctx.config.tenant_id, &credentials).await;
    Ok(report(&outcome))
}

async fn run_status(ctx: &CliContext) -> Result<ExitCode, CliError> {
    let state = ctx.guard()?.evaluate_state().await;

    let decoded = match ctx.access_token().as_deref().map(claims::decode) {
        Some(Ok(decoded)) => json!({ "sub": decoded.subject(), "iat": decoded.issued_at(), "exp": decoded.expires_at() }),
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => Value::Null,
    };
    print_json(&json!({
        "status": state.status.label(),
        "roles": state.roles,
        "claims": decoded,
        "redirect": redirect_for(state.status, Route::Dashboard).map(Route::path),
    }))?;

    Ok(exit_code(state.status == AuthStatus::Authenticated))
}

fn run_has_role(ctx: &CliContext, role: &str) -> ExitCode {
    let granted = claims::has_role(ctx.access_token().as_deref(), role);
    println!("{granted}");
    exit_code(granted)
}

async fn run_onboard(ctx: &CliContext, form: OnboardingForm) -> Result<ExitCode, CliError> {
    let status = ctx.guard()?.evaluate().await;
    if let Some(to) = redirect_for(status, Route::CreateTenant) {
        print_outcome(&FlowOutcome { notice: None, redirect: Some(to) });
        return Ok(ExitCode::FAILURE);
    }

    if let AdminGate::Redirect { to, notice } = claims::admin_gate(ctx.access_token().as_deref()) {
        print_outcome(&FlowOutcome { notice, redirect: Some(to) });
        return Ok(ExitCode::FAILURE);
    }

    let api = ctx.api()?;
    let outcome = session::submit_onboarding(&api, &ctx.store, &form).await;
    println!("{}", outcome.notice);
    if let Some(errors) = &outcome.field_errors {
        print_field_errors(errors);
    }
    if let Some(created) = &outcome.created {
        print_json(created)?;
    }
    Ok(exit_code(outcome.is_success()))
}

fn run_check_onboarding(form: &OnboardingForm) -> ExitCode {
    match form.validate() {
        Ok(request) => {
            println!("{}", Notice::success(format!("Tenant `{}` is ready to submit.", request.tenant_id)));
            ExitCode::SUCCESS
        }
        Err(errors) => {
            println!("{}", Notice::error(FORM_INVALID_MESSAGE));
            print_field_errors(&errors);
            ExitCode::FAILURE
        }
    }
}

/// Print a flow outcome; failure exit when it carries an error notice.
fn report(outcome: &FlowOutcome) -> ExitCode {
    print_outcome(outcome);
    exit_code(!outcome.is_error())
}

fn print_outcome(outcome: &FlowOutcome) {
    if let Some(notice) = &outcome.notice {
        println!("{notice}");
    }
    if let Some(to) = outcome.redirect {
        println!("redirect: {to}");
    }
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        println!("  {field}: {message}");
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
