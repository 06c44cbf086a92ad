use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chatdesk::application::services::UnreadSnapshot;
use chatdesk::application::{
    LoginRequest, LoginUseCase, ResolveTokenUseCase, Session, SessionPorts, SessionSettings,
};
use chatdesk::domain::entities::{AuthToken, User};
use chatdesk::domain::ports::{
    AuthPort, DirectoryPort, LoginCredentials, MarkerRepository, NotificationPort, SocketEvent,
};
use chatdesk::infrastructure::{
    AppConfig, CliArgs, Command, CrmClient, DesktopNotificationService, FileMarkerRepository,
    InMemoryMarkerRepository, KeyringTokenStorage, SocketClient, SocketClientConfig,
    StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = match args.config.as_deref() {
        Some(path) => StorageManager::with_dir(
            path.parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_default(),
        ),
        None => StorageManager::new()?,
    };

    let mut config = storage
        .load_config(args.config.as_deref())
        .wrap_err("failed to load configuration")?;
    config.merge_with_args(args);
    Ok(config)
}

fn marker_repository() -> Arc<dyn MarkerRepository> {
    match AppConfig::default_data_dir() {
        Some(dir) => Arc::new(FileMarkerRepository::in_dir(&dir)),
        None => {
            warn!("No data directory available, read markers will not persist");
            Arc::new(InMemoryMarkerRepository::new())
        }
    }
}

async fn resolve_token(cli_token: Option<String>) -> Result<AuthToken> {
    let storage = Arc::new(KeyringTokenStorage::new());
    let resolved = ResolveTokenUseCase::new(storage)
        .execute(cli_token)
        .await?
        .ok_or_else(|| eyre!("no access token found, run `chatdesk login` first"))?;

    info!(source = %resolved.source, "Access token resolved");
    Ok(resolved.token)
}

struct Authenticated {
    token: AuthToken,
    user: User,
    client: Arc<CrmClient>,
}

async fn authenticate(config: &AppConfig, args: &CliArgs) -> Result<Authenticated> {
    let token = resolve_token(args.token.clone()).await?;
    let client = CrmClient::new(&config.api_url)?;

    let user = client
        .validate_token(&token)
        .await
        .wrap_err("access token was rejected")?;
    info!(user_id = %user.id, "Authenticated");

    Ok(Authenticated {
        client: Arc::new(client.with_token(token.clone())),
        token,
        user,
    })
}

fn print_snapshot(snapshot: &UnreadSnapshot) {
    if let Some(error) = &snapshot.error {
        println!("! {error}");
        return;
    }
    println!("unread messages: {}", snapshot.total_unread_count);
}

fn print_event(event: &SocketEvent) {
    match event {
        SocketEvent::NewMessage { message } => println!(
            "[#{}] {}: {}",
            message.conversation_id,
            message.sender_label(),
            message.preview(80)
        ),
        SocketEvent::NewConversation { conversation } => println!(
            "[#{}] new conversation with {}",
            conversation.id,
            conversation.customer.display_name()
        ),
        SocketEvent::ConversationUpdate { update } => {
            if let Some(status) = update.status {
                println!("[#{}] status: {status}", update.conversation_id);
            }
        }
        SocketEvent::Connected => println!("live updates connected"),
        SocketEvent::Disconnected { reason } => println!("live updates lost: {reason}"),
        SocketEvent::Reconnecting { attempt } => println!("reconnecting (attempt {attempt})"),
        SocketEvent::Error { message, .. } => println!("! {message}"),
    }
}

async fn watch(config: &AppConfig, args: &CliArgs) -> Result<()> {
    let Authenticated {
        token,
        user,
        client,
    } = authenticate(config, args).await?;

    let notifications: Arc<dyn NotificationPort> =
        Arc::new(DesktopNotificationService::new(config.notifications.enabled));
    let ports = SessionPorts {
        crm: client,
        socket: Arc::new(SocketClient::new(SocketClientConfig::new(&config.ws_url))),
        markers: marker_repository(),
        notifications: Some(notifications),
    };
    let settings = SessionSettings {
        poll_interval: config.poll_interval(),
        view_filter: config.sync.view_filter,
    };

    let mut session = Session::new(token, ports, settings);
    session.start().await?;

    println!(
        "{} watching {} conversations as {}",
        chatdesk::NAME,
        session.sync().conversations().len(),
        user.display_name()
    );

    let mut unread = session.unread().subscribe();
    let printer = tokio::spawn(async move {
        while unread.changed().await.is_ok() {
            let snapshot = unread.borrow_and_update().clone();
            if !snapshot.loading {
                print_snapshot(&snapshot);
            }
        }
    });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            event = session.next_event() => match event {
                Some(event) => print_event(&event),
                None => {
                    warn!("Live update listener closed");
                    break;
                }
            },
        }
    }

    printer.abort();
    session.shutdown();
    info!("Watch stopped");
    Ok(())
}

fn read_password() -> Result<String> {
    print!("password: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(
    config: &AppConfig,
    email: String,
    password: Option<String>,
    no_store: bool,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let client = Arc::new(CrmClient::new(&config.api_url)?);
    let use_case = LoginUseCase::new(client, Arc::new(KeyringTokenStorage::new()));

    let mut request = LoginRequest::new(LoginCredentials::new(email, password));
    if no_store {
        request = request.without_persistence();
    }

    let response = use_case.execute(request).await?;
    println!("signed in as {}", response.user.display_name());
    if response.token_persisted {
        println!("token stored in the system keyring");
    } else {
        println!("{}", response.token.as_str());
    }
    Ok(())
}

async fn run(args: CliArgs, config: AppConfig) -> Result<()> {
    match args.command() {
        Command::Watch => watch(&config, &args).await,
        Command::Login {
            email,
            password,
            no_store,
        } => login(&config, email, password, no_store).await,
        Command::Logout => {
            let client = Arc::new(CrmClient::new(&config.api_url)?);
            LoginUseCase::new(client, Arc::new(KeyringTokenStorage::new()))
                .logout()
                .await?;
            println!("signed out");
            Ok(())
        }
        Command::Customers => {
            let client = authenticate(&config, &args).await?.client;
            for customer in client.fetch_customers().await? {
                println!(
                    "{:>6}  {:<24} {}",
                    customer.id.to_string(),
                    customer.display_name(),
                    customer.phone_number
                );
            }
            Ok(())
        }
        Command::Users => {
            let client = authenticate(&config, &args).await?.client;
            for user in client.fetch_users().await? {
                println!(
                    "{:>6}  {:<24} {:<8} {}",
                    user.id.to_string(),
                    user.display_name(),
                    user.role.as_str(),
                    user.email
                );
            }
            Ok(())
        }
        Command::ResetMarkers => {
            let markers = marker_repository();
            markers.clear()?;
            println!("read markers cleared");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = chatdesk::VERSION, "Starting {}", chatdesk::NAME);

    if config.api_url.trim().is_empty() {
        bail!("no backend url configured");
    }

    run(args, config).await
}
