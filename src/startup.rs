use crate::assistant::Assistant;
use crate::commands::{execute, parse_command, Reply};
use crate::components::chat::ChatModels;
use crate::components::google_auth::AuthClient;
use crate::components::google_calendar::GoogleCalendar;
use crate::components::instances::InstanceRegistry;
use crate::components::storage::{start_storage, StorageHandle};
use crate::components::{ComponentManager, ComponentServices};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rig=warn,reqwest=warn,hyper=warn")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Long-lived services shared by every command
#[derive(Debug, Clone)]
pub struct Services {
    pub config: Arc<RwLock<Config>>,
    pub storage: StorageHandle,
    pub auth: AuthClient,
    pub components: Arc<ComponentManager>,
}

impl Services {
    pub fn registry(&self) -> InstanceRegistry {
        InstanceRegistry::new(self.storage.clone())
    }
}

/// Start storage, restore the Google session and initialize components
pub async fn start_services(config: Arc<RwLock<Config>>) -> miette::Result<Services> {
    let storage = start_storage(&*config.read().await)?;
    let auth = AuthClient::new(Arc::clone(&config), storage.clone());

    if config.read().await.has_google_credentials() {
        let state = auth.restore().await;
        info!("Google sign-in state: {:?}", state);
    }

    let mut component_manager = ComponentManager::new(Arc::clone(&config));

    // Register Google Calendar component
    component_manager.register(GoogleCalendar::new());

    component_manager
        .init_all(ComponentServices {
            storage: storage.clone(),
            auth: auth.clone(),
        })
        .await?;

    Ok(Services {
        config,
        storage,
        auth,
        components: Arc::new(component_manager),
    })
}

/// Chat backends for the configured API key
pub async fn chat_models(config: &Arc<RwLock<Config>>) -> ChatModels {
    let config = config.read().await;
    ChatModels::gemini(
        &config.gemini_api_key,
        &config.endpoints.gemini_api,
        config.is_component_enabled("search_grounding"),
    )
}

/// Open an instance and run the interactive chat until quit or a signal
pub async fn run_chat(services: Services, instance_name: &str, pin: &str) -> miette::Result<()> {
    let instance = services.registry().unlock(instance_name, pin).await?;

    let assistant = {
        let models = chat_models(&services.config).await;
        let config = services.config.read().await;
        let auth = config.has_google_credentials().then(|| services.auth.clone());
        Assistant::open(
            instance,
            models,
            &config,
            auth,
            services.components.calendar_handle().await,
        )
        .await?
    };

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let shutdown_components = Arc::clone(&services.components);
    let shutdown_storage = services.storage.clone();
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components, shutdown_storage).await;
    });

    println!(
        "{} is ready. Type /help for commands.",
        assistant.settings().assistant_name
    );

    tokio::select! {
        result = repl(assistant) => {
            shutdown::shutdown_services(&services.components, &services.storage).await;
            result
        }
        _ = shutdown_recv => {
            info!("Received shutdown signal, leaving chat");
            Ok(())
        }
    }
}

async fn repl(mut assistant: Assistant) -> miette::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().map_err(Error::from)?;

        let Some(line) = lines.next_line().await.map_err(Error::from)? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match parse_command(&line) {
            Ok(command) => execute(&mut assistant, command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Reply::Text(text)) => println!("{}\n", text),
            Ok(Reply::Quit) => return Ok(()),
            Err(e) => {
                error!("Command failed: {:?}", e);
                println!("{:?}\n", miette::Report::new(e));
            }
        }
    }
}
