use clap::{Parser, Subcommand};
use hovimestari::components::instances::InstanceSettings;
use hovimestari::startup;
use tracing::info;

#[derive(Parser)]
#[command(name = "hovimestari", version, about = "Personal assistant with chat, calendar and memory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with an instance
    Chat {
        #[arg(short, long)]
        instance: String,
        #[arg(short, long)]
        pin: String,
    },
    /// Create a new PIN-protected instance
    Create {
        name: String,
        #[arg(short, long)]
        pin: String,
        /// Assistant name shown in replies
        #[arg(long)]
        assistant_name: Option<String>,
    },
    /// List instances
    List,
    /// Delete an instance and all of its data
    Delete {
        name: String,
        #[arg(short, long)]
        pin: String,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting Hovimestari");

    // Load configuration
    let config = startup::load_config().await?;
    let services = startup::start_services(config.clone()).await?;

    match cli.command {
        Commands::Chat { instance, pin } => startup::run_chat(services, &instance, &pin).await,
        Commands::Create {
            name,
            pin,
            assistant_name,
        } => {
            let mut settings = InstanceSettings {
                model: config.read().await.gemini_model.clone(),
                ..Default::default()
            };
            if let Some(assistant_name) = assistant_name {
                settings.set("name", &assistant_name)?;
            }

            let instance = services.registry().create_instance(&name, &pin, settings).await?;
            println!("Created instance {}", instance.name());
            Ok(())
        }
        Commands::List => {
            let names = services.registry().list_instances().await?;
            if names.is_empty() {
                println!("No instances yet. Create one with `hovimestari create <name> --pin <pin>`.");
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Delete { name, pin } => {
            services.registry().delete_instance(&name, &pin).await?;
            println!("Deleted instance {}", name);
            Ok(())
        }
    }
}
