use chatdrive_engine::runtime::{ClientConfig, ClientRuntime};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Logout,
    SyncFolders,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--logout" => mode = CliMode::Logout,
            "--sync-folders" => mode = CliMode::SyncFolders,
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mode = parse_cli_mode(std::env::args())?;
    if mode == CliMode::Help {
        println!("Usage: chatdrive [--logout | --sync-folders]");
        println!("  --logout         Sign out and forget stored credentials");
        println!("  --sync-folders   Add folders known to the backend to the local cache");
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let runtime = ClientRuntime::bootstrap(config).await?;
    match mode {
        CliMode::Logout => {
            runtime.logout().await;
            tracing::info!("signed out");
            Ok(())
        }
        CliMode::SyncFolders => {
            let added = runtime.sync_folders().await?;
            println!("{added} new folders");
            Ok(())
        }
        CliMode::Run | CliMode::Help => runtime.run().await,
    }
}
