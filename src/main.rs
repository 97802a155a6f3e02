use std::{sync::Arc, time::Duration};

use clap::Parser;
use miette::{miette, Context, IntoDiagnostic};
use tracing::{info, warn};
use ytfetch::{
    cli::{Args, Command},
    commands,
    config::Settings,
    io::LiveWorkspaces,
    logging::init_logging,
    menu::Menu,
    orchestrator::Target,
    outside::NativeDesktop,
    server,
    terminal::Terminal,
    App, Error, Result,
};

/// Exit status of a process interrupted by SIGINT
const INTERRUPTED: i32 = 130;

fn main() -> miette::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level)?;

    let settings = Settings::load(args.config.as_deref()).map_err(Error::into_report)?;
    let desktop = match args.command {
        Command::Serve { .. } => NativeDesktop::headless(),
        _ => NativeDesktop::detect(),
    };
    let app = App::load(settings, Box::new(desktop), LiveWorkspaces::new())
        .map_err(Error::into_report)?;
    let app = Arc::new(app);

    let runtime = tokio::runtime::Runtime::new()
        .into_diagnostic()
        .wrap_err("Could not start the async runtime")?;
    let res = runtime.block_on(run(args.command, app.clone()));
    runtime.shutdown_timeout(Duration::from_secs(1));

    // The HTTP client of the application must not be dropped inside the runtime
    drop(app);

    match res {
        Ok(()) => Ok(()),
        Err(Error::DialogCancelled) => {
            println!("Cancelled, nothing was saved");
            Ok(())
        }
        Err(err) => Err(err.into_report()),
    }
}

async fn run(command: Command, app: Arc<App>) -> Result<()> {
    match command {
        Command::Mp3 { url, save } => {
            in_terminal(app, move |app| {
                commands::download(app, &url, Target::Mp3, &save)
            })
            .await
        }
        Command::Mp4 { url, quality, save } => {
            in_terminal(app, move |app| {
                commands::download(app, &url, Target::Mp4(quality), &save)
            })
            .await
        }
        Command::Info { url } => in_terminal(app, move |app| commands::info(app, &url)).await,
        Command::Streams { url } => {
            in_terminal(app, move |app| commands::streams(app, &url)).await
        }
        Command::Menu => in_terminal(app, |app| Menu::new(app, &Terminal).run()).await,
        Command::Serve { bind } => {
            let bind = bind.unwrap_or(app.settings().server.bind);
            server::serve(app.clone(), bind, shutdown_signal()).await?;

            let removed = app.live_workspaces().purge();
            if removed > 0 {
                info!("Removed {removed} unfinished file(s) and workspace(s)");
            }
            Ok(())
        }
    }
}

/// Run a blocking terminal command, removing its workspaces and exiting
/// when the user interrupts it
async fn in_terminal<F>(app: Arc<App>, command: F) -> Result<()>
where
    F: FnOnce(&App) -> Result<()> + Send + 'static,
{
    let live = app.live_workspaces().clone();
    let task = tokio::task::spawn_blocking(move || command(&app));

    tokio::select! {
        res = task => match res {
            Ok(res) => res,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(miette!("The command did not complete: {err}").into()),
        },
        _ = tokio::signal::ctrl_c() => interrupted(&live),
    }
}

fn interrupted(live: &LiveWorkspaces) -> ! {
    let removed = live.purge();
    warn!("Interrupted, removed {removed} unfinished file(s) and workspace(s)");
    std::process::exit(INTERRUPTED)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(err) => {
            warn!("Could not listen for Ctrl-C, the server runs until killed: {err}");
            std::future::pending::<()>().await
        }
    }
}
