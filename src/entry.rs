use std::ffi::OsString;
use std::sync::Arc;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{info, warn};

use lapreplay::adapters::{RemoteMediaAdapter, RemoteMediaConfig, SourceLocks};
use lapreplay::args::ReplayArgs;
use lapreplay::config::{
    ReplaySettings, TargetSettings, apply_config, default_config_path, load_config,
};
use lapreplay::error::AppResult;
use lapreplay::playback::{
    PlaybackAdapter, PlaybackController, PlaybackState, PlaybackTargets,
};
use lapreplay::recorder::RecordingController;
use lapreplay::remote::obs::{ObsClient, ObsConnectOptions};
use lapreplay::remote::{RemoteControl, RemoteControlExt, catalog};

use crate::console::Console;
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};

pub(crate) fn run() -> AppResult<()> {
    let (mut args, matches) = match parse_args()? {
        Some(parsed) => parsed,
        None => return Ok(()),
    };

    let config = load_config(args.config.as_deref())?;
    if let Some(config) = config.as_ref() {
        apply_config(&mut args, &matches, config)?;
    }

    lapreplay::system::logger::init_logging(args.verbose, args.no_color);

    let settings = ReplaySettings::resolve(&args, config.as_ref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(settings))
}

fn parse_args() -> AppResult<Option<(ReplayArgs, ArgMatches)>> {
    let mut cmd = ReplayArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = ReplayArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    default_config_path().is_none()
}

async fn run_async(settings: ReplaySettings) -> AppResult<()> {
    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let mut options = ObsConnectOptions::new(
        settings.connection.url.clone(),
        settings.connection.password.clone(),
    );
    options.request_timeout = settings.connection.request_timeout;
    let client = Arc::new(ObsClient::connect(&options).await?);
    let remote: Arc<dyn RemoteControl> = client.clone();

    let startup_scene = remote.program_scene().await?;
    info!("Program scene at startup: {}", startup_scene);

    let locks = SourceLocks::new();
    let program = build_adapter(&remote, &settings, &settings.program, &startup_scene, &locks)
        .await?;
    let preview = match settings.preview.as_ref() {
        Some(preview) => {
            Some(build_adapter(&remote, &settings, preview, &startup_scene, &locks).await?)
        }
        None => None,
    };

    let mut targets = PlaybackTargets::new(Some(program), preview);
    targets.set_preview_only(settings.preview_only);
    let playback = Arc::new(PlaybackController::new(targets));
    let (recorder, replays) = RecordingController::new(Arc::clone(&remote), settings.recorder)?;

    let console = Console::new(Arc::clone(&remote), &recorder, Arc::clone(&playback));
    let result = console.run(replays, shutdown_tx.subscribe()).await;

    let state = playback.state();
    if !matches!(state, PlaybackState::NotReady | PlaybackState::Ending)
        && let Err(err) = playback.abort().await
    {
        warn!("Failed to abort playback on exit: {}", err);
    }
    playback.shutdown();
    recorder.shutdown();
    client.close();
    if shutdown_tx.send(()).is_err() {
        info!("Signal handler already stopped");
    }
    signal_handle.await?;
    result
}

async fn build_adapter(
    remote: &Arc<dyn RemoteControl>,
    settings: &ReplaySettings,
    target: &TargetSettings,
    startup_scene: &str,
    locks: &SourceLocks,
) -> AppResult<Arc<dyn PlaybackAdapter>> {
    let source = catalog::resolve_target(remote.as_ref(), &target.scene, &target.item).await?;
    info!(
        "Resolved {} target {} in {} (item {})",
        target.role, source.item_name, source.scene_name, source.scene_item_id
    );
    let fallback_scene = target
        .fallback_scene
        .clone()
        .unwrap_or_else(|| startup_scene.to_owned());
    let config = RemoteMediaConfig {
        source,
        options: target.options,
        fallback_scene,
        convergence: settings.convergence,
    };
    Ok(Arc::new(RemoteMediaAdapter::new(
        target.role,
        Arc::clone(remote),
        config,
        locks.clone(),
    )))
}
