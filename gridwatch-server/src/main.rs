use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use gridwatch_common::models::{LayoutMode, Platform, Viewport};
use gridwatch_core::Error;

mod context;
mod host;

use context::SessionContext;

#[derive(Parser, Debug, Clone)]
#[command(name = "gridwatch")]
#[command(author, version, about = "Gridwatch - watch many live streams as one session")]
pub struct Args {
    /// Stream to add, as `login` (Twitch) or `platform:ref`, e.g. `youtube:VIDEOID`.
    #[arg(long = "channel", short = 'c')]
    channels: Vec<String>,

    /// Layout mode: grid, focus or pip
    #[arg(long)]
    mode: Option<LayoutMode>,

    /// Viewport as WIDTHxHEIGHT
    #[arg(long)]
    viewport: Option<Viewport>,

    /// Where to keep the last layout choice
    #[arg(long)]
    layout_file: Option<String>,

    /// Put live streams ahead of offline ones in the layout
    #[arg(long, default_value = "false")]
    offline_last: bool,

    /// Unmute this channel once the streams are added
    #[arg(long)]
    audible: Option<String>,
}

fn init_tracing() {
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::from_default_env()
        .add_directive("gridwatch=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

fn parse_channel(raw: &str) -> Result<(Platform, String), Error> {
    match raw.split_once(':') {
        Some((platform, rest)) => {
            let platform = platform.parse::<Platform>().map_err(Error::Validation)?;
            Ok((platform, rest.to_string()))
        }
        None => Ok((Platform::Twitch, raw.to_string())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("Gridwatch starting with {} channel(s)", args.channels.len());

    if let Err(e) = run(args).await {
        error!("Session error: {:?}", e);
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let ctx = SessionContext::new(&args).await?;
    let session = ctx.session.clone();

    for (index, raw) in args.channels.iter().enumerate() {
        let (platform, channel) = match parse_channel(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping '{}': {}", raw, e);
                continue;
            }
        };
        let adapter = host::spawn_adapter(platform, &channel, index);
        if let Err(e) = session.add_stream(platform, &channel, adapter) {
            warn!("Could not add '{}': {}", raw, e);
        }
    }

    session.start(ctx.config.poller());

    if let Some(target) = &args.audible {
        // Give the headless players a moment to report ready; the toggle is
        // queued either way.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let wanted = target.to_lowercase();
        match session.streams().iter().find(|s| s.channel_ref.to_lowercase() == wanted) {
            Some(entry) => {
                session.toggle_mute(entry.id)?;
            }
            None => warn!("--audible '{}' is not one of the session's channels", target),
        }
    }

    let mut layout_rx = session.subscribe_layout();
    let status_session = session.clone();
    let status_task = tokio::spawn(async move {
        while layout_rx.changed().await.is_ok() {
            let plan = layout_rx.borrow_and_update().clone();
            info!("Layout now {} ({}x{}, {} slots)", plan.mode, plan.columns, plan.rows, plan.slots.len());
            for entry in status_session.streams() {
                info!(
                    "  [{}] {} {} live={} viewers={} muted={}{}",
                    entry.slot_index.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
                    entry.platform,
                    entry.channel_ref,
                    entry.is_live,
                    entry.viewer_count,
                    entry.muted,
                    if entry.stale { " (stale)" } else { "" },
                );
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down...");
    session.shutdown().await;
    status_task.abort();
    info!("Final rate budget: {:?}", ctx.client.limiter().budget());
    Ok(())
}
