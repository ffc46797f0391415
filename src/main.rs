use clap::{Arg, ArgAction, ArgMatches, Command};
use livefeed::capture::{
    CaptureOptions, PreviewRef, PreviewSurface, SyntheticDevices, VideoCapturer, VideoElement,
};
use livefeed::config::{Config, app_name, version};
use livefeed::display::{
    CanvasRef, CanvasVideoRenderer, DrawingSurface, IntervalScheduler, LoopbackSink, MemoryCanvas,
};
use livefeed::pipeline::PipelineHealth;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use std::{panic, process};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(1);

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file."),
        )
        .arg(
            Arg::new("seconds")
                .short('s')
                .long("seconds")
                .value_name("SECONDS")
                .help("How long to run before shutting down.")
                .value_parser(clap::value_parser!(u64))
                .default_value("5"),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .value_name("DEVICE ID")
                .help("Camera to capture from."),
        )
        .arg(
            Arg::new("switch-to")
                .long("switch-to")
                .value_name("DEVICE ID")
                .help("Camera to switch to halfway through the run."),
        )
        .arg(
            Arg::new("screen")
                .long("screen")
                .value_name("SOURCE ID")
                .help("Share this screen source instead of a camera."),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List video input devices and exit.")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // exit the whole process as soon as any thread panics
    let orig_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        process::exit(105);
    }));

    let config = match matches.get_one::<String>("config") {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{:#}", e);
                process::exit(2);
            }
        },
        None => Config::default(),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the runtime: {}", e);
            process::exit(1);
        }
    };

    // gracefully stop the pipeline on SIGINT, SIGTERM, or SIGHUP
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
        warn!("Error setting Ctrl-C handler: {}", e);
    }

    runtime.block_on(run(config, &matches, shutdown));
}

async fn run(config: Config, matches: &ArgMatches, shutdown: CancellationToken) {
    let health = Arc::new(PipelineHealth::new());
    let capturer = VideoCapturer::with_health(
        Arc::new(SyntheticDevices::default()),
        config.clone(),
        Arc::clone(&health),
    );

    if matches.get_flag("list") {
        for device in capturer.enumerate_devices().await {
            println!("{}\t{}", device.device_id, device);
        }
        return;
    }

    if let Some(device) = matches.get_one::<String>("device") {
        capturer.set_preferred_device(device.as_str());
    }

    let element: Arc<dyn PreviewSurface> = Arc::new(VideoElement::default());
    let preview = Arc::new(PreviewRef::new(Some(element)));
    capturer.set_local_preview(Some(Arc::downgrade(&preview)));

    let canvas = Arc::new(MemoryCanvas::new(
        config.default_capture.max_width,
        config.default_capture.max_height,
    ));
    let canvas_ref = Arc::new(CanvasRef::new(Some(canvas.clone() as Arc<dyn DrawingSurface>)));
    let renderer = CanvasVideoRenderer::with_health(
        Arc::new(IntervalScheduler::from_config(&config)),
        &config,
        Arc::clone(&health),
    );
    renderer.set_canvas(Some(Arc::downgrade(&canvas_ref)));

    let sink = Arc::new(LoopbackSink::new());
    renderer.enable(sink.clone());

    let mut options: CaptureOptions = config.default_capture.clone();
    if let Some(source) = matches.get_one::<String>("screen") {
        options = options.with_screen_share(source.as_str());
    }
    info!("{} {} capturing {:?}", app_name(), version(), options);
    capturer.enable_capture_and_send(sink, Some(options));

    let seconds = matches.get_one::<u64>("seconds").copied().unwrap_or(5);
    let started = Instant::now();
    let deadline = started + Duration::from_secs(seconds);
    let mut switch_to = matches.get_one::<String>("switch-to").cloned();
    let mut ticker = tokio::time::interval(HEALTH_LOG_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => break,
            _ = ticker.tick() => {
                info!("{:?} {}", capturer.phase(), health.summary());
                if capturer.capturing()
                    && started.elapsed() > HEALTH_LOG_INTERVAL * 2
                    && health.is_stalled(HEALTH_LOG_INTERVAL * 2)
                {
                    warn!("No frame sent for {:?}", HEALTH_LOG_INTERVAL * 2);
                }
            }
        }

        if started.elapsed() * 2 >= deadline - started
            && let Some(device) = switch_to.take()
        {
            capturer.set_preferred_device(device);
        }
    }

    capturer.disable();
    renderer.disable();
    info!("Stopped; canvas {:?}, {}", canvas.size(), health.summary());
}
