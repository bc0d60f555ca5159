use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixelsmear::app::{App, ImageSpec, RunLimits, RunSummary};
use pixelsmear::config::Settings;
use pixelsmear::control::Controller;
use pixelsmear::display::{HeadlessDisplay, Presenter};
use pixelsmear::image_source;
use pixelsmear::mqtt::MqttClient;

#[derive(Parser)]
#[command(name = "pixelsmear")]
#[command(about = "Real-time pixel sorting with live-tunable parameters")]
struct Cli {
    /// Source image, or "none" for the fallback image
    image: Option<String>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Blend strength (0..1)
    #[arg(short, long)]
    strength: Option<f64>,

    /// Threshold tuning (0..1, negative values sort toward darker pixels)
    #[arg(short, long, allow_hyphen_values = true)]
    threshold: Option<f64>,

    /// Compare each pixel with its right neighbor instead of the one below
    #[arg(long)]
    horizontal: bool,

    /// Image used when the source can't be loaded
    #[arg(long)]
    fallback: Option<PathBuf>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Stop after this many passes
    #[arg(long)]
    passes: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<f64>,

    /// Write the last frame to this image file on exit
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Control socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Disable the control socket
    #[arg(long)]
    no_socket: bool,

    /// MQTT broker host (enables MQTT control)
    #[arg(long)]
    mqtt_host: Option<String>,

    /// MQTT topic for parameter changes
    #[arg(long)]
    mqtt_topic: Option<String>,
}

impl Cli {
    /// Fold CLI overrides into the file (or default) settings
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(v) = self.strength {
            settings.strength = v;
        }
        if let Some(v) = self.threshold {
            settings.threshold = v;
        }
        if self.horizontal {
            settings.vertical = false;
        }
        if let Some(path) = &self.fallback {
            settings.fallback_image.clone_from(path);
        }
        if let Some(path) = &self.socket {
            settings.socket_path = Some(path.clone());
        }
        if self.no_socket {
            settings.socket_path = None;
        }
        if let Some(host) = &self.mqtt_host {
            settings.mqtt_host = Some(host.clone());
        }
        if let Some(topic) = &self.mqtt_topic {
            settings.mqtt_topic.clone_from(topic);
        }
        Ok(settings)
    }

    fn limits(&self) -> RunLimits {
        RunLimits {
            max_passes: self.passes,
            max_duration: self.seconds.map(Duration::from_secs_f64),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixelsmear=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    let image = ImageSpec {
        source: image_source::resolve(cli.image.as_deref()),
        fallback: settings.fallback_image.clone(),
    };

    if cli.headless || !cfg!(feature = "window") {
        let display = HeadlessDisplay::new(settings.refresh_hz_fallback);
        let app = build_app(display, &settings, image);
        let (summary, app) = run_app(app, cli.limits())?;
        if let Some(path) = &cli.output {
            app.presenter()
                .save_last_frame(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        report(&summary);
        return Ok(());
    }

    #[cfg(feature = "window")]
    {
        use pixelsmear::display::{SdlDisplay, SdlWindow};

        if cli.output.is_some() {
            tracing::warn!("--output is only supported with --headless");
        }

        // The window is resized to the image on the first frame
        let (window, texture_creator) = SdlWindow::open(
            "pixelsmear",
            640,
            480,
            settings.refresh_hz_fallback,
        )?;
        print_controls();
        let display = SdlDisplay::new(window, &texture_creator);
        let app = build_app(display, &settings, image);
        let (summary, _) = run_app(app, cli.limits())?;
        report(&summary);
    }

    Ok(())
}

fn build_app<P: Presenter>(presenter: P, settings: &Settings, image: ImageSpec) -> App<P> {
    let mut app = App::new(presenter, settings.effect_parameters(), image)
        .with_reload_on_commit(settings.reload_on_commit);

    if let Some(path) = &settings.socket_path {
        match Controller::new(path) {
            Ok(controller) => app.add_source(Box::new(controller)),
            Err(e) => tracing::warn!(error = %e, "Control socket disabled"),
        }
    }

    if let Some(host) = &settings.mqtt_host {
        match MqttClient::new(host, settings.mqtt_port, &settings.mqtt_topic) {
            Ok(client) => app.add_source(Box::new(client)),
            Err(e) => tracing::warn!(error = %e, "MQTT control disabled"),
        }
    }

    app
}

fn run_app<P: Presenter>(
    mut app: App<P>,
    limits: RunLimits,
) -> anyhow::Result<(RunSummary, App<P>)> {
    app.start().context("Effect did not start")?;
    let summary = app.run(limits)?;
    Ok((summary, app))
}

fn report(summary: &RunSummary) {
    let secs = summary.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.passes as f64 / secs
    } else {
        0.0
    };
    println!(
        "{} passes, {} frames in {:.1}s ({:.1} passes/s)",
        summary.passes, summary.frames, secs, rate
    );
}

#[cfg(feature = "window")]
fn print_controls() {
    println!("=== pixelsmear ===");
    println!("Controls:");
    println!("  Up/Down     - Strength +/-");
    println!("  Left/Right  - Threshold -/+");
    println!("  V           - Toggle vertical/horizontal");
    println!("  Space       - Pause/resume");
    println!("  R           - Restart from the source image");
    println!("  Escape      - Quit");
}
