//! win11toast CLI: show one toast and print its outcome as JSON

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use win11toast::options::ToastDuration;
use win11toast::{Progress, Scalar, SelectionsOption, Shorthand, ToastConfig, ToastOptions};

const HELP_EPILOG: &str = r#"Option resolution order:
  1) --json FILE (camelCase keys, same shapes as the library options)
  2) flags and positionals given on the command line

Environment:
  WIN11TOAST_APP_ID         identity toasts are shown under
  WIN11TOAST_TIMEOUT_SECS   stop waiting for an outcome after N seconds (0 = never)
  RUST_LOG                  log filter (default: info)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "win11toast",
    version,
    about = "Show a Windows toast notification and print its outcome",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
struct Cli {
    /// Title line
    title: Option<String>,
    /// Body text
    body: Option<String>,
    /// Icon path or URL (cropped to a circle)
    #[arg(long)]
    icon: Option<String>,
    /// Hero image path or URL
    #[arg(long)]
    image: Option<String>,
    /// `ms-winsoundevent:` reference, or a file/URL played out of band
    #[arg(long)]
    audio: Option<String>,
    /// Text spoken when the toast appears
    #[arg(long)]
    dialogue: Option<String>,
    /// Text input id (repeatable)
    #[arg(long = "input")]
    inputs: Vec<String>,
    /// Comma-separated choices of one selection box
    #[arg(long)]
    selection: Option<String>,
    /// Button label (repeatable)
    #[arg(long = "button")]
    buttons: Vec<String>,
    /// Progress field as KEY=VALUE (repeatable), e.g. value=0.5
    #[arg(long = "progress", value_parser = parse_key_value)]
    progress: Vec<(String, Scalar)>,
    /// Launch target used when the toast is clicked
    #[arg(long)]
    launch: Option<String>,
    /// Display duration: short or long
    #[arg(long, value_parser = parse_duration)]
    duration: Option<ToastDuration>,
    /// Scenario: default, alarm, reminder, incomingCall, urgent
    #[arg(long)]
    scenario: Option<String>,
    /// AppUserModelID to show the toast under
    #[arg(long = "app-id")]
    app_id: Option<String>,
    /// Register --app-id under this display name first (Windows)
    #[arg(long, requires = "app_id")]
    register: Option<String>,
    /// Read options from a JSON file first
    #[arg(long)]
    json: Option<PathBuf>,
    /// Seconds to wait for an outcome (0 = wait forever)
    #[arg(long)]
    timeout: Option<u64>,
    /// Print the toast XML instead of showing it
    #[arg(long)]
    print_xml: bool,
}

impl Cli {
    /// JSON file options overlaid with command-line values
    fn options(&self) -> anyhow::Result<ToastOptions> {
        let mut options = match &self.json {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ToastOptions::from_json(&raw)?
            }
            None => ToastOptions::new(),
        };

        let text = |s: &Option<String>| s.as_deref().map(Shorthand::from);
        options.title = text(&self.title).or(options.title);
        options.body = text(&self.body).or(options.body);
        options.icon = text(&self.icon).or(options.icon);
        options.image = text(&self.image).or(options.image);
        options.audio = text(&self.audio).or(options.audio);
        options.dialogue = self.dialogue.clone().or(options.dialogue);
        options
            .inputs
            .extend(self.inputs.iter().map(|s| Shorthand::from(s.as_str())));
        options
            .buttons
            .extend(self.buttons.iter().map(|s| Shorthand::from(s.as_str())));
        if let Some(choices) = &self.selection {
            let choices = choices
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(Shorthand::from)
                .collect();
            options.selections = Some(SelectionsOption::Choices(choices));
        }
        if !self.progress.is_empty() {
            let progress: Progress = self.progress.iter().cloned().collect();
            options.progress = Some(progress);
        }
        options.launch_target = self.launch.clone().or(options.launch_target);
        options.duration = self.duration.or(options.duration);
        options.scenario = self.scenario.clone().or(options.scenario);
        options.app_identity = self.app_id.clone().or(options.app_identity);
        Ok(options)
    }
}

/// `KEY=VALUE`; numbers and booleans keep their type
fn parse_key_value(raw: &str) -> Result<(String, Scalar), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    let value = serde_json::from_str::<Scalar>(value).unwrap_or_else(|_| value.into());
    Ok((key.to_string(), value))
}

fn parse_duration(raw: &str) -> Result<ToastDuration, String> {
    match raw {
        "short" => Ok(ToastDuration::Short),
        "long" => Ok(ToastDuration::Long),
        other => Err(format!("expected short or long, got {other:?}")),
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let options = cli.options()?;

    if cli.print_xml {
        let document = win11toast::document::build(&options.normalize()?)?;
        println!("{document}");
        return Ok(());
    }

    if let (Some(display_name), Some(id)) = (&cli.register, &cli.app_id) {
        register(id, display_name)?;
    }

    let mut config = ToastConfig::load();
    if let Some(secs) = cli.timeout {
        config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    debug!(app_identity = %config.app_identity, timeout = ?config.timeout, "showing toast");
    show(options, config).await
}

#[cfg(windows)]
fn register(id: &str, display_name: &str) -> anyhow::Result<()> {
    if !win11toast::appid::is_registered(id) {
        tracing::debug!(id, "app id not registered yet");
    }
    win11toast::appid::register(id, display_name, None)?;
    Ok(())
}

#[cfg(not(windows))]
fn register(_id: &str, _display_name: &str) -> anyhow::Result<()> {
    anyhow::bail!("app id registration is only available on Windows")
}

#[cfg(windows)]
async fn show(options: ToastOptions, config: ToastConfig) -> anyhow::Result<()> {
    use win11toast::{Reactions, Toaster, WinRtRenderer};

    let toaster = Toaster::new(WinRtRenderer, config);
    let outcome = toaster.toast(&options, Reactions::new()).await?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

#[cfg(not(windows))]
async fn show(_options: ToastOptions, _config: ToastConfig) -> anyhow::Result<()> {
    anyhow::bail!("toasts can only be shown on Windows; use --print-xml to inspect the document")
}
