use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use minimlogo_contracts::chat::{parse_intent, STUDIO_HELP_COMMANDS};
use minimlogo_contracts::events::EventLog;
use minimlogo_contracts::view_state::{ActiveTab, FormField};
use minimlogo_contracts::{
    build_prompt, BrandDescription, ColorPalette, GeneratedAsset, LogoError, LogoStyle,
    StudioConfig, WhiteThreshold,
};
use minimlogo_engine::background::remove_near_white_background_with_report;
use minimlogo_engine::{DirectorySink, ExportVariant, GenerationClient, LogoStudio};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "minimlogo", version, about = "Minimalist logo studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one logo and write its PNG exports.
    Generate(GenerateArgs),
    /// Print the prompt that would be sent for a brand.
    Prompt(BrandArgs),
    /// Strip the near-white background from an existing image.
    Strip(StripArgs),
    /// Interactive session with an in-memory library.
    Studio(StudioArgs),
}

#[derive(Debug, Clone, Args)]
struct BrandArgs {
    #[arg(long = "brand")]
    brand_name: String,
    #[arg(long)]
    industry: String,
    #[arg(long, default_value = "geometric")]
    style: LogoStyle,
    #[arg(long, default_value = "monochrome")]
    palette: ColorPalette,
    #[arg(long, default_value = "")]
    details: String,
    #[arg(long)]
    slogan: Option<String>,
}

impl BrandArgs {
    fn form_fields(&self) -> Vec<FormField> {
        vec![
            FormField::BrandName(self.brand_name.clone()),
            FormField::Industry(self.industry.clone()),
            FormField::Style(self.style.clone()),
            FormField::Palette(self.palette),
            FormField::CustomDetails(self.details.clone()),
            FormField::Slogan(self.slogan.clone().unwrap_or_default()),
        ]
    }

    fn description(&self) -> BrandDescription {
        BrandDescription::new(
            self.brand_name.clone(),
            self.industry.clone(),
            self.style.clone(),
            self.palette,
        )
        .with_details(self.details.clone())
        .with_slogan(self.slogan.clone().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Args)]
struct EngineArgs {
    /// Image provider: gemini or dryrun.
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    /// Per-channel cutoff above which a pixel counts as background.
    #[arg(long)]
    threshold: Option<WhiteThreshold>,
    #[arg(long)]
    events: Option<PathBuf>,
}

impl EngineArgs {
    fn config(&self) -> StudioConfig {
        let mut config = StudioConfig::from_env();
        if let Some(provider) = self.provider.as_ref() {
            config.provider = provider.clone();
        }
        if let Some(model) = self.model.as_ref() {
            config.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            config.white_threshold = threshold;
        }
        config
    }

    fn event_log(&self, out: &Path) -> EventLog {
        let path = self
            .events
            .clone()
            .unwrap_or_else(|| out.join("events.jsonl"));
        EventLog::new(path, session_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantChoice {
    White,
    Transparent,
    Both,
}

impl VariantChoice {
    fn variants(self) -> Vec<ExportVariant> {
        match self {
            Self::White => vec![ExportVariant::White],
            Self::Transparent => vec![ExportVariant::Transparent],
            Self::Both => vec![ExportVariant::White, ExportVariant::Transparent],
        }
    }
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[command(flatten)]
    brand: BrandArgs,
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, value_enum, default_value_t = VariantChoice::Both)]
    variant: VariantChoice,
}

#[derive(Debug, Parser)]
struct StripArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    output: PathBuf,
    #[arg(long, default_value_t = WhiteThreshold::DEFAULT)]
    threshold: WhiteThreshold,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long)]
    out: PathBuf,
}

const PROGRESS_TICK: Duration = Duration::from_millis(400);

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("minimlogo error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Prompt(args) => {
            println!("{}", build_prompt(&args.description()));
            Ok(0)
        }
        Command::Strip(args) => run_strip(args),
        Command::Studio(args) => {
            run_studio(args)?;
            Ok(0)
        }
    }
}

fn open_studio(engine: &EngineArgs, out: &Path) -> Result<LogoStudio> {
    let client = GenerationClient::from_config(engine.config())?;
    Ok(LogoStudio::new(client, engine.event_log(out)))
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let mut studio = open_studio(&args.engine, &args.out)?;
    for field in args.brand.form_fields() {
        studio.edit(field)?;
    }
    let Some(asset_id) = generate_with_progress(&mut studio)? else {
        return Ok(1);
    };

    let sink = DirectorySink::new(&args.out);
    let mut failures = 0;
    for variant in args.variant.variants() {
        match studio.export(&asset_id, variant, &sink) {
            Ok(path) => println!("Saved {}", path.display()),
            Err(err) => {
                eprintln!("{}: {err}", err.user_message());
                failures += 1;
            }
        }
    }
    Ok(if failures == 0 { 0 } else { 1 })
}

fn run_strip(args: StripArgs) -> Result<i32> {
    let bytes =
        fs::read(&args.input).with_context(|| format!("failed reading {}", args.input.display()))?;
    let (png, report) = remove_near_white_background_with_report(&bytes, args.threshold)?;
    if let Some(parent) = args.output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, png)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "Cleared {} of {} pixels (threshold {}) -> {}",
        report.cleared_pixels,
        u64::from(report.width) * u64::from(report.height),
        args.threshold,
        args.output.display()
    );
    Ok(0)
}

/// Runs one submission on a worker thread while printing progress.
/// Returns the new asset id, or `None` after reporting a failure.
fn generate_with_progress(studio: &mut LogoStudio) -> Result<Option<String>> {
    let pending = match studio.begin_submit() {
        Ok(pending) => pending,
        Err(err) => {
            println!("{}", err.user_message());
            return Ok(None);
        }
    };

    let client = studio.client();
    let prompt = pending.prompt.clone();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(client.generate_from_prompt(&prompt));
    });

    print!("Curating design for {}", pending.request.brand_name.trim());
    io::stdout().flush()?;
    let outcome = loop {
        match rx.recv_timeout(PROGRESS_TICK) {
            Ok(outcome) => break outcome,
            Err(RecvTimeoutError::Timeout) => {
                print!(".");
                io::stdout().flush()?;
            }
            Err(RecvTimeoutError::Disconnected) => {
                break Err(LogoError::GenerationFailed(
                    "generation worker stopped without a result".to_string(),
                ))
            }
        }
    };
    println!();

    match studio.complete_submit(pending, outcome) {
        Ok(asset) => {
            println!("Generated {}", describe_asset(1, asset));
            Ok(Some(asset.id.clone()))
        }
        Err(err) => {
            println!("{}", err.user_message());
            Ok(None)
        }
    }
}

fn run_studio(args: StudioArgs) -> Result<()> {
    let mut studio = open_studio(&args.engine, &args.out)?;
    let sink = DirectorySink::new(&args.out);
    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "MinimLogo studio ({}). Type /help for commands.",
        studio.client().provider_name()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        let value = intent.arg_str("value").unwrap_or_default().to_string();
        match intent.action.as_str() {
            "noop" => {}
            "help" => println!("Commands: {}", STUDIO_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "set_brand_name" => {
                studio.edit(FormField::BrandName(value))?;
                print_form(&studio.state().form);
            }
            "set_industry" => {
                studio.edit(FormField::Industry(value))?;
                print_form(&studio.state().form);
            }
            "set_style" => {
                studio.edit(FormField::Style(LogoStyle::parse_label(&value)))?;
                print_form(&studio.state().form);
            }
            "set_palette" => match value.parse::<ColorPalette>() {
                Ok(palette) => {
                    studio.edit(FormField::Palette(palette))?;
                    print_form(&studio.state().form);
                }
                Err(err) => println!("{err}"),
            },
            "set_details" => {
                studio.edit(FormField::CustomDetails(value))?;
                print_form(&studio.state().form);
            }
            "set_slogan" => {
                studio.edit(FormField::Slogan(value))?;
                print_form(&studio.state().form);
            }
            "set_threshold" => match value.parse::<WhiteThreshold>() {
                Ok(threshold) => {
                    studio.set_threshold(threshold);
                    println!("White threshold set to {threshold}");
                }
                Err(err) => println!("{err}"),
            },
            "show_form" => print_form(&studio.state().form),
            "generate" => {
                if let Some(details) = intent.details {
                    studio.edit(FormField::CustomDetails(details))?;
                }
                studio.select_tab(ActiveTab::Create)?;
                generate_with_progress(&mut studio)?;
            }
            "show_history" | "open_library" => {
                if intent.action == "open_library" {
                    studio.select_tab(ActiveTab::Library)?;
                }
                print_history(&studio);
            }
            "open_create" => {
                studio.select_tab(ActiveTab::Create)?;
                print_form(&studio.state().form);
            }
            "clear_history" => {
                let removed = studio.clear_history()?;
                println!("Cleared {removed} logo(s) from the library");
            }
            "export" => {
                let target = intent.arg_str("target").unwrap_or("1").to_string();
                let variants = match intent.arg_str("variant").unwrap_or("white") {
                    "both" => vec![ExportVariant::White, ExportVariant::Transparent],
                    raw => match raw.parse::<ExportVariant>() {
                        Ok(variant) => vec![variant],
                        Err(err) => {
                            println!("{err}");
                            continue;
                        }
                    },
                };
                let Some(asset_id) = studio.resolve_asset(&target).map(|asset| asset.id.clone())
                else {
                    println!("No logo matches '{target}'. Use /history to list them.");
                    continue;
                };
                for variant in variants {
                    match studio.export(&asset_id, variant, &sink) {
                        Ok(path) => println!("Saved {}", path.display()),
                        Err(err) => println!("{}", err.user_message()),
                    }
                }
            }
            "unknown" => println!(
                "Unknown command /{}. Type /help for commands.",
                intent.arg_str("command").unwrap_or_default()
            ),
            other => println!("Unhandled action {other}"),
        }
    }

    Ok(())
}

fn print_form(form: &BrandDescription) {
    let rows = [
        ("brand", form.brand_name.as_str()),
        ("industry", form.industry.as_str()),
        ("style", form.style.label()),
        ("palette", form.palette.label()),
        ("details", form.custom_details.as_str()),
        ("slogan", form.slogan_text().unwrap_or_default()),
    ];
    for (label, value) in rows {
        let shown = if value.trim().is_empty() { "-" } else { value };
        println!("  {label:<9}{shown}");
    }
}

fn print_history(studio: &LogoStudio) {
    if studio.history().is_empty() {
        println!("Your library is empty.");
        return;
    }
    for (idx, asset) in studio.history().iter().enumerate() {
        println!("{}", describe_asset(idx + 1, asset));
    }
}

fn describe_asset(position: usize, asset: &GeneratedAsset) -> String {
    format!(
        "{position}. {} [{} / {}] id={} at {}",
        asset.request.brand_name.trim(),
        asset.request.style.label(),
        asset.request.palette.label(),
        asset.id.chars().take(8).collect::<String>(),
        asset.created_at.format("%H:%M:%S")
    )
}

fn session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
