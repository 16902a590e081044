use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use sceneline::{
    Canvas, CanvasDimensions, SessionConfig, SessionServices, TaskBundle, TaskSession, Timeline,
    TimelineOptions, fixtures_key, is_object_visible, resolve_background,
};

#[derive(Parser, Debug)]
#[command(name = "sceneline", version)]
struct Cli {
    /// Session config JSON. Defaults apply to anything missing.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one state of a task bundle as a PNG.
    Render(RenderArgs),
    /// Summarize every state of a task bundle.
    Inspect(InspectArgs),
    /// Load a task from the task host and export its bundle.
    Fetch(FetchArgs),
    /// Apply a language instruction to one state of a saved bundle.
    Instruct(InstructArgs),
}

#[derive(Args, Debug)]
struct CanvasArgs {
    /// Canvas width; overrides the config.
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height; overrides the config.
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Task bundle JSON (`{ "envAndEnvStates": ... }`).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// State index (0-based).
    #[arg(long, default_value_t = 0)]
    state: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Directory image references resolve against. Defaults to the bundle's directory.
    #[arg(long)]
    images: Option<PathBuf>,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Task bundle JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Task name under `study_tasks/`.
    #[arg(long)]
    task: String,

    /// Directory to write `env_and_envStates.json` into.
    #[arg(long)]
    out_dir: PathBuf,

    /// Task host base URL; overrides the config.
    #[arg(long)]
    tasks_url: Option<String>,

    /// Generation service base URL; overrides the config.
    #[arg(long)]
    service_url: Option<String>,

    /// Directory image references resolve against.
    #[arg(long, default_value = ".")]
    images: PathBuf,
}

#[derive(Parser, Debug)]
struct InstructArgs {
    /// Task bundle JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// State the instruction applies to.
    #[arg(long)]
    state: usize,

    /// The instruction text.
    #[arg(long)]
    text: String,

    /// Directory to write the updated `env_and_envStates.json` into.
    #[arg(long)]
    out_dir: PathBuf,

    /// Generation service base URL; overrides the config.
    #[arg(long)]
    service_url: Option<String>,

    /// Directory image references resolve against. Defaults to the bundle's directory.
    #[arg(long)]
    images: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Render(args) => cmd_render(config, args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Fetch(args) => cmd_fetch(config, args).await,
        Command::Instruct(args) => cmd_instruct(config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn read_bundle(path: &Path) -> anyhow::Result<TaskBundle> {
    TaskBundle::from_path(path).with_context(|| format!("load task bundle '{}'", path.display()))
}

fn bundle_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn task_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "task".to_string())
}

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create output dir '{}'", dir.display()))
}

fn cmd_render(mut config: SessionConfig, args: RenderArgs) -> anyhow::Result<()> {
    let bundle = read_bundle(&args.in_path)?;
    if let Some(width) = args.canvas.width {
        config.canvas.width = width;
    }
    if let Some(height) = args.canvas.height {
        config.canvas.height = height;
    }

    let images = args.images.unwrap_or_else(|| bundle_dir(&args.in_path));
    let services = SessionServices::http(&config, images)?;
    let canvas = config.canvas;
    let session =
        TaskSession::from_bundle(&task_name(&args.in_path), config, services, canvas, bundle)?;
    let png = session
        .render_state_png(args.state)
        .with_context(|| format!("render state {}", args.state))?;

    ensure_dir(&bundle_dir(&args.out))?;
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bundle = read_bundle(&args.in_path)?;
    let timeline = Timeline::from_bundle(bundle, TimelineOptions::default())?;
    let env = timeline.env();

    println!(
        "{} fixtures, {} objects, {} backgrounds, {} states",
        env.fixtures.len(),
        env.objects.len(),
        env.backgrounds.len(),
        timeline.len()
    );
    for (index, state) in timeline.states().iter().enumerate() {
        let key = fixtures_key(env, state);
        let background = if resolve_background(env, state).is_some() {
            "found"
        } else {
            "missing"
        };
        let visible: Vec<&str> = state
            .object_order
            .iter()
            .map(|id| id.as_str())
            .filter(|id| is_object_visible(env, state, id))
            .collect();
        println!("[{index}] {}", state.caption.as_deref().unwrap_or("-"));
        println!("    background: {key} ({background})");
        println!("    visible:    {}", visible.join(", "));
    }
    Ok(())
}

async fn cmd_fetch(mut config: SessionConfig, args: FetchArgs) -> anyhow::Result<()> {
    if let Some(url) = args.tasks_url {
        config.tasks_url = url;
    }
    if let Some(url) = args.service_url {
        config.service_url = url;
    }
    let services = SessionServices::http(&config, &args.images)?;
    let canvas = CanvasDimensions::new(config.canvas);
    let session = TaskSession::bootstrap(&args.task, config, services, canvas)
        .await
        .with_context(|| format!("bootstrap task '{}'", args.task))?;

    for requirement in session.requirements() {
        eprintln!("requirement: {requirement}");
    }
    ensure_dir(&args.out_dir)?;
    let path = session.export_json(&args.out_dir)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

async fn cmd_instruct(mut config: SessionConfig, args: InstructArgs) -> anyhow::Result<()> {
    if let Some(url) = args.service_url {
        config.service_url = url;
    }
    let bundle = read_bundle(&args.in_path)?;
    let images = args.images.unwrap_or_else(|| bundle_dir(&args.in_path));
    let services = SessionServices::http(&config, images)?;
    let canvas: Canvas = config.canvas;
    let mut session =
        TaskSession::from_bundle(&task_name(&args.in_path), config, services, canvas, bundle)?;

    let event = session
        .submit_instruction_at(args.state, &args.text)
        .await
        .context("apply instruction")?;
    eprintln!("{}", serde_json::to_string(&event)?);

    ensure_dir(&args.out_dir)?;
    let path = session.export_json(&args.out_dir)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
