mod logger;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kdp_async_runtime::{BuildCommand, BuildUpdate, spawn_worker};
use kdp_format::{
    BleedMode, BuildOptions, BuildPlan, JsonSettingsStore, Margins, OutputKind, OutputLocation,
    PageFailurePolicy, PageSequenceStore, PageSize, SettingsStore, TRIM_SIZES, target_pixels,
};
use logger::CliLogger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kdpf", about = "Assemble page images into print-ready DOCX and PDF", version)]
struct Cli {
    /// Settings file holding the folder, page order and layout
    #[arg(long, global = true, default_value = "kdpf.json")]
    settings: PathBuf,

    /// More log output (repeat for debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the source folder and reset the page order
    Init {
        #[arg(short, long)]
        folder: PathBuf,
    },

    /// Inspect or edit the page order
    Pages {
        #[command(subcommand)]
        action: PagesAction,
    },

    /// Change persisted layout and output settings
    Config(ConfigArgs),

    /// List the built-in trim sizes
    Templates,

    /// Show the resolved page geometry
    Geometry,

    /// Build the documents
    Build(BuildArgs),
}

#[derive(Subcommand)]
enum PagesAction {
    /// Print the page order
    List,
    /// Move pages as one block next to a target page
    Move {
        /// Page numbers to move (1-based)
        #[arg(required = true, num_args = 1..)]
        pages: Vec<usize>,
        /// Target page number
        #[arg(long)]
        to: usize,
    },
    /// Remove pages from the order (files stay on disk)
    Delete {
        #[arg(required = true, num_args = 1..)]
        pages: Vec<usize>,
    },
    /// Restore the most recently deleted page
    Undo,
    /// Insert a copy of each page right after it
    Duplicate {
        #[arg(required = true, num_args = 1..)]
        pages: Vec<usize>,
    },
    /// Copy image files into the folder and insert them
    Add {
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Insert before this page number (default: at the end)
        #[arg(long)]
        at: Option<usize>,
    },
    /// Append images added to the folder since the last scan
    Refresh,
}

#[derive(Args)]
struct ConfigArgs {
    /// Output file name without extension
    #[arg(long)]
    name: Option<String>,

    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Trim size template, e.g. "6 x 9 in"
    #[arg(long, conflicts_with_all = ["width", "height"])]
    template: Option<String>,

    /// Page width in inches (clears the template)
    #[arg(long, requires = "height")]
    width: Option<f32>,

    /// Page height in inches (clears the template)
    #[arg(long, requires = "width")]
    height: Option<f32>,

    /// Uniform margin in inches
    #[arg(long)]
    margin: Option<f32>,

    #[arg(long)]
    top: Option<f32>,

    #[arg(long)]
    bottom: Option<f32>,

    /// Inside margin in inches
    #[arg(long)]
    left: Option<f32>,

    /// Outside margin in inches
    #[arg(long)]
    right: Option<f32>,

    #[arg(long)]
    gutter: Option<f32>,

    #[arg(long, value_enum)]
    bleed: Option<BleedArg>,

    /// Write outputs into this directory
    #[arg(long, conflicts_with = "same_folder")]
    output_dir: Option<PathBuf>,

    /// Write outputs next to the source images
    #[arg(long)]
    same_folder: bool,

    /// Keep the DOCX when building a PDF
    #[arg(long)]
    keep_docx: Option<bool>,

    /// Keep the PDF when building a DOCX
    #[arg(long)]
    keep_pdf: Option<bool>,

    #[arg(long, value_enum)]
    on_failure: Option<FailureArg>,
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Trim size template for this build
    #[arg(long)]
    template: Option<String>,

    /// Let images run to the page edge
    #[arg(long, conflicts_with = "no_bleed")]
    bleed: bool,

    /// Honor margins and gutter
    #[arg(long)]
    no_bleed: bool,

    #[arg(long, conflicts_with = "same_folder")]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    same_folder: bool,

    #[arg(long)]
    keep_docx: bool,

    #[arg(long)]
    keep_pdf: bool,

    #[arg(long, value_enum)]
    on_failure: Option<FailureArg>,

    /// Show what would be built without rendering
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Docx,
    Pdf,
}

#[derive(Clone, Copy, ValueEnum)]
enum BleedArg {
    Bleed,
    NoBleed,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailureArg {
    Skip,
    Abort,
}

impl From<KindArg> for OutputKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Docx => Self::Docx,
            KindArg::Pdf => Self::Pdf,
        }
    }
}

impl From<BleedArg> for BleedMode {
    fn from(arg: BleedArg) -> Self {
        match arg {
            BleedArg::Bleed => Self::Bleed,
            BleedArg::NoBleed => Self::NoBleed,
        }
    }
}

impl From<FailureArg> for PageFailurePolicy {
    fn from(arg: FailureArg) -> Self {
        match arg {
            FailureArg::Skip => Self::Skip,
            FailureArg::Abort => Self::Abort,
        }
    }
}

/// Convert 1-based page numbers to indices
fn to_indices(pages: &[usize]) -> Result<Vec<usize>> {
    pages
        .iter()
        .map(|&page| match page {
            0 => bail!("Page numbers start at 1"),
            n => Ok(n - 1),
        })
        .collect()
}

fn print_pages(store: &PageSequenceStore<JsonSettingsStore>) {
    println!("{} ({} pages)", store.folder().display(), store.len());
    for (i, name) in store.pages().iter().enumerate() {
        println!("  {:>4}. {}", i + 1, name);
    }
    if !store.deleted().is_empty() {
        println!("  {} deleted page(s) can be restored with `pages undo`", store.deleted().len());
    }
}

fn pages_command(settings: PathBuf, action: PagesAction) -> Result<()> {
    let mut store = PageSequenceStore::open(JsonSettingsStore::new(settings))
        .context("Run `kdpf init --folder <DIR>` first")?;

    match action {
        PagesAction::List => {}
        PagesAction::Move { pages, to } => {
            let target = to_indices(&[to])?[0];
            if !store.reorder(&to_indices(&pages)?, target)? {
                println!("Target lies inside the moved pages, nothing changed");
            }
        }
        PagesAction::Delete { pages } => {
            let removed = store.delete(&to_indices(&pages)?)?;
            println!("Removed {}", removed.join(", "));
        }
        PagesAction::Undo => match store.undo_delete()? {
            Some(entry) => println!("Restored {} as page {}", entry.filename, entry.index + 1),
            None => println!("Nothing to undo"),
        },
        PagesAction::Duplicate { pages } => {
            store.duplicate(&to_indices(&pages)?)?;
        }
        PagesAction::Add { files, at } => {
            let position = match at {
                Some(page) => to_indices(&[page])?[0],
                None => store.len(),
            };
            let added = store.add_custom(&files, position)?;
            println!("Added {}", added.join(", "));
        }
        PagesAction::Refresh => {
            let found = store.refresh()?;
            println!("Found {found} new page(s)");
        }
    }

    print_pages(&store);
    Ok(())
}

fn config_command(settings_path: PathBuf, args: ConfigArgs) -> Result<()> {
    let mut json = JsonSettingsStore::new(settings_path);
    let mut settings = json.load()?;
    let mut options = settings.build_options();

    if let Some(name) = args.name {
        options.output_name = name;
    }
    if let Some(kind) = args.kind {
        options.output_kind = kind.into();
    }
    if let Some(template) = args.template {
        options.page_size = PageSize::Template(template);
    }
    if let (Some(width_in), Some(height_in)) = (args.width, args.height) {
        options.page_size = PageSize::Custom {
            width_in,
            height_in,
        };
    }
    if let Some(margin) = args.margin {
        options.margins = Margins {
            gutter_in: options.margins.gutter_in,
            ..Margins::uniform(margin)
        };
    }
    let margins = &mut options.margins;
    margins.top_in = args.top.unwrap_or(margins.top_in);
    margins.bottom_in = args.bottom.unwrap_or(margins.bottom_in);
    margins.left_in = args.left.unwrap_or(margins.left_in);
    margins.right_in = args.right.unwrap_or(margins.right_in);
    margins.gutter_in = args.gutter.unwrap_or(margins.gutter_in);
    if let Some(bleed) = args.bleed {
        options.bleed_mode = bleed.into();
    }
    if let Some(dir) = args.output_dir {
        options.location = OutputLocation::Directory(dir);
    }
    if args.same_folder {
        options.location = OutputLocation::SourceFolder;
    }
    options.keep_docx = args.keep_docx.unwrap_or(options.keep_docx);
    options.keep_pdf = args.keep_pdf.unwrap_or(options.keep_pdf);
    if let Some(policy) = args.on_failure {
        options.failure_policy = policy.into();
    }

    options.validate()?;
    settings.apply_build_options(&options);
    json.save(&settings)?;
    println!("Saved settings to {}", json.path().display());
    Ok(())
}

fn geometry_command(settings_path: PathBuf) -> Result<()> {
    let settings = JsonSettingsStore::new(settings_path).load()?;
    let options = settings.build_options();
    let geometry = options.geometry()?;
    geometry.validate()?;

    let (width_px, height_px) = target_pixels(geometry.page_width_in, geometry.page_height_in);
    println!("Mode: {}", geometry.bleed_mode.name());
    println!(
        "Page: {:.3} x {:.3} in ({:.1} x {:.1} pt)",
        geometry.page_width_in,
        geometry.page_height_in,
        geometry.page_width_pt(),
        geometry.page_height_pt()
    );
    println!(
        "Printable: {:.3} x {:.3} in",
        geometry.printable_width_in(),
        geometry.printable_height_in()
    );
    println!("Raster: {width_px} x {height_px} px");
    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("Build plan:");
    println!("  Pages: {}", plan.page_count);
    if !plan.missing_pages.is_empty() {
        println!("  Missing: {}", plan.missing_pages.join(", "));
    }
    println!(
        "  Page: {:.3} x {:.3} in ({})",
        plan.page_width_in,
        plan.page_height_in,
        plan.bleed_mode.name()
    );
    println!(
        "  Printable: {:.3} x {:.3} in",
        plan.printable_width_in, plan.printable_height_in
    );
    println!(
        "  Raster: {} x {} px",
        plan.target_width_px, plan.target_height_px
    );
    for (kind, path) in &plan.outputs {
        println!("  {}: {}", kind.name(), path.display());
    }
}

fn apply_build_args(options: &mut BuildOptions, args: &BuildArgs) {
    if let Some(kind) = args.kind {
        options.output_kind = kind.into();
    }
    if let Some(template) = &args.template {
        options.page_size = PageSize::Template(template.clone());
    }
    if args.bleed {
        options.bleed_mode = BleedMode::Bleed;
    }
    if args.no_bleed {
        options.bleed_mode = BleedMode::NoBleed;
    }
    if let Some(dir) = &args.output_dir {
        options.location = OutputLocation::Directory(dir.clone());
    }
    if args.same_folder {
        options.location = OutputLocation::SourceFolder;
    }
    options.keep_docx |= args.keep_docx;
    options.keep_pdf |= args.keep_pdf;
    if let Some(policy) = args.on_failure {
        options.failure_policy = policy.into();
    }
}

async fn build_command(settings_path: PathBuf, args: BuildArgs) -> Result<()> {
    let json = JsonSettingsStore::new(settings_path);
    let settings = json.load()?;
    let store = PageSequenceStore::open(json)
        .context("Run `kdpf init --folder <DIR>` first")?;

    let mut options = settings.build_options();
    apply_build_args(&mut options, &args);

    let folder = store.folder().to_path_buf();
    let pages = store.pages().to_vec();

    let mut worker = spawn_worker();
    let command = if args.dry_run {
        BuildCommand::Plan {
            folder,
            pages,
            options,
        }
    } else {
        BuildCommand::Build {
            folder,
            pages,
            options,
        }
    };
    worker.send(command)?;

    while let Some(update) = worker.updates.recv().await {
        match update {
            BuildUpdate::StateChanged { state } => log::info!("Build {}", state),
            BuildUpdate::Progress {
                filename,
                current,
                total,
            } => println!("[{current}/{total}] {filename}"),
            BuildUpdate::PageRetry {
                index,
                attempt,
                reason,
            } => println!("  page {} attempt {} failed: {}", index + 1, attempt, reason),
            BuildUpdate::PageSkipped { page } => {
                println!("  skipped page {} ({}): {}", page.index + 1, page.filename, page.reason)
            }
            BuildUpdate::Planned { plan } => {
                print_plan(&plan);
                break;
            }
            BuildUpdate::Complete { report } => {
                println!("{}", report.message());
                for path in [&report.docx_path, &report.pdf_path].into_iter().flatten() {
                    println!("  {}", path.display());
                }
                if !report.skipped.is_empty() {
                    println!("  {} page(s) skipped", report.skipped.len());
                }
                break;
            }
            BuildUpdate::OptionsLoaded { .. } => {}
            BuildUpdate::Rejected { error } => bail!(error),
            BuildUpdate::Error { message } => bail!(message),
        }
    }

    drop(worker.commands);
    worker.task.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::new(CliLogger::level_for(cli.verbose, cli.quiet)).init()?;

    match cli.command {
        Commands::Init { folder } => {
            let folder = folder
                .canonicalize()
                .with_context(|| format!("Cannot open {}", folder.display()))?;
            let json = JsonSettingsStore::new(&cli.settings);
            let mut store = PageSequenceStore::load(&folder, "", "", json)?;
            store.set_folder(&folder)?;
            print_pages(&store);
        }

        Commands::Pages { action } => pages_command(cli.settings, action)?,

        Commands::Config(args) => config_command(cli.settings, args)?,

        Commands::Templates => {
            for trim in TRIM_SIZES {
                println!("{}", trim.template());
            }
        }

        Commands::Geometry => geometry_command(cli.settings)?,

        Commands::Build(args) => build_command(cli.settings, args).await?,
    }

    Ok(())
}
