use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use dialoguer::Input;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use tracing::Level;

use genodraw::commands::MoveMultipleNodesCommand;
use genodraw::serialization::state_to_json;
use genodraw::{
    Editor, EditorConfig, EditorState, Genogram, Point, RelationshipKind, SerializedDocument,
};

const DEFAULT_NEW_GENOGRAM_NAME: &str = "genogram.json";
const DEFAULT_TITLE: &str = "Untitled genogram";
const USAGE: &str = "usage: genodraw <new|info|layout|boundary> [options]\n\
                     run `genodraw <command> --help` for command options";

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
enum OutputDestination {
    Stdout,
    File(PathBuf),
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
struct CommonArgs {
    /// Editor config file (defaults to genodraw.json in the user config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log editing steps to stderr.
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,
}

#[derive(Debug, Parser)]
#[command(name = "genodraw new", about = "Create an empty genogram document.")]
pub struct NewArgs {
    /// Path of the document to create. Use '-' to write to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Document title. Prompted for when omitted on a terminal.
    #[arg(short = 't', long = "title")]
    title: Option<String>,

    #[arg(short = 'a', long = "author")]
    author: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(name = "genodraw info", about = "Summarize a genogram document.")]
pub struct InfoArgs {
    /// Path to the document. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(name = "genodraw layout", about = "Rearrange the nodes of a genogram document.")]
pub struct LayoutArgs {
    /// Path to the document. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Where to write the result. Use '-' for stdout (default).
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Lay every generation out as a centered row.
    #[arg(long = "auto", action = ArgAction::SetTrue)]
    auto: bool,

    /// Push overlapping nodes apart.
    #[arg(long = "resolve-collisions", action = ArgAction::SetTrue)]
    resolve_collisions: bool,

    /// Snap every node to the configured grid.
    #[arg(long = "snap", action = ArgAction::SetTrue)]
    snap: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Parser)]
#[command(
    name = "genodraw boundary",
    about = "Print the outline of every family tree as JSON."
)]
pub struct BoundaryArgs {
    /// Path to the document. Use '-' to read from stdin.
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoundaryReport {
    tree_id: String,
    name: String,
    center: Point,
    path: String,
}

pub fn dispatch() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let rest = || subcommand_args(&args);

    match args.get(1).map(|s| s.as_str()) {
        Some("new") => run_new(NewArgs::parse_from(rest())),
        Some("info") => run_info(InfoArgs::parse_from(rest())),
        Some("layout") => run_layout(LayoutArgs::parse_from(rest())),
        Some("boundary") => run_boundary(BoundaryArgs::parse_from(rest())),
        Some("-h") | Some("--help") => {
            println!("{USAGE}");
            Ok(())
        }
        Some("-V") | Some("--version") => {
            println!("genodraw {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
        None => bail!("no command given\n{USAGE}"),
    }
}

fn subcommand_args(args: &[String]) -> impl Iterator<Item = String> + '_ {
    args.iter().take(1).chain(args.iter().skip(2)).cloned()
}

fn init_logging(common: &CommonArgs) {
    let level = if common.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(common: &CommonArgs) -> Result<EditorConfig> {
    EditorConfig::load(common.config.as_deref()).context("failed to load editor config")
}

fn run_new(cli: NewArgs) -> Result<()> {
    let NewArgs {
        output,
        title,
        author,
        common,
    } = cli;
    init_logging(&common);

    let title = match title {
        Some(title) => title,
        None if io::stdin().is_terminal() => Input::<String>::new()
            .with_prompt("Genogram title")
            .default(DEFAULT_TITLE.to_string())
            .interact_text()
            .context("title prompt was cancelled")?,
        None => DEFAULT_TITLE.to_string(),
    };
    if title.trim().is_empty() {
        bail!("the genogram title must not be empty");
    }

    let mut genogram = Genogram::new(title.trim());
    genogram.metadata.author = author;
    let json = state_to_json(&EditorState::new(genogram))?;

    let dest = match output.as_deref() {
        Some("-") => OutputDestination::Stdout,
        Some(path) => OutputDestination::File(PathBuf::from(path)),
        None => OutputDestination::File(next_free_path(PathBuf::from(
            DEFAULT_NEW_GENOGRAM_NAME,
        ))),
    };
    if let OutputDestination::File(path) = &dest {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create directory '{}'", parent.display())
                })?;
            }
        }
    }

    write_output(dest, json.as_bytes(), common.quiet, "Created genogram")
}

fn run_info(cli: InfoArgs) -> Result<()> {
    init_logging(&cli.common);
    let config = load_config(&cli.common)?;
    let editor = open_editor(cli.input.as_deref(), config)?;
    let genogram = editor.genogram();

    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for relationship in genogram.relationships.values() {
        let label = match relationship.kind() {
            RelationshipKind::Partner => "partner",
            RelationshipKind::Child => "child",
            RelationshipKind::Emotional => "emotional",
        };
        *by_kind.entry(label).or_default() += 1;
    }

    let mut by_gender: BTreeMap<&str, usize> = BTreeMap::new();
    for person in genogram.persons.values() {
        *by_gender.entry(person.gender.as_str()).or_default() += 1;
    }

    let mut report = String::new();
    report.push_str(&format!("title: {}\n", genogram.metadata.title));
    if let Some(author) = &genogram.metadata.author {
        report.push_str(&format!("author: {author}\n"));
    }
    report.push_str(&format!(
        "updated: {}\n",
        genogram.metadata.updated_at.to_rfc3339()
    ));
    report.push_str(&format!("persons: {}", genogram.persons.len()));
    if !by_gender.is_empty() {
        let parts: Vec<String> = by_gender
            .iter()
            .map(|(gender, count)| format!("{gender} {count}"))
            .collect();
        report.push_str(&format!(" ({})", parts.join(", ")));
    }
    report.push('\n');
    report.push_str(&format!("relationships: {}", genogram.relationships.len()));
    if !by_kind.is_empty() {
        let parts: Vec<String> = by_kind
            .iter()
            .map(|(kind, count)| format!("{kind} {count}"))
            .collect();
        report.push_str(&format!(" ({})", parts.join(", ")));
    }
    report.push('\n');
    report.push_str(&format!(
        "text annotations: {}\n",
        genogram.text_annotations.len()
    ));
    report.push_str(&format!("family trees: {}\n", genogram.family_trees.len()));
    if !genogram.is_consistent() {
        report.push_str("warning: some relationships reference missing persons\n");
    }

    write_output(OutputDestination::Stdout, report.as_bytes(), true, "")
}

fn run_layout(cli: LayoutArgs) -> Result<()> {
    let LayoutArgs {
        input,
        output,
        auto,
        resolve_collisions,
        snap,
        common,
    } = cli;
    init_logging(&common);

    if !auto && !resolve_collisions && !snap {
        bail!("nothing to do; pass at least one of --auto, --resolve-collisions or --snap");
    }

    let config = load_config(&common)?;
    let mut editor = open_editor(input.as_deref(), config)?;

    if auto {
        editor.auto_layout();
    }
    if resolve_collisions {
        let mut layout = editor.state().layout.clone();
        let moved = editor.engine().resolve_collisions(&mut layout);
        if !moved.is_empty() {
            let moves = moved
                .into_iter()
                .filter_map(|id| {
                    let position = layout.position_of(&id)?;
                    Some((id, position))
                })
                .collect();
            editor.execute(MoveMultipleNodesCommand::new(moves));
            editor.end_gesture();
        }
    }
    if snap {
        let grid = editor.config().layout.grid_size;
        let moves: BTreeMap<String, Point> = editor
            .state()
            .layout
            .nodes
            .iter()
            .map(|(id, node)| (id.clone(), editor.engine().snap_to_grid(node.position, grid)))
            .filter(|(id, snapped)| editor.state().layout.position_of(id) != Some(*snapped))
            .collect();
        if !moves.is_empty() {
            editor.execute(MoveMultipleNodesCommand::new(moves));
            editor.end_gesture();
        }
    }

    let json = editor.copy_json()?;
    let dest = match output.as_deref() {
        None | Some("-") => OutputDestination::Stdout,
        Some(path) => OutputDestination::File(PathBuf::from(path)),
    };
    if !common.quiet {
        eprintln!(
            "Applied {} layout step(s) to {} person(s)",
            editor.history().undo_depth(),
            editor.genogram().persons.len()
        );
    }
    write_output(dest, json.as_bytes(), common.quiet, "Wrote layout")
}

fn run_boundary(cli: BoundaryArgs) -> Result<()> {
    init_logging(&cli.common);
    let config = load_config(&cli.common)?;
    let editor = open_editor(cli.input.as_deref(), config)?;

    let reports: Vec<BoundaryReport> = editor
        .boundaries()
        .into_iter()
        .map(|(tree_id, boundary)| BoundaryReport {
            name: editor
                .genogram()
                .family_trees
                .get(&tree_id)
                .map(|tree| tree.name.clone())
                .unwrap_or_default(),
            tree_id,
            center: boundary.center,
            path: boundary.path,
        })
        .collect();

    let mut json = serde_json::to_string_pretty(&reports)?;
    json.push('\n');
    write_output(OutputDestination::Stdout, json.as_bytes(), true, "")
}

fn open_editor(input: Option<&str>, config: EditorConfig) -> Result<Editor> {
    let source = parse_input(input)?;
    let raw = load_document(&source)?;
    let document: SerializedDocument = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", describe(&source)))?;
    let state = document
        .into_state(&config.layout)
        .with_context(|| format!("invalid genogram in {}", describe(&source)))?;
    Ok(Editor::with_state(state, config))
}

fn describe(source: &InputSource) -> String {
    match source {
        InputSource::Stdin => "stdin".to_string(),
        InputSource::File(path) => format!("'{}'", path.display()),
    }
}

fn parse_input(input: Option<&str>) -> Result<InputSource> {
    match input {
        Some("-") => Ok(InputSource::Stdin),
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.exists() {
                return Err(anyhow!("input file '{path_str}' does not exist"));
            }
            Ok(InputSource::File(path))
        }
        None => Ok(InputSource::Stdin),
    }
}

fn load_document(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            if buffer.trim().is_empty() {
                Err(anyhow!("no genogram supplied on stdin"))
            } else {
                Ok(buffer)
            }
        }
        InputSource::File(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            if contents.trim().is_empty() {
                Err(anyhow!("input file '{}' was empty", path.display()))
            } else {
                Ok(contents)
            }
        }
    }
}

/// `genogram.json` when free, else the first free `genogram-N.json`.
fn next_free_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "genogram".to_string());
    let extension = path.extension().map(|ext| ext.to_string_lossy().into_owned());
    let sibling = |n: u32| {
        path.with_file_name(match &extension {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        })
    };

    (2..u32::MAX)
        .map(sibling)
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.clone())
}

fn write_output(dest: OutputDestination, bytes: &[u8], quiet: bool, verb: &str) -> Result<()> {
    match dest {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        OutputDestination::File(path) => {
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !quiet {
                println!("{verb} -> {}", path.display());
            }
        }
    }
    Ok(())
}
