use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use scenetrace::{
    ImageFetcher, MediaUpload, MemeComposition, RankedMatches, RenderOptions, SearchClient,
    SearchMatch, SearchRequestState, SearchSession, format_timestamp, partition_by_confidence,
};

#[derive(Parser, Debug)]
#[command(name = "scenetrace", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search trace.moe for the anime scene in an image or video.
    Search(SearchArgs),
    /// Caption a scene image and export it as a meme PNG.
    Meme(MemeArgs),
}

#[derive(Parser, Debug)]
struct SearchArgs {
    /// Image or video URL to search by.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    url: Option<String>,

    /// Local image or video file to search by.
    #[arg(long, required_unless_present = "url")]
    file: Option<PathBuf>,

    /// Declared media type for --file when it cannot be inferred from the
    /// extension.
    #[arg(long)]
    content_type: Option<String>,
}

#[derive(Parser, Debug)]
struct MemeArgs {
    /// Base image: a URL or a local file path.
    #[arg(long)]
    image: String,

    /// Top caption text.
    #[arg(long, default_value = "")]
    top: String,

    /// Bottom caption text.
    #[arg(long, default_value = "")]
    bottom: String,

    /// Output PNG path.
    #[arg(long, default_value = scenetrace::MEME_FILE_NAME)]
    out: PathBuf,

    /// Resolution multiplier applied to the base image.
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Font file for the captions (defaults to the system Impact stack).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Search(args) => cmd_search(args).await,
        Command::Meme(args) => cmd_meme(args).await,
    }
}

async fn cmd_search(args: SearchArgs) -> anyhow::Result<()> {
    let mut session = SearchSession::new(SearchClient::new()?);

    if let Some(url) = &args.url {
        session.search_by_url(url).await?;
    } else if let Some(path) = &args.file {
        let upload = upload_from_path(path, args.content_type.as_deref())?;
        session.search_by_file(upload).await?;
    }

    match session.state() {
        SearchRequestState::Succeeded(matches) => {
            print_matches(matches.clone());
            Ok(())
        }
        SearchRequestState::Failed(message) => anyhow::bail!("search failed: {message}"),
        SearchRequestState::Idle | SearchRequestState::Loading => {
            anyhow::bail!("search did not complete")
        }
    }
}

fn upload_from_path(path: &Path, override_type: Option<&str>) -> anyhow::Result<MediaUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read media file '{}'", path.display()))?;
    let content_type = match override_type {
        Some(t) => t.to_string(),
        None => scenetrace::search::media_type_for_path(path).ok_or_else(|| {
            anyhow::anyhow!(
                "cannot infer a media type for '{}'; pass --content-type",
                path.display()
            )
        })?,
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(MediaUpload {
        file_name,
        content_type,
        bytes,
    })
}

fn print_matches(matches: Vec<SearchMatch>) {
    match partition_by_confidence(matches) {
        RankedMatches::Empty => println!("No matching scenes found."),
        RankedMatches::Grouped { high, low } => {
            for m in &high {
                print_match(m);
            }
            if !low.is_empty() {
                println!();
                println!("Potentially similar scenes (lower confidence):");
                for m in &low {
                    print_match(m);
                }
            }
        }
    }
}

fn print_match(m: &SearchMatch) {
    println!();
    println!("{} ({:.2}% match)", m.display_title(), m.similarity_percent());
    if let Some(info) = m.anilist.info() {
        if let Some(english) = &info.title.english {
            println!("  english:   {english}");
        }
        if let Some(native) = &info.title.native {
            println!("  native:    {native}");
        }
    }
    match &m.episode {
        Some(ep) => println!("  episode:   {ep}"),
        None => println!("  episode:   N/A"),
    }
    println!(
        "  timestamp: {} - {}",
        format_timestamp(m.from),
        format_timestamp(m.to)
    );
    if m.is_adult() {
        println!("  warning:   adult content");
    }
    println!("  anilist:   {}", m.anilist.url());
    println!("  file:      {}", m.filename);
    println!("  image:     {}", m.image);
    println!("  video:     {}", m.video);
}

async fn cmd_meme(args: MemeArgs) -> anyhow::Result<()> {
    let bytes = if args.image.starts_with("http://") || args.image.starts_with("https://") {
        ImageFetcher::new()?.fetch(&args.image).await?
    } else {
        std::fs::read(&args.image).with_context(|| format!("read base image '{}'", args.image))?
    };

    let mut composition = MemeComposition::from_image_bytes(&bytes)?;
    composition.set_captions(args.top, args.bottom);

    let font_bytes = match &args.font {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("read font file '{}'", path.display()))?,
        ),
        None => None,
    };
    let options = RenderOptions {
        scale: args.scale,
        font_bytes,
        ..RenderOptions::default()
    };

    let png = composition.render(&options)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
