#![windows_subsystem = "windows"]

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use eframe::egui;
use tracing::info;
use tracing_subscriber::EnvFilter;

use phototag::api::TagApi;
use phototag::app::PhotoTagApp;
use phototag::context::{ImageSource, PageContext};

/// Tag people on a photo hosted by a photo-sharing server.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Page context document exported by the server (JSON). A file picker
    /// opens when omitted.
    context: Option<PathBuf>,
    /// Read the photo from a local file instead of the context's source.
    #[arg(long)]
    image: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phototag=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let context_path = match args.context {
        Some(path) => path,
        None => pick_context_file().ok_or_else(|| eyre!("no page context selected"))?,
    };
    let context = PageContext::load(&context_path).wrap_err("could not load the page context")?;
    info!(
        photo_id = context.photo_id,
        users = context.users.len(),
        tags = context.tags.len(),
        "page context loaded"
    );

    let api = TagApi::new(&context.server, &context.csrf_token)?;
    let photo = load_photo(args.image.as_deref(), &context, &context_path, &api)?;
    let width = photo.width() as f32;
    let height = photo.height() as f32;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([
                (width + 280.0).clamp(640.0, 1600.0),
                (height + 60.0).clamp(480.0, 1000.0),
            ])
            .with_title("PhotoTag"),
        ..Default::default()
    };
    eframe::run_native(
        "PhotoTag",
        options,
        Box::new(move |cc| Ok(Box::new(PhotoTagApp::new(cc, context, photo, api)))),
    )
    .map_err(|e| eyre!(e.to_string()))?;
    Ok(())
}

fn pick_context_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Page context", &["json"])
        .pick_file()
}

fn load_photo(
    override_path: Option<&Path>,
    context: &PageContext,
    context_path: &Path,
    api: &TagApi,
) -> Result<image::RgbaImage> {
    let source = match override_path {
        Some(path) => ImageSource::Path(path),
        None => context
            .image_source()
            .ok_or_else(|| eyre!("page context names no image source"))?,
    };
    let image = match source {
        ImageSource::Path(path) => {
            // Relative paths count from the context document.
            let path = if path.is_absolute() {
                path.to_owned()
            } else {
                context_path.parent().unwrap_or(Path::new(".")).join(path)
            };
            image::open(&path)
                .wrap_err_with(|| format!("could not open photo {}", path.display()))?
        }
        ImageSource::Url(url) => {
            let bytes = api
                .fetch_image(url)
                .wrap_err_with(|| format!("could not download photo {url}"))?;
            image::load_from_memory(&bytes).wrap_err("could not decode the downloaded photo")?
        }
    };
    Ok(image.to_rgba8())
}
