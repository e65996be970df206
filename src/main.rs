use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use dota_render::{
    CategoryColors, ColorScheme, LabelFont, Rasterizer, RenderOptions, ViewerConfig, load_dataset,
    render, save_image, save_mask,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Colors {
    Random,
    Spectral,
}

impl From<Colors> for ColorScheme {
    fn from(colors: Colors) -> Self {
        match colors {
            Colors::Random => ColorScheme::Random,
            Colors::Spectral => ColorScheme::Spectral,
        }
    }
}

/// Draws DOTA annotations onto their images and exports the annotated images
/// together with binary masks.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to images folder
    #[arg(long, value_name = "PATH", default_value = "./images/")]
    images_path: PathBuf,

    /// Path to annotations folder
    #[arg(long, value_name = "PATH", default_value = "./annotations/")]
    annotations_path: PathBuf,

    /// Path to the folder for saving images with annotations
    /// [default: <images-path>/../saved_images]
    #[arg(long, value_name = "PATH")]
    save_images_path: Option<PathBuf>,

    /// Path to the folder for saving binary masks
    /// [default: <images-path>/../saved_masks]
    #[arg(long, value_name = "PATH")]
    save_masks_path: Option<PathBuf>,

    /// Font used for label text [default: bundled DejaVu Sans]
    #[arg(long, value_name = "PATH")]
    font: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "random")]
    colors: Colors,

    #[arg(long)]
    no_labels: bool,

    #[arg(long)]
    no_outlines: bool,

    /// Only process the image at this position (zero based)
    #[arg(long)]
    index: Option<usize>,

    #[arg(long)]
    skip_images: bool,

    #[arg(long)]
    skip_masks: bool,

    /// Log and skip images that fail instead of stopping
    #[arg(long)]
    keep_going: bool,
}

impl Args {
    fn config(&self) -> ViewerConfig {
        ViewerConfig {
            images_dir: self.images_path.clone(),
            annotations_dir: self.annotations_path.clone(),
            save_images_dir: self.save_images_path.clone().unwrap_or_default(),
            save_masks_dir: self.save_masks_path.clone().unwrap_or_default(),
            font_path: self.font.clone(),
            color_scheme: self.colors.into(),
            render: RenderOptions {
                draw_outlines: !self.no_outlines,
                draw_labels: !self.no_labels,
            },
        }
    }
}

fn run(args: &Args) -> dota_render::Result<usize> {
    let config = args.config();
    let rasterizer = match &config.font_path {
        Some(path) => Rasterizer::with_font(LabelFont::open(path)?),
        None => Rasterizer::new()?,
    };

    let mut colors = CategoryColors::new(config.color_scheme);
    let catalog = load_dataset(&config.images_dir, &config.annotations_dir, &mut colors)?;
    for (category, color) in colors.iter() {
        log::debug!("{category}: {:?}", color.0);
    }

    let indices: Vec<usize> = match args.index {
        Some(index) => vec![index],
        None => (0..catalog.len()).collect(),
    };

    let mut failed = 0;
    for index in indices {
        let result = render(&catalog, index, &mut colors, &rasterizer, config.render).and_then(
            |rendered| {
                log::info!("{}", rendered.metadata);
                let filename = &rendered.metadata.filename;
                if !args.skip_images {
                    save_image(
                        &config.images_dir,
                        &config.save_images_dir,
                        filename,
                        &rendered.frame.image,
                    )?;
                }
                if !args.skip_masks {
                    save_mask(
                        &config.images_dir,
                        &config.save_masks_dir,
                        filename,
                        &rendered.frame.mask,
                    )?;
                }
                Ok(())
            },
        );

        match result {
            Ok(()) => {}
            Err(err) if args.keep_going => {
                log::error!("{}", error_chain(&err));
                failed += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(failed)
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            log::warn!("{failed} image(s) could not be exported");
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("{}", error_chain(&err));
            ExitCode::FAILURE
        }
    }
}
