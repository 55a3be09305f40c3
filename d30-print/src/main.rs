use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use clap_num::maybe_hex;
use clap_verbosity::Verbosity;
use d30::{FileBackend, MonoBitmap, Options, Printer, Protocol};
use image::{
    imageops::{self, FilterType},
    DynamicImage, GrayImage, ImageFormat, Luma,
};
use qrcode::QrCode;
use std::{
    io::Read,
    path::{Path, PathBuf},
    time::Duration,
};

/// Print an image or a QR code on a Phomemo D30 label printer.
#[derive(Parser)]
struct Cli {
    /// Path to the image to be printed, `-` reads from stdin.
    #[arg(required_unless_present = "qr", conflicts_with = "qr")]
    file: Option<PathBuf>,

    /// Print a QR code with this content instead of an image.
    #[arg(long)]
    qr: Option<String>,

    /// Path to the RFCOMM device.
    #[arg(short, long, env = "D30_DEVICE", default_value = d30::DEFAULT_DEVICE)]
    device: PathBuf,

    /// Seconds to wait for the Bluetooth connection.
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Write the raw command stream into this file instead of printing.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of copies.
    #[arg(short, long, default_value_t = 1)]
    num: usize,

    /// Show the image instead of printing.
    #[arg(short, long)]
    show: bool,

    /// Invert the printed image.
    #[arg(short, long)]
    invert: bool,

    /// Dither grayscale images instead of cutting them at the threshold.
    #[arg(long)]
    dither: bool,

    /// Rotate the image by 0, 90, 180, or 270 degrees.
    /// Labels are usually designed landscape and printed with 270.
    #[arg(short, long, default_value_t = 0)]
    rotate: usize,

    /// Pixels darker than this are printed.
    #[arg(short = 'T', long, default_value_t = 0x80, value_parser = maybe_hex::<u8>)]
    threshold: u8,

    /// Maximum number of rows per packet, at most the 320 rows the band header declares.
    #[arg(
        long,
        default_value_t = Protocol::D30_V1.band_height as u16,
        value_parser = clap::value_parser!(u16).range(1..=Protocol::D30_V1.band_height as i64),
    )]
    band_height: u16,

    #[command(flatten)]
    verbose: Verbosity,
}

const LABEL_WIDTH: u32 = 96;
const LABEL_LENGTH: u32 = 320;

/// QR symbol, 88x88 dots, centered on a 96x320 white label.
fn qr(data: &str) -> Result<DynamicImage> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| anyhow!("cannot encode QR code: {e:?}"))?;
    let symbol = code.render::<Luma<u8>>().quiet_zone(false).build();
    let symbol = imageops::resize(&symbol, 88, 88, FilterType::Nearest);

    let mut canvas = GrayImage::from_pixel(LABEL_WIDTH, LABEL_LENGTH, Luma([0xff]));
    let x = (LABEL_WIDTH - 88) / 2;
    let y = (LABEL_LENGTH - 88) / 2;
    imageops::overlay(&mut canvas, &symbol, x.into(), y.into());
    Ok(DynamicImage::ImageLuma8(canvas))
}

/// Scale and threshold `img`, then pad it with blank rows so every band is as
/// long as the band header says.
fn prepare(img: &DynamicImage, protocol: &Protocol, opts: &Options) -> Result<MonoBitmap> {
    let mut bitmap = d30::preprocess(img, protocol.width, opts).context("cannot prepare image")?;
    bitmap.pad_to_multiple(protocol.band_height);
    Ok(bitmap)
}

fn picture(path: &Path) -> Result<DynamicImage> {
    let data = if path == Path::new("-") {
        let mut data = Vec::new();
        std::io::stdin().read_to_end(&mut data)?;
        data
    } else {
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?
    };

    log::trace!("parsing...");
    Ok(d30::decode(&data)?)
}

fn rotate(img: DynamicImage, deg: usize) -> Result<DynamicImage> {
    Ok(match deg {
        0 => img,
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => bail!("invalid rotation: {deg}"),
    })
}

fn preview(bitmap: &MonoBitmap) -> GrayImage {
    GrayImage::from_fn(bitmap.width() as u32, bitmap.height() as u32, |x, y| {
        match bitmap.get(x as usize, y as usize) {
            Some(true) => Luma([0x00]),
            _ => Luma([0xff]),
        }
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::builder()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let img = match (&cli.qr, &cli.file) {
        (Some(data), _) => qr(data)?,
        (None, Some(path)) => picture(path)?,
        (None, None) => bail!("nothing to print"),
    };

    log::trace!("rotating...");
    let img = rotate(img, cli.rotate)?;

    let protocol = Protocol::D30_V1.with_band_height(cli.band_height.into());
    let opts = Options {
        threshold: cli.threshold,
        invert: cli.invert,
        dither: cli.dither,
    };
    let bitmap = prepare(&img, &protocol, &opts)?;
    log::debug!("prepared {bitmap:?}");

    if cli.show {
        let temppath = std::env::temp_dir().join("d30-preview.png");
        preview(&bitmap).save_with_format(&temppath, ImageFormat::Png)?;
        open::that(&temppath)?;
        return Ok(());
    }

    let mut printer = if let Some(path) = &cli.output {
        Printer::with_backend(protocol, FileBackend::create(path)?)
    } else {
        log::trace!("connecting to {}...", cli.device.display());
        Printer::open(protocol, &cli.device, Duration::from_secs(cli.timeout)).with_context(|| {
            format!(
                "unable to connect to {}: try running 'rfcomm connect 1 <MAC>'",
                cli.device.display()
            )
        })?
    };

    log::trace!("initializing printer...");
    printer.initialize()?;

    for i in 0..cli.num {
        log::trace!("printing copy {i}...");
        let bands = printer.print(&bitmap)?;
        log::debug!("copy {i} sent as {bands} bands");
    }

    printer.close();
    Ok(())
}
