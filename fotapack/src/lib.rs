mod config_blob;
mod error;
pub mod fs;
pub mod image;
pub mod layout;
pub mod update;

pub use config_blob::ConfigBlob;
pub use error::Error;
pub use image::{Format, FotaHeader, LineEnding, SparseImage};
pub use layout::{LayoutOverrides, UpdateLayout};
pub use update::{package, PackagedImage};

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub struct ConfigOpt {
    /// Config text file, `#` starts a comment line
    #[structopt(short = "f", long, parse(from_os_str))]
    pub config_file: PathBuf,
    /// Intel HEX file to write
    #[structopt(short = "o", long, parse(from_os_str))]
    pub output_file: PathBuf,
    /// Flash address of the config region
    #[structopt(short = "a", long, parse(try_from_str = parse_int::parse))]
    pub address: u32,
    /// Size of the config region, the config is padded with 0xff or truncated to it
    #[structopt(short = "l", long, parse(try_from_str = parse_int::parse))]
    pub length: usize,
}

#[derive(StructOpt, Debug)]
pub struct UpdateOpt {
    /// Application image in Intel HEX format
    #[structopt(
        short = "I",
        long,
        parse(from_os_str),
        default_value = "build/zephyr/app_moved_test_update.hex"
    )]
    pub input: PathBuf,
    /// Output file
    #[structopt(short = "O", long, parse(from_os_str))]
    pub output: PathBuf,
    /// Output format of the update image: hex or bin
    #[structopt(long, default_value = "hex")]
    pub format: Format,
    /// TOML file with an [update_layout] table, command line options take precedence
    #[structopt(long, parse(from_os_str))]
    pub layout: Option<PathBuf>,
    #[structopt(flatten)]
    pub overrides: LayoutOverrides,
    /// Generate a flat .bin for gateway FOTA, only --input and --output are used
    #[structopt(long)]
    pub gateway: bool,
}

impl UpdateOpt {
    /// Embedded defaults, then the layout file, then command line options.
    pub fn update_layout(&self) -> Result<UpdateLayout, Error> {
        let mut layout = UpdateLayout::embedded_default()?;
        if let Some(path) = &self.layout {
            log::debug!("Loading layout from {}", path.display());
            layout = layout.with_overrides(&LayoutOverrides::from_toml(&fs::read(path)?)?);
        }
        Ok(layout.with_overrides(&self.overrides))
    }
}

/// Pack a config text file into an Intel HEX file.
pub fn config2hex(opt: ConfigOpt) -> Result<(), Error> {
    let text = fs::read(&opt.config_file)?;
    let blob = ConfigBlob::from_utf8(text, opt.length)?;
    if blob.is_truncated() {
        log::warn!(
            "Config is {} bytes, truncated to {} bytes",
            blob.content_len(),
            blob.len()
        );
    }

    let mut image = SparseImage::new();
    blob.write_to(&mut image, opt.address)?;
    let hex = image.to_ihex(LineEnding::CrLf)?;
    fs::write_atomic(&opt.output_file, hex.as_bytes())?;

    log::info!(
        "Config ({} of {} bytes used) written to {} at {:#x}",
        blob.content_len().min(blob.len()),
        blob.len(),
        opt.output_file.display(),
        opt.address
    );
    Ok(())
}

/// Create an update image with backup pages and FOTA header, or a flat
/// binary in gateway mode.
pub fn update_image(opt: UpdateOpt) -> Result<(), Error> {
    let app = SparseImage::load_ihex(&fs::read(&opt.input)?)?;
    log::info!(
        "Loaded {} ({} bytes in {} segments)",
        opt.input.display(),
        app.len(),
        app.segments().len()
    );
    for segment in app.segments() {
        log::trace!("Segment addr: {:#x} size: {}", segment.addr, segment.size());
    }

    if opt.gateway {
        let bin = app.to_bin();
        fs::write_atomic(&opt.output, &bin)?;
        log::info!(
            "Gateway image ({} bytes) written to {}",
            bin.len(),
            opt.output.display()
        );
        return Ok(());
    }

    let layout = opt.update_layout()?;
    log::debug!("Layout: {:x?}", layout);
    let packaged = package(app, &layout)?;
    let output = packaged.image.render(opt.format, LineEnding::Native)?;
    fs::write_atomic(&opt.output, &output)?;

    log::info!(
        "Update image ({} pages, crc {:#010x}) written to {}",
        packaged.total_pages,
        packaged.header.crc,
        opt.output.display()
    );
    Ok(())
}
