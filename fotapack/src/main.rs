use env_logger::Env;
use fotapack::{ConfigOpt, UpdateOpt};
use main_error::MainError;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(about = "Package config blobs and FOTA update images for flashing")]
enum Opt {
    /// Pack a command sequence file to a hex file for flashing
    Config2hex(ConfigOpt),
    /// Create an update image with backup pages and FOTA header
    UpdateImage(UpdateOpt),
}

#[paw::main]
fn main(args: Opt) -> Result<(), MainError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("fotapack=info"))
        .format_timestamp(None)
        .init();

    match args {
        Opt::Config2hex(opt) => fotapack::config2hex(opt)?,
        Opt::UpdateImage(opt) => fotapack::update_image(opt)?,
    };

    Ok(())
}
