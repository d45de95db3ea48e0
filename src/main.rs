use log::{debug, LevelFilter};
use structopt::StructOpt;

use lidtrain::cli;
use lidtrain::error;
use lidtrain::pipelines::index::{IndexOptions, IndexPipeline};
use lidtrain::pipelines::train::{TrainOptions, TrainPipeline};
use lidtrain::pipelines::Pipeline;

fn main() -> Result<(), error::Error> {
    // set default log level to info
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_env("RUST_LOG");
    builder.init();

    let opt = cli::LidTrain::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::LidTrain::Index(i) => {
            IndexPipeline::new(IndexOptions::from_cli(i)).run()?;
        }
        cli::LidTrain::Train(t) => {
            TrainPipeline::new(TrainOptions::from_cli(t)).run()?;
        }
    };
    Ok(())
}
