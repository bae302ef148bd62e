use clap::{Parser};
use log::{info, warn};
use graybands::{Event};
use graybands::io::cli::{self, PREVIEW_EDGE};

fn main() -> graybands::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cli::Args::parse();
    let worker = args.job("graybands")?.start()?;
    for event in worker.events() {
        match event {
            Event::Progress(progress) => {
                info!("level {} -> {}", progress.level, progress.artifact.display());
                if let Some(path) = &args.preview {
                    if let Err(e) = progress.preview(PREVIEW_EDGE).save(path) {
                        warn!("could not update preview {}: {}", path.display(), e);
                    }
                }
            },
            Event::Failed(e) => return Err(e),
            Event::Complete {levels} => info!("done: {} levels", levels),
        }
    }
    Ok(())
}
