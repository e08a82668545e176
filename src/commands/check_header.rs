use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info, warn};

use adsb_flights::loader::check_header;

#[derive(Args, Debug)]
pub struct CheckHeaderArgs {
    /// Files whose header line is checked
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

pub fn handle_check_header(args: CheckHeaderArgs) -> Result<()> {
    let mut failed = 0;

    for path in &args.inputs {
        match check_header(path) {
            Ok(schema) => {
                info!(
                    "{}: {} columns [{}]",
                    path.display(),
                    schema.width,
                    schema.column_names().join(", ")
                );
                for (from, to) in &schema.renamed {
                    info!("{}: column {} renamed to {}", path.display(), from, to);
                }
                if !schema.stripped.is_empty() {
                    info!("{}: stripped columns {:?}", path.display(), schema.stripped);
                }
                if let Err(e) = schema.layout() {
                    warn!("{}: {}", path.display(), e);
                }
            }
            Err(e) => {
                failed += 1;
                error!("{}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} headers rejected", failed, args.inputs.len());
    }
    Ok(())
}
