use anyhow::Context;

use aquakit_core::store::{render_csv, ReadingStore};

use crate::cli::args::ExportArgs;
use crate::exit_codes;

pub fn run(args: ExportArgs) -> anyhow::Result<i32> {
    let store = ReadingStore::open(&args.log)?;
    let readings = store.readings(args.test_type.into());
    let csv = render_csv(readings.iter());
    std::fs::write(&args.out, csv)
        .with_context(|| format!("failed to write export {}", args.out.display()))?;
    println!(
        "Wrote {} reading(s) to {}",
        readings.len(),
        args.out.display()
    );
    Ok(exit_codes::OK)
}
