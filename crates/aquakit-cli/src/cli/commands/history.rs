use aquakit_core::model::TestType;
use aquakit_core::store::ReadingStore;

use crate::cli::args::HistoryArgs;
use crate::exit_codes;

pub fn run(args: HistoryArgs) -> anyhow::Result<i32> {
    let store = ReadingStore::open(&args.log)?;
    let kinds: Vec<TestType> = match args.test_type {
        Some(kind) => vec![kind.into()],
        None => TestType::ALL.to_vec(),
    };

    let mut printed_any = false;
    for test_type in kinds {
        let readings = store.readings(test_type);
        if readings.is_empty() {
            continue;
        }
        printed_any = true;
        println!("{} readings:", test_type.display_name());
        println!(
            "{:<20} {:>8} {:>12}  {:<6} {}",
            "Time", "Level", "Confidence", "Unit", "Image"
        );
        for r in &readings {
            println!(
                "{:<20} {:>8} {:>11.1}%  {:<6} {}",
                r.timestamp, r.predicted_level, r.confidence, r.unit, r.image_name
            );
        }
        println!();
    }

    if !printed_any {
        println!("No previous readings found.");
    }
    Ok(exit_codes::OK)
}
