use clap::Args;
use routinely_core::storage::Database;

#[derive(Args)]
pub struct HistoryArgs {
    /// Only show completions of this routine
    #[arg(long)]
    routine: Option<String>,
    /// Maximum number of records, newest first
    #[arg(long, default_value = "20")]
    limit: usize,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let records = db.completions(args.routine.as_deref(), args.limit)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
