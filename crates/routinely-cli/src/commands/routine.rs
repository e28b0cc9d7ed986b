use std::path::PathBuf;

use clap::Subcommand;
use routinely_core::storage::Database;
use routinely_core::{Routine, RoutineSource};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Import a routine definition (TOML, or JSON by .json extension)
    Import {
        /// Path to the definition file
        path: PathBuf,
    },
    /// List stored routines
    List,
    /// Print one routine with its ordered steps
    Show {
        /// Routine ID
        id: String,
    },
    /// Remove a stored routine (completion history is kept)
    Remove {
        /// Routine ID
        id: String,
    },
}

pub fn run(action: RoutineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        RoutineAction::Import { path } => {
            let routine = Routine::from_path(&path)?;
            if routine.steps.is_empty() {
                return Err(format!("routine '{}' has no steps", routine.id).into());
            }
            db.save_routine(&routine)?;
            println!("Routine imported: {} ({} steps)", routine.id, routine.steps.len());
        }
        RoutineAction::List => {
            let routines = db.list_routines()?;
            println!("{}", serde_json::to_string_pretty(&routines)?);
        }
        RoutineAction::Show { id } => {
            let routine = db.load_routine(&id)?;
            println!("{}", serde_json::to_string_pretty(&routine)?);
        }
        RoutineAction::Remove { id } => {
            if !db.delete_routine(&id)? {
                return Err(format!("routine not found: {id}").into());
            }
            println!("Routine removed: {id}");
        }
    }
    Ok(())
}
