//! `vitrine entries`

use vitrine::build::expand_entries;

use crate::cli::EntriesArgs;
use crate::commands::load_project;
use crate::error::Result;

pub fn execute(args: EntriesArgs) -> Result<()> {
    let config = load_project(&args.project)?;
    config.validate()?;
    let entries = expand_entries(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", entry);
        }
    }
    Ok(())
}
