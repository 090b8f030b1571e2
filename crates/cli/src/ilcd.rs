//! `lcigrid ilcd` - dump elementary flows of an ILCD archive as JSON.

use std::path::PathBuf;

use lcigrid_io::ilcd::extract_flows;

use crate::CliError;

pub fn cmd_ilcd(archive: PathBuf, output: Option<PathBuf>) -> Result<(), CliError> {
    let flows = extract_flows(&archive).map_err(CliError::ilcd)?;
    let json = serde_json::to_string_pretty(&flows)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)
                .map_err(|e| CliError::general(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    let uncategorized = flows.iter().filter(|f| f.category.is_none()).count();
    eprintln!("{} flows ({} without category)", flows.len(), uncategorized);
    Ok(())
}
