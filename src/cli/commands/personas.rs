use anyhow::Result;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, Persona};

pub async fn handle_personas(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    print!(
        "{}",
        formatter.format_personas(&Persona::ALL, config.persona.default)
    );
    Ok(())
}
