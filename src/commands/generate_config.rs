use crate::config_file::ConfigFile;
use crate::error::{FsrcnnError, Result};
use crate::utils::file_io;
use clap::ArgMatches;
use std::path::Path;
use tracing::info;

pub fn generate_config(app_m: &ArgMatches) -> Result<()> {
    let output_path = app_m.value_of("OUTPUT_FILE").unwrap_or("fsrcnn.toml");
    let format = app_m.value_of("FORMAT").unwrap_or("toml");

    if Path::new(output_path).exists() && !app_m.is_present("FORCE") {
        return Err(FsrcnnError::InvalidParameter(format!(
            "File {} already exists. Use --force to overwrite",
            output_path
        )));
    }

    if app_m.is_present("EXAMPLE") {
        if format != "toml" {
            return Err(FsrcnnError::InvalidParameter(
                "Example configuration with comments is only available in TOML format".to_string(),
            ));
        }
        file_io::write_file_atomic(output_path, ConfigFile::create_example_toml().as_bytes())?;
        info!("Generated example configuration file with comments: {}", output_path);
    } else {
        let config = ConfigFile::default();
        match format {
            "toml" => config.to_toml_file(output_path)?,
            "json" => config.to_json_file(output_path)?,
            _ => {
                return Err(FsrcnnError::InvalidParameter(format!(
                    "Unknown format: {}. Use 'toml' or 'json'",
                    format
                )))
            }
        }
        info!("Generated {} configuration file: {}", format.to_uppercase(), output_path);
    }

    info!("Use it with: fsrcnn train --config {}", output_path);
    Ok(())
}
