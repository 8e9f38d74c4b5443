use crate::cli::parse_date_arg;
use crate::error::{FactorError, Result};
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path, Settings};

pub fn show() -> Result<()> {
    let settings = load_settings();
    let json = serde_json::to_string_pretty(&settings)
        .map_err(|e| FactorError::Settings(e.to_string()))?;
    println!("# {}", settings_path().display());
    println!("{json}");
    Ok(())
}

/// Apply the given changes to `settings`. A reference date of `today`
/// (or empty) clears the pin.
pub fn apply(
    settings: &mut Settings,
    data_dir: Option<String>,
    invoices_file: Option<String>,
    rates_file: Option<String>,
    reference_date: Option<String>,
) -> Result<()> {
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(file) = invoices_file {
        settings.invoices_file = file;
    }
    if let Some(file) = rates_file {
        settings.rates_file = file;
    }
    if let Some(raw) = reference_date {
        let raw = raw.trim();
        settings.reference_date = if raw.is_empty() || raw.eq_ignore_ascii_case("today") {
            None
        } else {
            Some(parse_date_arg(raw)?.format("%Y-%m-%d").to_string())
        };
    }
    Ok(())
}

pub fn set(
    data_dir: Option<String>,
    invoices_file: Option<String>,
    rates_file: Option<String>,
    reference_date: Option<String>,
) -> Result<()> {
    if data_dir.is_none() && invoices_file.is_none() && rates_file.is_none() && reference_date.is_none() {
        return Err(FactorError::Settings(
            "nothing to set (see `factor config set --help`)".to_string(),
        ));
    }
    let mut settings = load_settings();
    apply(&mut settings, data_dir, invoices_file, rates_file, reference_date)?;
    save_settings(&settings)?;
    println!("Settings saved to {}", settings_path().display());
    Ok(())
}
