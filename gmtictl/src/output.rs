//! Plain-text and JSON printing for catalog commands.

use std::path::Path;

use anyhow::{Result, bail};
use gmti_config::{ScenarioCatalog, catalog};
use gmti_model::{RunConfiguration, ScenarioDescriptor};

pub fn print_catalog(root: &Path, json: bool) -> Result<()> {
    let listing = ScenarioCatalog::new(root).scan(&RunConfiguration::default());
    if listing.missing {
        eprintln!(
            "Scenario directory not found: {}",
            listing.directory.display()
        );
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listing.descriptors)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("No scenarios in {}", listing.directory.display());
        return Ok(());
    }
    println!(
        "{:<24} {:>4} {:>6} {:>7} {:>8} {:>6} {:>20}  description",
        "scenario", "taps", "range", "doppler", "freq", "noise", "seed"
    );
    for descriptor in &listing.descriptors {
        println!("{}", table_row(descriptor));
    }
    Ok(())
}

pub fn print_descriptor(path: &Path, json: bool) -> Result<()> {
    let Some(descriptor) = catalog::parse(path, &RunConfiguration::default())
    else {
        bail!("could not read descriptor {}", path.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }
    println!("name:         {}", descriptor.name());
    println!("scenario:     {}", descriptor.scenario_name());
    println!("taps:         {}", descriptor.taps());
    println!("range_bins:   {}", descriptor.range_bins());
    println!("doppler_bins: {}", descriptor.doppler_bins());
    println!("frequency:    {}", descriptor.frequency());
    println!("noise:        {}", descriptor.noise());
    println!("seed:         {}", seed_label(descriptor.seed()));
    println!(
        "description:  {}",
        descriptor.description().unwrap_or("-")
    );
    Ok(())
}

fn table_row(d: &ScenarioDescriptor) -> String {
    format!(
        "{:<24} {:>4} {:>6} {:>7} {:>8.2} {:>6.3} {:>20}  {}",
        d.name(),
        d.taps(),
        d.range_bins(),
        d.doppler_bins(),
        d.frequency(),
        d.noise(),
        seed_label(d.seed()),
        d.description().unwrap_or("")
    )
}

fn seed_label(seed: u64) -> String {
    match seed {
        0 => "random".to_string(),
        seed => seed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmti_model::DescriptorFields;

    #[test]
    fn unset_seed_reads_as_random() {
        assert_eq!(seed_label(0), "random");
        assert_eq!(seed_label(42), "42");
    }

    #[test]
    fn row_leads_with_file_name() {
        let d = ScenarioDescriptor::new(
            "urban.yaml",
            DescriptorFields {
                taps: 6,
                range_bins: 1024,
                doppler_bins: 256,
                frequency: 12.5,
                noise: 0.03,
                seed: 0,
                description: Some("urban clutter test".into()),
            },
        );
        let row = table_row(&d);
        assert!(row.starts_with("urban.yaml"));
        assert!(row.ends_with("urban clutter test"));
        assert!(row.contains("12.50"));
    }
}
