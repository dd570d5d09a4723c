//! Descriptor discovery against real directories.

use std::fs;

use gmti_config::{ScenarioCatalog, catalog};
use gmti_model::RunConfiguration;
use tempfile::TempDir;

fn workspace_with(files: &[(&str, &str)]) -> anyhow::Result<TempDir> {
    let root = tempfile::tempdir()?;
    let configs = root.path().join("simulator").join("configs");
    fs::create_dir_all(&configs)?;
    for (name, contents) in files {
        fs::write(configs.join(name), contents)?;
    }
    Ok(root)
}

#[test]
fn lists_yaml_descriptors_sorted_by_name() -> anyhow::Result<()> {
    let root = workspace_with(&[
        (
            "urban.yaml",
            "taps: 6\nrange_bins: 1024\nfrequency: 12.5\n\
             description: urban clutter test",
        ),
        ("alpha.yaml", "taps: 2\n"),
        ("notes.txt", "taps: 30\n"),
        ("empty.yaml", "  \n"),
    ])?;

    let listing =
        ScenarioCatalog::new(root.path()).scan(&RunConfiguration::default());
    assert!(!listing.missing);

    let names: Vec<_> = listing.descriptors.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["alpha.yaml", "urban.yaml"]);

    let urban = listing.find("urban").expect("urban listed");
    assert_eq!(urban.taps(), 6);
    assert_eq!(urban.range_bins(), 1024);
    assert_eq!(urban.doppler_bins(), 256);
    assert_eq!(urban.frequency(), 12.5);
    assert_eq!(urban.noise(), 0.03);
    assert_eq!(urban.seed(), 0);
    assert_eq!(urban.description(), Some("urban clutter test"));
    assert_eq!(urban.scenario_name(), "urban");
    Ok(())
}

#[test]
fn missing_directory_is_reported_not_fatal() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let catalog = ScenarioCatalog::new(root.path());
    let listing = catalog.scan(&RunConfiguration::default());

    assert!(listing.missing);
    assert!(listing.is_empty());
    assert_eq!(listing.directory, root.path().join("simulator/configs"));
    Ok(())
}

#[test]
fn subdirectories_named_like_descriptors_are_skipped() -> anyhow::Result<()> {
    let root = workspace_with(&[("real.yaml", "noise: 0.4\n")])?;
    fs::create_dir_all(root.path().join("simulator/configs/nested.yaml"))?;

    let listing =
        ScenarioCatalog::new(root.path()).scan(&RunConfiguration::default());
    assert_eq!(listing.descriptors.len(), 1);
    assert_eq!(listing.descriptors[0].noise(), 0.4);
    Ok(())
}

#[test]
fn every_field_subset_falls_back_independently() {
    let lines = [
        ("taps", "taps: 7"),
        ("range_bins", "range_bins: 512"),
        ("doppler_bins", "doppler_bins: 128"),
        ("frequency", "frequency: 50.25"),
        ("noise", "noise: 0.1"),
        ("seed", "seed: 42"),
    ];
    let defaults = RunConfiguration::default();

    for mask in 0u32..(1 << lines.len()) {
        let mut picked: Vec<_> = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, l)| *l)
            .collect();
        picked.reverse();
        let text = picked
            .iter()
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n");
        let has = |field: &str| picked.iter().any(|(name, _)| *name == field);

        let d = catalog::parse_str(
            &text,
            std::path::Path::new("mask.yaml"),
            &defaults,
        );
        assert_eq!(d.taps(), if has("taps") { 7 } else { 4 }, "mask {mask}");
        assert_eq!(
            d.range_bins(),
            if has("range_bins") { 512 } else { 2048 },
            "mask {mask}"
        );
        assert_eq!(
            d.doppler_bins(),
            if has("doppler_bins") { 128 } else { 256 },
            "mask {mask}"
        );
        assert_eq!(
            d.frequency(),
            if has("frequency") { 50.25 } else { 32.0 },
            "mask {mask}"
        );
        assert_eq!(
            d.noise(),
            if has("noise") { 0.1 } else { 0.03 },
            "mask {mask}"
        );
        assert_eq!(d.seed(), if has("seed") { 42 } else { 0 }, "mask {mask}");
    }
}

#[test]
fn parse_of_unreadable_path_is_absent() {
    let defaults = RunConfiguration::default();
    assert!(
        catalog::parse(std::path::Path::new("/nonexistent/x.yaml"), &defaults)
            .is_none()
    );
}
