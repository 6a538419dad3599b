use anyhow::Result;

use crate::config::Config;
use crate::mapping::NameMap;
use crate::scan;

/// Reports the configured roots, document counts and mapping presence.
pub fn run_status(config: &Config) -> Result<()> {
    println!("layout: {}", config.output.layout.as_str());

    let source_status = if config.source.root.exists() {
        let count = scan::scan_source_tree(config)?.len();
        format!("OK ({} documents)", count)
    } else {
        "MISSING".to_string()
    };
    println!(
        "{:<10} {:<40} {}",
        "source",
        config.source.root.display().to_string(),
        source_status
    );

    let output_status = if config.output.root.exists() { "OK" } else { "ABSENT" };
    println!(
        "{:<10} {:<40} {}",
        "output",
        config.output.root.display().to_string(),
        output_status
    );

    let mapping_file = config.mapping_file();
    let mapping_status = if mapping_file.exists() {
        match NameMap::load(&mapping_file) {
            Ok(map) => format!("PRESENT ({} entries)", map.len()),
            Err(_) => "PRESENT (unreadable)".to_string(),
        }
    } else {
        "ABSENT".to_string()
    };
    println!(
        "{:<10} {:<40} {}",
        "mapping",
        mapping_file.display().to_string(),
        mapping_status
    );

    if let Some(inbox) = &config.watch.inbox {
        let inbox_status = if inbox.exists() { "OK" } else { "ABSENT" };
        println!("{:<10} {:<40} {}", "inbox", inbox.display().to_string(), inbox_status);
    }

    Ok(())
}
