use anyhow::Result;

use pds_registry_core::format::{FormatRegistry, Strategy};

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Pds => "pds",
        Strategy::Wyriwyg => "wyriwyg",
        Strategy::Pds4 { json: true } => "pds4 (json)",
        Strategy::Pds4 { json: false } => "pds4 (xml)",
    }
}

pub fn list_formats() -> Result<()> {
    let formats = FormatRegistry::with_defaults();

    println!("{:<40} {:<12} FIELDS", "MEDIA TYPE", "STRATEGY");
    for mime in formats.supported() {
        if let Some(descriptor) = formats.lookup(&mime) {
            let fields = if descriptor.max_needs.is_empty() {
                "any".to_string()
            } else {
                descriptor.max_needs.join(", ")
            };
            println!(
                "{:<40} {:<12} {}",
                mime,
                strategy_label(descriptor.strategy),
                fields
            );
        }
    }

    Ok(())
}
