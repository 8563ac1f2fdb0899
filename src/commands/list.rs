//! List commands implementation

use mramctl_core::chip::ChipVariant;

use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    let programmers = programmers::available_programmers();
    if programmers.is_empty() {
        println!("{}", programmers::programmer_help());
        return;
    }

    println!("Supported programmers:");
    println!();
    for p in &programmers {
        if p.aliases.is_empty() {
            println!("  {:<10} - {}", p.name, p.description);
        } else {
            println!(
                "  {:<10} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

/// List all supported chip variants
pub fn list_variants() {
    println!("Supported chip variants:");
    println!();
    println!(
        "{:<18} {:>10} {:>9} {:>6} {:>9}",
        "Name", "Size", "Read", "Bits", "Max MHz"
    );
    println!("{}", "-".repeat(56));

    for variant in ChipVariant::ALL {
        let config = variant.config();
        println!(
            "{:<18} {:>10} {:>9} {:>6} {:>9}",
            variant.name(),
            format_size(config.capacity),
            format!("{:?}", config.read_frame).to_lowercase(),
            config.bits_per_word,
            config.max_speed_hz / 1_000_000
        );
        println!("  {}", variant.description());
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
