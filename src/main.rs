use nih_plug::prelude::*;

use samplekeys_vsti::SampleKeysPlugin;

/// Standalone entry point, hosted by nih-plug's standalone wrapper.
fn main() {
    // Ensure all panics are logged properly before crashing.
    std::panic::set_hook(Box::new(|panic_info| {
        let (filename, line) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line()))
            .unwrap_or(("<unknown>", 0));
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<no message>");
        log::error!("CRASH in {}:{}: {}", filename, line, message);
        eprintln!("CRASH in {}:{}: {}", filename, line, message);
    }));

    nih_export_standalone::<SampleKeysPlugin>();
}
