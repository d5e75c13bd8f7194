//! The sample bank compiled into the instrument.

/// Name prefix shared by every bundled resource.
pub const SAMPLE_PREFIX: &str = "sample";

/// Sample rate every bundled resource is recorded at.
pub const SAMPLE_RATE: u32 = 44_100;

/// Bit depth every bundled resource is recorded at.
pub const SAMPLE_BIT_DEPTH: u16 = 16;

/// A named binary resource. The name encodes the target MIDI note.
#[derive(Debug, Clone, Copy)]
pub struct NamedResource {
    pub name: &'static str,
    pub data: &'static [u8],
}

/// Bundled samples, one per pitch.
pub static SAMPLE_BANK: &[NamedResource] = &[
    NamedResource {
        name: "sample_48_wav",
        data: include_bytes!("../../samples/sample_48.wav"),
    },
    NamedResource {
        name: "sample_55_wav",
        data: include_bytes!("../../samples/sample_55.wav"),
    },
    NamedResource {
        name: "sample_60_wav",
        data: include_bytes!("../../samples/sample_60.wav"),
    },
    NamedResource {
        name: "sample_64_wav",
        data: include_bytes!("../../samples/sample_64.wav"),
    },
    NamedResource {
        name: "sample_67_wav",
        data: include_bytes!("../../samples/sample_67.wav"),
    },
    NamedResource {
        name: "sample_72_wav",
        data: include_bytes!("../../samples/sample_72.wav"),
    },
];
