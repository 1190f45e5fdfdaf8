//! TOML export of injection layouts
//!
//! ```toml
//! [layout]
//! device = "R4iSDHC family"
//! legacy = false
//! firm_size = "0x00001000"
//! firm_max = "0x001E9200"
//!
//! [[region]]
//! name = "Writing ROM <=> NOR map"
//! offset = "0x00000040"
//! length = "0x00000100"
//! source = "map"
//! source_offset = "0x00000000"
//! encoded = false
//! ```

use std::format;
use std::string::String;
use std::vec::Vec;

use super::{InjectionLayout, Payload};

#[derive(Debug, serde::Serialize)]
struct TomlLayoutFile<'a> {
    layout: TomlLayoutMeta<'a>,
    region: Vec<TomlRegion<'a>>,
}

#[derive(Debug, serde::Serialize)]
struct TomlLayoutMeta<'a> {
    device: &'a str,
    legacy: bool,
    firm_size: String,
    firm_max: String,
}

#[derive(Debug, serde::Serialize)]
struct TomlRegion<'a> {
    name: &'a str,
    offset: String,
    length: String,
    source: &'static str,
    source_offset: String,
    encoded: bool,
}

fn hex(value: usize) -> String {
    format!("0x{:08X}", value)
}

impl InjectionLayout {
    /// Render the layout as TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let region = self
            .regions()
            .iter()
            .map(|r| {
                let (source, source_offset) = match r.payload {
                    Payload::MapTable => ("map", 0),
                    Payload::Key { start, .. } => ("key", start),
                    Payload::Firm { start, .. } => ("firm", start),
                };
                TomlRegion {
                    name: r.name,
                    offset: hex(r.offset as usize),
                    length: hex(r.len()),
                    source,
                    source_offset: hex(source_offset),
                    encoded: r.encoded,
                }
            })
            .collect();

        let file = TomlLayoutFile {
            layout: TomlLayoutMeta {
                device: self.device,
                legacy: self.legacy,
                firm_size: hex(self.firm_len),
                firm_max: hex(self.firm_max),
            },
            region,
        };
        toml::to_string(&file)
    }
}
