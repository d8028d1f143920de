// src/lib.rs
//! Descriptor codec for MPEG transport streams and DVB service information.
//!
//! Binary descriptors and descriptor loops live in [`descriptor`]; typed
//! descriptors convert between binary, XML and command-line forms and are
//! dispatched through a [`descriptor::Registry`].

pub mod toolkit {
    use std::path::PathBuf;

    use crate::constants::{MAX_PRIVATE_SECTION_SIZE, PDS_NULL, TID_PMT};

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
    pub enum OutputFormat {
        /// Indented human-readable dump
        #[default]
        Text,
        /// `<descriptors>` document
        Xml,
        /// JSON summary
        Json,
    }

    #[derive(Debug, Clone)]
    pub enum Command {
        /// Hex-encoded descriptor loop to inspect
        Decode { hex: Vec<String> },
        /// CA descriptors given as `casid/pid[/private-data]`
        Build { ca: Vec<String> },
        /// XML file with a `<descriptors>` root
        FromXml { file: PathBuf },
    }

    #[derive(Debug, Clone)]
    pub struct Options {
        pub command: Command,
        /// PDS in effect before the first private_data_specifier_descriptor
        pub pds: u32,
        /// Table the descriptors are interpreted in
        pub table_id: u8,
        /// Capacity available for the serialized loop
        pub max_size: usize,
        pub format: OutputFormat,
    }

    impl Options {
        pub fn new(command: Command) -> Self {
            Self {
                command,
                pds: PDS_NULL,
                table_id: TID_PMT,
                max_size: MAX_PRIVATE_SECTION_SIZE,
                format: OutputFormat::default(),
            }
        }
    }

    /// What a command produced. Invalid inputs are skipped, counted in
    /// `errors` and logged; the rest still makes it into `text`.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Output {
        pub text: String,
        pub errors: usize,
    }

    pub fn run(opts: Options) -> anyhow::Result<Output> {
        crate::core::run(opts)
    }
}

pub mod constants;
pub mod descriptor;
pub mod display;
pub mod error;
pub mod report;
pub mod si_cache;
pub mod util;
pub mod xml;

mod core;

pub use descriptor::{
    CaDescriptor, Descriptor, DescriptorList, PrivateDataSpecifierDescriptor, Registry, TypedDescriptor,
};
pub use display::TablesDisplay;
pub use error::{DescriptorError, ErrorKind, Result};
pub use si_cache::DescriptorCache;
