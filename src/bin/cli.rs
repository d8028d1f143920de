use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use env_logger::Env;
use mpegts_descriptors::constants::{MAX_PRIVATE_SECTION_SIZE, TID_PMT};
use mpegts_descriptors::toolkit::{Command, Options, OutputFormat, run};

#[derive(Parser)]
#[clap(name = "mpegts-desc")]
#[clap(about = "Decode, build and convert MPEG-TS / DVB descriptor loops", long_about = None)]
#[clap(version)]
struct Opt {
    #[clap(subcommand)]
    command: Cmd,

    /// Private data specifier in effect before the first 0x5F descriptor
    #[clap(long, global = true, default_value_t = 0, value_parser = maybe_hex::<u32>)]
    pds: u32,

    /// Table id giving context (0x01 = CAT, 0x02 = PMT)
    #[clap(long, global = true, default_value_t = TID_PMT, value_parser = maybe_hex::<u8>)]
    tid: u8,

    #[clap(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Debug logging (RUST_LOG still wins when set)
    #[clap(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Dump a hex-encoded descriptor loop
    Decode {
        #[clap(required = true)]
        hex: Vec<String>,
    },
    /// Build a loop from CA descriptors given as casid/pid[/hexdata]
    Build {
        #[clap(long = "ca", required = true)]
        ca: Vec<String>,

        #[clap(long, default_value_t = MAX_PRIVATE_SECTION_SIZE, value_parser = maybe_hex::<usize>)]
        max_size: usize,
    },
    /// Serialize an XML <descriptors> document
    FromXml {
        file: PathBuf,

        #[clap(long, default_value_t = MAX_PRIVATE_SECTION_SIZE, value_parser = maybe_hex::<usize>)]
        max_size: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();

    let level = if opt.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let (command, max_size) = match opt.command {
        Cmd::Decode { hex } => (Command::Decode { hex }, MAX_PRIVATE_SECTION_SIZE),
        Cmd::Build { ca, max_size } => (Command::Build { ca }, max_size),
        Cmd::FromXml { file, max_size } => (Command::FromXml { file }, max_size),
    };

    let out = run(Options {
        command,
        pds: opt.pds,
        table_id: opt.tid,
        max_size,
        format: opt.format,
    })?;

    print!("{}", out.text);
    if out.errors > 0 {
        anyhow::bail!("{} invalid input(s)", out.errors);
    }
    Ok(())
}
