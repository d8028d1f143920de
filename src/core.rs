// src/core.rs
//! Command implementations behind `toolkit::run`.

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};

use crate::descriptor::{CaDescriptor, DescriptorList, Registry};
use crate::display::TablesDisplay;
use crate::report::{CollectReport, LogReport, Report, json};
use crate::toolkit::{Command, Options, Output, OutputFormat};
use crate::util;
use crate::xml::Element;

const XML_ROOT: &str = "descriptors";

pub fn run(opts: Options) -> anyhow::Result<Output> {
    let registry = Registry::with_defaults();
    let report = CollectReport::new();

    let text = match &opts.command {
        Command::Decode { hex } => {
            let list = decode_hex(hex, opts.pds, &report)?;
            render(&registry, &list, &opts)?
        }
        Command::Build { ca } => {
            let mut list = DescriptorList::with_pds(opts.pds);
            CaDescriptor::add_from_command_line(&mut list, ca, &report);
            emit(&registry, &list, &opts)?
        }
        Command::FromXml { file } => {
            let list = load_xml(&registry, file, opts.pds, &report)?;
            emit(&registry, &list, &opts)?
        }
    };

    // everything collected goes to the log as well
    for (severity, msg) in report.messages() {
        LogReport.log(severity, &msg);
    }
    Ok(Output {
        text,
        errors: report.error_count(),
    })
}

/// Hex arguments are concatenated, so a loop may be split across several.
fn decode_hex(args: &[String], pds: u32, report: &dyn Report) -> anyhow::Result<DescriptorList> {
    let joined = args.concat();
    let Some(data) = util::hex_decode(&joined) else {
        bail!("invalid hexadecimal input: {joined}");
    };
    let mut list = DescriptorList::with_pds(pds);
    if let Err(e) = list.deserialize(data) {
        report.error(&format!("descriptor loop: {e}, kept {} descriptor(s)", list.len()));
    }
    Ok(list)
}

fn load_xml(registry: &Registry, file: &Path, pds: u32, report: &dyn Report) -> anyhow::Result<DescriptorList> {
    let text = fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;
    let root = Element::parse(&text).with_context(|| format!("invalid XML in {}", file.display()))?;
    if !root.has_name(XML_ROOT) {
        bail!("{}: expected <{XML_ROOT}>, found <{}>", file.display(), root.name());
    }
    let mut list = DescriptorList::with_pds(pds);
    registry.list_from_xml(&root, &mut list, report);
    Ok(list)
}

/// Representation of a list in the requested format.
fn render(registry: &Registry, list: &DescriptorList, opts: &Options) -> anyhow::Result<String> {
    let text = match opts.format {
        OutputFormat::Text => {
            let mut disp = TablesDisplay::new();
            disp.display_list(registry, list, 0, opts.table_id);
            disp.into_string()
        }
        OutputFormat::Xml => {
            let mut xml = registry.list_to_xml(list, opts.table_id).to_xml_string()?;
            xml.push('\n');
            xml
        }
        OutputFormat::Json => {
            let mut json = json::to_json(registry, list, opts.table_id)?;
            json.push('\n');
            json
        }
    };
    Ok(text)
}

/// Binary form of a built list in text mode, otherwise same as `render`.
fn emit(registry: &Registry, list: &DescriptorList, opts: &Options) -> anyhow::Result<String> {
    if opts.format != OutputFormat::Text {
        return render(registry, list, opts);
    }
    let out = list.serialize(opts.max_size);
    if !out.is_complete(list) {
        log::warn!(
            "only {} of {} descriptors fit in {} bytes",
            out.count,
            list.len(),
            opts.max_size
        );
    }
    Ok(format!(
        "{}\n{}/{} descriptors, {} bytes\n",
        util::hex_encode(&out.bytes),
        out.count,
        list.len(),
        out.size()
    ))
}
