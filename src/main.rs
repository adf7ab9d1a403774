

#![cfg_attr(feature="clippy", feature(plugin))]
#![cfg_attr(feature="clippy", plugin(clippy))]
#![feature(box_syntax)]

#[macro_use]
extern crate log;
extern crate argparse;
extern crate byteorder;

use std::path::PathBuf;
use std::process::exit;

use argparse::{ArgumentParser, Print, Parse, ParseOption, StoreTrue, StoreOption};

mod logger;
mod error;
mod image;
mod decode;
mod label;
mod jumptable;
mod analysis;
mod render;
mod seeds;

use analysis::AnalysisContext;
use image::Image;
use label::LabelKind;


struct CmdLineArgs {
    rom_file_path: Option<PathBuf>,
    log_file_path: PathBuf,
    base: String,
    entry: Option<String>,
    thumb: bool,
    ram_floor: String,
    seeds_file_path: Option<PathBuf>,
    verbose: bool,
}

impl Default for CmdLineArgs {
    fn default() -> CmdLineArgs {
        CmdLineArgs {
            rom_file_path: None,
            log_file_path: PathBuf::from("./armv5te-disasm.log"),
            base: "0x02000000".to_string(),
            entry: None,
            thumb: false,
            ram_floor: "0x02000000".to_string(),
            seeds_file_path: None,
            verbose: false,
        }
    }
}


fn main() {
    let mut args = CmdLineArgs::default();
    parse_command_line(&mut args);
    configure_logging(&args);

    let rom_file_path = match args.rom_file_path {
        Some(ref p) => p.clone(),
        None => {
            error!("No ROM file given; pass --rom <path>.");
            exit(1);
        }
    };

    let base = match parse_hex(&args.base) {
        Some(b) => b,
        None => { error!("--base is not a valid hex number: {}", args.base); exit(1); }
    };
    let entry = match args.entry.as_ref().map(|s| parse_hex(s)) {
        Some(Some(e)) => e,
        Some(None) => { error!("--entry is not a valid hex number: {}", args.entry.unwrap()); exit(1); }
        None => base,
    };
    let ram_floor = match parse_hex(&args.ram_floor) {
        Some(f) => f,
        None => { error!("--ram-floor is not a valid hex number: {}", args.ram_floor); exit(1); }
    };

    let image = match Image::load_from_file(base, rom_file_path.as_path()) {
        Ok(i) => i,
        Err(e) => { error!("Failed loading the ROM file: {}", e); exit(1); }
    };

    let mut ctx = AnalysisContext::new(image, ram_floor);

    let entry_kind = if args.thumb { LabelKind::ThumbCode } else { LabelKind::ArmCode };
    ctx.seed(entry, entry_kind, Some("EntryPoint".to_string()));

    if let Some(ref p) = args.seeds_file_path {
        for (address, kind, name) in seeds::load(p.as_path()) {
            ctx.seed(address, kind, name);
        }
    }

    ctx.run();

    let (image, mut labels) = ctx.into_parts();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = render::render(&image, &mut labels, render::DEFAULT_DATA_COLUMN_WIDTH, &mut handle) {
        error!("Fatal error while rendering: {}", e);
        exit(1);
    }
}


fn parse_command_line(args: &mut CmdLineArgs) {
    let mut parser = ArgumentParser::new();
    parser.set_description("Disassembles a flat ARMv5TE code image into GNU-assembler source.");
    parser.add_option(&["-V", "--version"],
                      Print(format!("armv5te-disasm v{}", env!("CARGO_PKG_VERSION"))),
                      "Show current version.");
    parser.refer(&mut args.rom_file_path)
          .add_option(&["--rom"], ParseOption, "Path to the flat code image to disassemble.")
          .metavar("PATH");
    parser.refer(&mut args.base)
          .add_option(&["--base"], Parse, "Load address of the image, in hex. (default: 0x02000000)")
          .metavar("HEX");
    parser.refer(&mut args.entry)
          .add_option(&["--entry"], StoreOption, "Entry point address, in hex. Defaults to --base.")
          .metavar("HEX");
    parser.refer(&mut args.thumb)
          .add_option(&["--thumb"], StoreTrue, "Entry point is THUMB code. (default: ARM)");
    parser.refer(&mut args.ram_floor)
          .add_option(&["--ram-floor"], Parse, "Discard discoveries below this address, in hex. (default: 0x02000000)")
          .metavar("HEX");
    parser.refer(&mut args.seeds_file_path)
          .add_option(&["--seeds"], ParseOption, "Path to a label seed file (addr,kind[,name] per line).")
          .metavar("PATH");
    parser.refer(&mut args.verbose)
          .add_option(&["-v","--verbose"], StoreTrue, "Log extra messages and information.");
    parser.refer(&mut args.log_file_path)
          .add_option(&["--log"], Parse, "Custom path for the diagnostic log file.")
          .metavar("PATH");
    parser.parse_args_or_exit();
}


fn configure_logging(args: &CmdLineArgs) {
    let p = args.log_file_path.as_path();
    logger::init_with(&p, args.verbose).unwrap();
    info!("Logging to file `{}`.", p.display());
}


fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(s, 16).ok()
}
