use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Arg, ArgAction, Command, value_parser};
use flash_amf::AMF3Decoder;
use flash_amf::amf3::custom_encoder::ExternalRegistry;
use flash_amf::extra::flex::register_flex;

fn main() -> ExitCode {
    env_logger::init();

    let matched = Command::new("AMF3 -> json converter")
        .version("1.0")
        .arg(
            Arg::new("INPUT")
                .help("File containing a single AMF3 value")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Print an indented tree instead of json")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let Some(path) = matched.get_one::<PathBuf>("INPUT") else {
        return ExitCode::FAILURE;
    };

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Couldn't read {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut registry = ExternalRegistry::new();
    register_flex(&mut registry);
    let mut decoder = AMF3Decoder::new(Rc::new(registry));

    let (value, consumed) = match decoder.decode(&data) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("Couldn't decode {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if consumed < data.len() {
        log::warn!("Ignoring {} trailing bytes", data.len() - consumed);
    }

    if matched.get_flag("dump") {
        print!("{}", flash_amf::dump::to_string(&value));
        return ExitCode::SUCCESS;
    }

    match serde_json::to_string(&value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Unable to encode value as json: {}", e);
            ExitCode::FAILURE
        }
    }
}
