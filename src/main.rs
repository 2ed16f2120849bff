use std::path::PathBuf;

use apod_gallery::RunOptions;

const HELP: &str = "APOD Gallery — Browse NASA's Astronomy Picture of the Day from the terminal.

  --start YYYY-MM-DD   Prefill the start date
  --end YYYY-MM-DD     Prefill the end date
  --config PATH        Read configuration from PATH
  --demo               Browse built-in sample entries without network access
  --version, -V        Show version and exit
  --help,    -h        Show this help message";

enum Command {
    Run(RunOptions),
    Exit,
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Exit) => return,
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    if let Err(err) = apod_gallery::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Command, String> {
    let mut options = RunOptions::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("APOD Gallery {}", apod_gallery::VERSION);
                return Ok(Command::Exit);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(Command::Exit);
            }
            "--start" => options.start = Some(flag_value(&arg, args.next())?),
            "--end" => options.end = Some(flag_value(&arg, args.next())?),
            "--config" => options.config_file = Some(PathBuf::from(flag_value(&arg, args.next())?)),
            "--demo" => options.demo = true,
            other => return Err(format!("unknown argument {other:?}")),
        }
    }
    Ok(Command::Run(options))
}

fn flag_value(flag: &str, value: Option<String>) -> Result<String, String> {
    value
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| format!("{flag} expects a value"))
}
