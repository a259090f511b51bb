use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use iofuzz_rs::harness::{self, HarnessConfig};
use iofuzz_rs::ports::{parse_port_spec, parse_uint};

fn usage(exe: &str) {
    eprintln!("Usage: {exe} [options]");
    eprintln!();
    eprintln!("  -d, --debug            per-worker diagnostics on stderr");
    eprintln!("  -h, --help             this text");
    eprintln!("      --num-threads N    worker count (default 1)");
    eprintln!("  -o, --output PATH      append the log to PATH instead of stdout");
    eprintln!("  -p, --ports SPEC       port list, e.g. 0x70,0x80-0x82 (default: full space)");
    eprintln!("  -q, --quiet, --silent  skip the warning banner and countdown");
    eprintln!("      --stack-size N     per-worker stack size in bytes");
    eprintln!("      --state N          initial RNG seed (0x hex / 0 octal / decimal)");
    eprintln!("  -v, --verbose          startup summary on stderr");
    eprintln!("      --version          name and version");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let exe = args
        .first()
        .map(String::as_str)
        .unwrap_or(env!("CARGO_PKG_NAME"));

    let mut config = HarnessConfig::default();
    let mut ports_spec: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        // Accept both `--flag value` and `--flag=value`.
        let (flag, mut inline_value) = match args[i].split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => {
                (flag.to_owned(), Some(value.to_owned()))
            }
            _ => (args[i].clone(), None),
        };
        let mut take_value = |i: &mut usize| -> String {
            if let Some(value) = inline_value.take() {
                return value;
            }
            *i += 1;
            match args.get(*i) {
                Some(value) => value.clone(),
                None => {
                    eprintln!("{exe}: missing value for {flag}");
                    process::exit(2);
                }
            }
        };

        match flag.as_str() {
            "-d" | "--debug" => config.debug = true,
            "-h" | "--help" => {
                usage(exe);
                process::exit(1);
            }
            "--num-threads" => {
                config.num_threads = parse_numeric(exe, &flag, &take_value(&mut i)) as usize;
            }
            "-o" | "--output" => config.output = Some(PathBuf::from(take_value(&mut i))),
            "-p" | "--ports" => ports_spec = Some(take_value(&mut i)),
            "-q" | "--quiet" | "--silent" => config.quiet = true,
            "--stack-size" => {
                config.stack_size = Some(parse_numeric(exe, &flag, &take_value(&mut i)) as usize);
            }
            "--state" => config.state = parse_numeric(exe, &flag, &take_value(&mut i)),
            "-v" | "--verbose" => config.verbose = true,
            "--version" => {
                eprintln!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                process::exit(1);
            }
            _ => {
                eprintln!("{exe}: unknown option: {flag}");
                usage(exe);
                process::exit(2);
            }
        }
        i += 1;
    }

    if config.num_threads == 0 {
        eprintln!("{exe}: --num-threads must be at least 1");
        process::exit(2);
    }

    if let Some(spec) = ports_spec {
        match parse_port_spec(&spec) {
            Ok(ports) if ports.is_empty() => {}
            Ok(ports) => config.ports = Some(Arc::new(ports)),
            Err(err) => {
                eprintln!("{exe}: {err}");
                process::exit(1);
            }
        }
    }

    if let Err(err) = harness::run(config) {
        eprintln!("{exe}: {err}");
        process::exit(1);
    }
}

fn parse_numeric(exe: &str, flag: &str, text: &str) -> u64 {
    match parse_uint(text) {
        Some(value) => value,
        None => {
            eprintln!("{exe}: invalid number for {flag}: {text:?}");
            process::exit(2);
        }
    }
}
