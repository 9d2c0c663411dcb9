use std::fmt::Display;
use std::fs;
use std::io::{self, prelude::*};
use std::process;

use clap::ArgEnum;
use env_logger;
use log;

use multimerge::{FieldKey, MergerBuilder, Partial};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let reverse = arg_parser.is_present("reverse");
    let key: Option<&str> = arg_parser.value_of("key");
    let separator: Option<char> = arg_parser
        .value_of("separator")
        .and_then(|separator| separator.chars().next());

    let inputs = arg_parser.values_of("inputs").expect("value is required");
    let mut sources = Vec::new();
    for input in inputs {
        match fs::File::open(input) {
            Ok(file) => sources.push(io::BufReader::new(file).lines()),
            Err(err) => {
                log::error!("input file {} opening error: {}", input, err);
                process::exit(1);
            }
        }
    }
    log::info!("merging {} inputs", sources.len());

    let output_stream: Box<dyn Write> = match arg_parser.value_of("output") {
        Some(output) => match fs::File::create(output) {
            Ok(file) => Box::new(file),
            Err(err) => {
                log::error!("output file creation error: {}", err);
                process::exit(1);
            }
        },
        None => Box::new(io::stdout()),
    };
    let mut output_stream = io::BufWriter::new(output_stream);

    let builder = MergerBuilder::new().with_reverse(reverse);
    match key {
        Some(key) => {
            let merged = builder
                .with_key(FieldKey::new(key, separator))
                .with_comparator(Partial)
                .build(sources);
            write_merged(merged, &mut output_stream);
        }
        None => write_merged(builder.build(sources), &mut output_stream),
    }

    if let Err(err) = output_stream.flush() {
        log::error!("data flushing error: {}", err);
        process::exit(1);
    }
}

fn write_merged<I, E>(merged: I, output_stream: &mut impl Write)
where
    I: Iterator<Item = Result<String, E>>,
    E: Display,
{
    for line in merged {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("merging stream error: {}", err);
                process::exit(1);
            }
        };
        if let Err(err) = output_stream.write_all(format!("{}\n", line).as_bytes()) {
            log::error!("data saving error: {}", err);
            process::exit(1);
        };
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("multimerge")
        .about("merges sorted files into a single sorted output")
        .arg(
            clap::Arg::new("inputs")
                .help("sorted files to be merged")
                .required(true)
                .takes_value(true)
                .multiple_values(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file (standard output if omitted)")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("reverse")
                .short('r')
                .long("reverse")
                .help("inputs are sorted in descending order"),
        )
        .arg(
            clap::Arg::new("key")
                .short('k')
                .long("key")
                .help("field to merge by: N compares the N-th field as text, Nn as a number")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("separator")
                .short('t')
                .long("separator")
                .help("field separator (whitespace if omitted)")
                .takes_value(true)
                .validator(|v| match v.chars().count() {
                    1 => Ok(()),
                    _ => Err(format!("separator must be a single character: '{}'", v)),
                }),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
