//! optdump - parse the command line and print what the parser saw, as JSON.
//!
//! Useful for trying out option syntax (`-vvv`, `--verb`, `-n0x1f`,
//! `--define=a=1`, `--rest a b c -v`) without writing a program.

use std::any::Any;
use std::panic;

use anyhow::Context;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use trieopt::descriptor::action;
use trieopt::{
    Callback, DescribeOptions, EnumType, OptionDescriptor, OptionParser, ParserSettings, Shape,
    Value, ValueCell, ValueType,
};

fn install_broken_pipe_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let is_broken = <dyn Any>::downcast_ref::<&str>(payload)
            .is_some_and(|s| s.contains("Broken pipe"))
            || <dyn Any>::downcast_ref::<String>(payload)
                .is_some_and(|s| s.contains("Broken pipe"));

        if is_broken {
            // Quietly exit when downstream closes the pipe (e.g. piping to `head`).
            std::process::exit(0);
        }

        default_hook(info);
    }));
}

/// Options whose values live outside the parser.
#[derive(Default)]
struct DumpOptions {
    rest: ValueCell,
}

impl DescribeOptions for DumpOptions {
    fn describe_options(&self) -> Vec<OptionDescriptor> {
        let rest = self.rest.clone();
        vec![
            OptionDescriptor::new(["-v", "--verbose"])
                .action(action::COUNT)
                .help("increase verbosity (repeatable)"),
            OptionDescriptor::new(["-q", "--quiet"])
                .value_type(ValueType::Bool)
                .help("quiet mode"),
            OptionDescriptor::new(["-o", "--output"])
                .value_type(ValueType::Path)
                .metavar("FILE")
                .help("write output to FILE"),
            OptionDescriptor::new(["-m", "--mode"])
                .choices(["fast", "slow", "auto"])
                .slot(ValueCell::with_value("auto"))
                .help("processing mode [default: %default]"),
            OptionDescriptor::new(["-D", "--define"])
                .action(action::APPEND)
                .shape(Shape::List)
                .metavar("KEY=VALUE")
                .help("define a variable (repeatable)"),
            OptionDescriptor::new(["-t", "--tag"])
                .action(action::APPEND)
                .shape(Shape::Set)
                .help("add a tag; duplicates are ignored"),
            OptionDescriptor::new(["--point"])
                .action(action::APPEND)
                .nargs(2)
                .value_type(ValueType::F64)
                .shape(Shape::List)
                .metavar("X Y")
                .help("add a point (two numbers)"),
            OptionDescriptor::new(["-n", "--count"])
                .value_type(ValueType::I64)
                .help("item count; 0x, 0b and leading-0 octal accepted"),
            OptionDescriptor::new(["--level"])
                .value_type(ValueType::Level)
                .help("a tracing level (error, warn, info, debug, trace)"),
            OptionDescriptor::new(["--color"])
                .value_type(ValueType::Enum(EnumType::new(
                    "ColorMode",
                    ["auto", "always", "never"],
                )))
                .metavar("WHEN")
                .help("auto, always or never"),
            OptionDescriptor::new(["--rest"])
                .callback(Callback::full(move |name, _args, _ctx, state| {
                    let taken = state.take_while_not_option();
                    debug!(option = name, count = taken.len(), "collected trailing arguments");
                    let mut items = match rest.get() {
                        Some(Value::List(items)) => items,
                        _ => Vec::new(),
                    };
                    items.extend(taken.into_iter().map(Value::Str));
                    rest.set(Value::List(items));
                    Ok(())
                }))
                .help("collect the following arguments up to the next option"),
        ]
    }
}

fn settings() -> ParserSettings {
    ParserSettings::new()
        .with_prog("optdump")
        .with_usage("%prog [options] [ARGS...]")
        .with_description("Parse the command line and print the result as JSON.")
        .with_version(format!("%prog {}", env!("CARGO_PKG_VERSION")))
}

fn main() -> anyhow::Result<()> {
    install_broken_pipe_handler();

    // Logs go to stderr; stdout carries the JSON report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let options = DumpOptions::default();
    let mut parser = OptionParser::new(settings());
    parser
        .add_options(&options)
        .context("failed to declare options")?;

    let values = match parser.parse(std::env::args().skip(1)) {
        Ok(values) => values,
        Err(err) => {
            if let Some(text) = err.exit_message() {
                println!("{}", text.trim_end());
            } else {
                eprintln!("{}: error: {err}", parser.prog());
                eprintln!("Usage: {}", parser.usage_string());
            }
            std::process::exit(err.exit_code());
        }
    };

    let mut report = values.to_json();
    if let Some(object) = report.as_object_mut() {
        object.insert("rest".to_string(), json!(options.rest.get()));
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
