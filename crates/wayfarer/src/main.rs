use clap::Parser;
use log::LevelFilter;
use wayfarer_utils::{ok, AnyResult};

fn main() -> AnyResult {
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = wayfarer::Cli::parse_from(wild::args());
    wayfarer::run(cli)?;
    ok()
}
