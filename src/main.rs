use pokemon_battle_predictor::config::AppConfig;
use pokemon_battle_predictor::logger::init_logger;
use pokemon_battle_predictor::matrix::parse_id_list;
use pokemon_battle_predictor::{run, CliOptions, Command};
use std::env;
use std::path::PathBuf;

fn usage() -> ! {
    eprintln!(
        "Usage: pokemon-battle-predictor [serve|predict FIRST SECOND|matrix --ids 1,4,7 [--output matrix.csv]] \
[--config config.json] [--listen ADDR] [--roster pokemon.csv] [--model model.json] [--type-chart chart.json] \
[--outcome-log battles.ndjson] [--log-level info] [--log-file server.log]"
    );
    std::process::exit(1);
}

fn parse_args() -> anyhow::Result<CliOptions> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    // --config is applied first so the remaining flags override the file.
    let mut config = match args.iter().position(|a| a == "--config") {
        Some(idx) => {
            let path = args
                .get(idx + 1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("--config requires a path (e.g. --config server.json)"))?;
            args.drain(idx..idx + 2);
            AppConfig::load(&PathBuf::from(path))?
        }
        None => AppConfig::default(),
    };

    let mut command_name: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut ids: Option<String> = None;
    let mut output_path = PathBuf::from("matrix.csv");

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--listen" => {
                let val = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--listen requires an address (e.g. 0.0.0.0:8000)"))?;
                config.listen = val.parse()?;
            }
            "--roster" => {
                config.roster_path = args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--roster requires a path (e.g. --roster pokemon.csv)")
                })?;
            }
            "--model" => {
                config.model_path = args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--model requires a path (e.g. --model pokemon_model.json)")
                })?;
            }
            "--type-chart" => {
                config.type_chart_path = Some(args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--type-chart requires a path")
                })?);
            }
            "--outcome-log" => {
                config.outcome_log_path = Some(args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--outcome-log requires a path")
                })?);
            }
            "--log-level" => {
                config.log_level = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--log-level requires error|warn|info|debug|trace"))?;
                config.level_filter()?;
            }
            "--log-file" => {
                config.log_file = Some(args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--log-file requires a path")
                })?);
            }
            "--ids" => {
                ids = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--ids requires a list (e.g. --ids 1,4,7)"))?,
                );
            }
            "--output" => {
                output_path = args.next().map(PathBuf::from).ok_or_else(|| {
                    anyhow::anyhow!("--output requires a path (e.g. --output matrix.csv)")
                })?;
            }
            "--help" | "-h" => usage(),
            other if other.starts_with("--") => anyhow::bail!("Unknown argument {other}"),
            other if command_name.is_none() => command_name = Some(other.to_string()),
            other => positional.push(other.to_string()),
        }
    }

    let command = match command_name.as_deref().unwrap_or("serve") {
        "serve" => Command::Serve,
        "predict" => {
            let [first, second] = positional.as_slice() else {
                anyhow::bail!("predict requires two Pokemon ids (e.g. predict 4 7)");
            };
            Command::Predict {
                first: first.parse()?,
                second: second.parse()?,
            }
        }
        "matrix" => {
            let ids = ids.ok_or_else(|| anyhow::anyhow!("matrix requires --ids"))?;
            Command::Matrix {
                ids: parse_id_list(&ids)?,
                output_path,
            }
        }
        other => anyhow::bail!("Unknown command {other} (use serve, predict or matrix)"),
    };

    Ok(CliOptions { config, command })
}

fn main() -> anyhow::Result<()> {
    let opts = parse_args()?;
    init_logger(opts.config.level_filter()?, opts.config.log_file.as_deref())?;
    run(opts)
}
