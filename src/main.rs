use clap::Parser;
use subwiz::cli::{Cli, Commands};
use subwiz::commands::{self, RunPlan};
use subwiz::config::Config;

fn main() -> anyhow::Result<()> {
    // Initialize logging (stderr, so it stays out of the wizard's own output)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("subwiz=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Shell);

    let load_config = || -> anyhow::Result<Config> {
        let mut config = Config::load(cli.config.as_deref())?;
        config.apply_overrides(cli.server.as_deref());
        Ok(config)
    };

    match command {
        Commands::Shell => {
            let config = load_config()?;
            tracing::info!("Starting subwiz against {}", config.server.base_url);
            let controller = commands::console_controller(&config)?;
            let stdin = std::io::stdin();
            subwiz::shell::run_shell(
                &controller,
                &config.transcription.options(),
                config.download.format,
                stdin.lock(),
                std::io::stdout(),
            )
        }
        Commands::Run {
            file,
            model,
            language,
            task,
            formats,
            output,
            keep_session,
        } => {
            let mut config = load_config()?;
            if let Some(dir) = output {
                config.download.directory = dir;
            }
            let mut options = config.transcription.options();
            if let Some(model) = model {
                options.model = model;
            }
            if let Some(language) = language {
                options.language = (language != "auto" && !language.is_empty()).then_some(language);
            }
            if let Some(task) = task {
                options.task = task;
            }
            let plan = RunPlan {
                file,
                options,
                formats: if formats.is_empty() {
                    vec![config.download.format]
                } else {
                    formats
                },
                clear_session: !keep_session,
            };

            let controller = commands::console_controller(&config)?;
            let saved = commands::run_pipeline(&controller, &plan)?;
            for path in saved {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Options => commands::show_options(),
        Commands::InitConfig { path, force } => {
            let target = path.as_deref().or(cli.config.as_deref());
            commands::init_config(target, force).map(|_| ())
        }
    }
}
