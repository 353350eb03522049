use anyhow::Result;
use clap::Parser;

use compliance_wizard::cli::commands::{
    show_how_to_get_started, RunCommand, StepsCommand, ValidateCommand,
};
use compliance_wizard::cli::{Cli, Commands};
use compliance_wizard::config::WizardConfig;
use compliance_wizard::telemetry::init_telemetry;

fn main() -> Result<()> {
    WizardConfig::load_env_file()?;
    let cli = Cli::parse();

    let config = match &cli.config_dir {
        Some(dir) => WizardConfig::load_from_dir(dir)?,
        None => WizardConfig::load()?,
    };
    init_telemetry(&config.observability)?;
    let definition = config.workflow.definition_or_default();

    match cli.command {
        None => tokio::runtime::Runtime::new()?.block_on(async { show_how_to_get_started().await }),
        Some(Commands::Steps) => tokio::runtime::Runtime::new()?.block_on(async {
            StepsCommand::new(definition).execute().await
        }),
        Some(Commands::Validate { project }) => tokio::runtime::Runtime::new()?.block_on(async {
            ValidateCommand::new(project, definition).execute().await
        }),
        Some(Commands::Run {
            project,
            memoria,
            planos,
            answers,
            export,
            report,
            json,
        }) => tokio::runtime::Runtime::new()?.block_on(async {
            RunCommand {
                memoria,
                planos,
                answers,
                export,
                report,
                json,
                ..RunCommand::new(config, project)
            }
            .execute()
            .await
        }),
    }
}
