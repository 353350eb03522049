use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "compliance-wizard")]
#[command(about = "Guided building-permit compliance verification")]
#[command(long_about = "Compliance Wizard walks a building project through classification, \
                       normative application, document analysis, ambiguity resolution and the \
                       final checklist against the verification backend. Start with \
                       'compliance-wizard validate --project project.toml'.")]
pub struct Cli {
    /// Directory holding compliance-wizard.toml / .compliance-wizard-rc
    #[arg(long, global = true, help = "Directory to load configuration files from")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the configured wizard steps and what each one requires
    Steps,
    /// Check a project file offline, step by step, without calling the backend
    Validate {
        /// Project description (TOML or JSON)
        #[arg(long, help = "Path to the project file (.toml or .json)")]
        project: PathBuf,
    },
    /// Run the whole verification against the configured backend
    Run {
        /// Project description (TOML or JSON)
        #[arg(long, help = "Path to the project file (.toml or .json)")]
        project: PathBuf,
        /// Memoria PDF, overriding the one named in the project file
        #[arg(long, help = "Memoria PDF (overrides the project file)")]
        memoria: Option<PathBuf>,
        /// Plan PDFs, added to the ones named in the project file
        #[arg(long = "plano", help = "Plan PDF; repeat for several plans")]
        planos: Vec<PathBuf>,
        /// Answers for the ambiguity session, one per line
        #[arg(long, help = "File with one answer per line (reads stdin when omitted)")]
        answers: Option<PathBuf>,
        /// Write the downloadable checklist export here
        #[arg(long, help = "Write the checklist export to this file")]
        export: Option<PathBuf>,
        /// Write the final report JSON here
        #[arg(long, help = "Generate the final report and write it to this file")]
        report: Option<PathBuf>,
        /// Print the results summary as JSON
        #[arg(long, help = "Print the results summary as JSON instead of text")]
        json: bool,
    },
}
