use anyhow::Result;

pub mod project;
pub mod run;
pub mod steps;
pub mod validate;

pub use project::ProjectSpec;
pub use run::RunCommand;
pub use steps::StepsCommand;
pub use validate::ValidateCommand;

pub async fn show_how_to_get_started() -> Result<()> {
    println!("🏗️  Compliance Wizard - building-permit compliance verification");
    println!();
    println!("To get started:");
    println!("  📋 compliance-wizard steps                       # See the wizard steps");
    println!("  🔎 compliance-wizard validate --project FILE     # Check a project offline");
    println!("  🚀 compliance-wizard run --project FILE          # Run the full verification");
    println!();
    println!("💡 Describe your building in a project file, then validate it before running!");
    Ok(())
}
