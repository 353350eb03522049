use anyhow::Result;

use crate::wizard::{StepEffect, StepRule, WorkflowDefinition};

pub struct StepsCommand {
    definition: WorkflowDefinition,
}

impl StepsCommand {
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self { definition }
    }

    pub async fn execute(&self) -> Result<()> {
        println!("📋 WIZARD STEPS");
        println!("===============");
        println!();
        for line in self.render() {
            println!("{line}");
        }
        Ok(())
    }

    pub fn render(&self) -> Vec<String> {
        self.definition
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let mut line = format!("{}. {} - {}", index + 1, step.title, rule_text(step.rule));
                if let Some(effect) = step.on_enter {
                    line.push_str(&format!(" [{}]", effect_text(effect)));
                }
                line
            })
            .collect()
    }
}

fn rule_text(rule: StepRule) -> &'static str {
    match rule {
        StepRule::Always => "always complete",
        StepRule::PrimaryUseSelected => "requires a primary use",
        StepRule::SecondaryUsesComplete => "every secondary use needs floors",
        StepRule::DocumentsPresent => "requires memoria and plans",
        StepRule::AnalysisComplete => "requires analysis results",
        StepRule::AmbiguitiesResolved => "requires resolved ambiguities",
    }
}

fn effect_text(effect: StepEffect) -> &'static str {
    match effect {
        StepEffect::RunAnalysis => "runs classification, normative and analysis",
        StepEffect::StartAmbiguitySession => "starts the ambiguity chat",
        StepEffect::GenerateChecklist => "generates the final checklist",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_definition() {
        let lines = StepsCommand::new(WorkflowDefinition::default()).render();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "2. Uso principal - requires a primary use");
        assert!(lines[4].ends_with("[runs classification, normative and analysis]"));
    }
}
