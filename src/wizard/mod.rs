//! Step navigation: the data-driven definition, the validator gating each step and the
//! controller owning the current position.

pub mod controller;
pub mod definition;
pub mod validator;

pub use controller::{
    Boundary, Direction, NavigationOutcome, StepTransition, WizardController, WizardMode,
};
pub use definition::{DefinitionError, StepDefinition, StepEffect, StepRule, WorkflowDefinition};
pub use validator::{can_advance, validation_error, ValidationErrorKind};
