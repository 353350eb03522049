// Property-Based Testing for the project draft and wizard navigation
// Random edit sequences must never break the draft invariants or step bounds

use compliance_wizard::draft::{DocumentKind, FileRef, FloorLevel, ProjectDraft, RangeKind, UseType};
use compliance_wizard::wizard::{Direction, NavigationOutcome, WizardController, WizardMode, WorkflowDefinition};
use proptest::prelude::*;
use proptest_derive::Arbitrary;

fn use_type_strategy() -> impl Strategy<Value = UseType> {
    proptest::sample::select(UseType::ALL.to_vec())
}

fn file_strategy() -> impl Strategy<Value = FileRef> {
    (
        "[a-z]{1,8}",
        prop_oneof![Just("pdf"), Just("docx"), Just("png")],
        1u64..=10_000_000,
    )
        .prop_map(|(stem, ext, size)| {
            let mime = match ext {
                "pdf" => "application/pdf",
                "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                _ => "image/png",
            };
            FileRef::new(format!("{stem}.{ext}"), size, mime)
        })
}

#[derive(Debug, Clone, Arbitrary)]
enum DraftOp {
    BuildingType(bool),
    PrimaryUse(#[proptest(strategy = "proptest::option::of(use_type_strategy())")] Option<UseType>),
    SecondaryEnabled(bool),
    AddUse(#[proptest(strategy = "use_type_strategy()")] UseType),
    RemoveUse(#[proptest(strategy = "use_type_strategy()")] UseType),
    AddRange {
        #[proptest(strategy = "use_type_strategy()")]
        use_type: UseType,
        basement: bool,
        #[proptest(strategy = "-120i32..=120")]
        from: i32,
        #[proptest(strategy = "-120i32..=120")]
        to: i32,
    },
    AddGround(#[proptest(strategy = "use_type_strategy()")] UseType),
    Documents {
        memoria: bool,
        #[proptest(strategy = "proptest::collection::vec(file_strategy(), 0..5)")]
        files: Vec<FileRef>,
    },
    RemoveDocument {
        memoria: bool,
        #[proptest(strategy = "0usize..4")]
        index: usize,
    },
}

fn apply(draft: &mut ProjectDraft, op: &DraftOp) {
    // Rejected edits are fine; the invariants must hold either way
    let _ = match op.clone() {
        DraftOp::BuildingType(existing) => {
            draft.set_building_type(existing);
            Ok(())
        }
        DraftOp::PrimaryUse(use_type) => {
            draft.set_primary_use(use_type);
            Ok(())
        }
        DraftOp::SecondaryEnabled(enabled) => {
            draft.set_secondary_uses_enabled(enabled);
            Ok(())
        }
        DraftOp::AddUse(use_type) => draft.add_secondary_use(use_type),
        DraftOp::RemoveUse(use_type) => draft.remove_secondary_use(use_type),
        DraftOp::AddRange {
            use_type,
            basement,
            from,
            to,
        } => {
            let kind = if basement {
                RangeKind::Basement
            } else {
                RangeKind::AboveGround
            };
            draft.add_floor_range(use_type, kind, from, to)
        }
        DraftOp::AddGround(use_type) => draft.add_special_floor(use_type, FloorLevel::Ground),
        DraftOp::Documents { memoria, files } => {
            draft.set_documents(kind(memoria), files).map(|_| ())
        }
        DraftOp::RemoveDocument { memoria, index } => {
            draft.remove_document(kind(memoria), index).map(|_| ())
        }
    };
}

fn kind(memoria: bool) -> DocumentKind {
    if memoria {
        DocumentKind::Memoria
    } else {
        DocumentKind::Planos
    }
}

proptest! {
    #[test]
    fn prop_draft_invariants_survive_any_edit_sequence(
        ops in proptest::collection::vec(any::<DraftOp>(), 0..40)
    ) {
        let mut draft = ProjectDraft::new();
        for op in &ops {
            apply(&mut draft, op);
            prop_assert!(draft.invariants_hold(), "invariants broken after {:?}", op);
            prop_assert!(draft.documents().memoria.len() <= 1);
            if !draft.has_secondary_uses() {
                prop_assert!(draft.secondary_uses().is_empty());
            }
            for secondary in draft.secondary_uses() {
                for floor in &secondary.floors {
                    if let Some(n) = floor.number() {
                        prop_assert!(n != 0 && (-100..=100).contains(&n));
                    }
                }
            }
        }
    }

    #[test]
    fn prop_floor_wire_values_round_trip(n in -100i32..=100) {
        if let Some(level) = FloorLevel::numbered(n) {
            prop_assert_eq!(FloorLevel::from_wire_value(level.wire_value()), Some(level));
        } else {
            prop_assert_eq!(n, 0);
        }
    }

    #[test]
    fn prop_navigation_stays_in_bounds(moves in proptest::collection::vec(any::<bool>(), 0..60)) {
        let mut wizard = WizardController::new(WorkflowDefinition::default());
        // Only the layout is under test; a draft with nothing entered blocks at step 2
        let draft = ProjectDraft::new();
        for forward in moves {
            let direction = if forward { Direction::Forward } else { Direction::Back };
            let before = wizard.mode();
            match wizard.change_step(direction, &draft) {
                Ok(NavigationOutcome::Moved(transition)) => {
                    prop_assert_eq!(WizardMode::Step(transition.from), before);
                    prop_assert_eq!(transition.to.abs_diff(transition.from), 1);
                }
                Ok(NavigationOutcome::Unchanged(_)) | Err(_) => {
                    prop_assert_eq!(wizard.mode(), before);
                }
            }
            match wizard.mode() {
                WizardMode::Step(n) => prop_assert!((1..=2).contains(&n)),
                WizardMode::Overview => prop_assert!(false, "never entered overview"),
            }
        }
    }
}
