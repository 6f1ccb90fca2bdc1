//! Seed tree used when both the remote store and the session backup come up
//! empty. Business defaults only; nothing structural depends on these
//! particular categories.

use crate::model::{ModuleDef, NOTES_ID};
use once_cell::sync::Lazy;

static SEED: Lazy<Vec<ModuleDef>> = Lazy::new(|| {
    vec![
        ModuleDef::regular("p-and-gs", "P&Gs", None),
        ModuleDef::header("foundations", "Foundations"),
        ModuleDef::regular("earthworks", "Earthworks", Some("foundations")),
        ModuleDef::regular("concrete", "Concrete", Some("foundations")),
        ModuleDef::regular("steel", "Steel", Some("foundations")),
        ModuleDef::header("structure", "Structure"),
        ModuleDef::regular("brickwork", "Brickwork", Some("structure")),
        ModuleDef::regular("demolish", "Demolish", None),
        ModuleDef::regular("ceilings", "Ceilings", None),
        ModuleDef::regular("paintwork", "Paintwork", None),
    ]
});

pub fn seed() -> Vec<ModuleDef> {
    SEED.clone()
}

/// The reserved notes module in its default shape. Stored fields are merged
/// over this during load, so a renamed notes entry keeps its name.
pub fn reserved_notes() -> ModuleDef {
    ModuleDef {
        requires_client: false,
        ..ModuleDef::regular(NOTES_ID, "Notes", None)
    }
}
