//! Budgeted context assembly for Storyloom.
//!
//! Pulls every category from a [`storyloom_store::ContentStore`], cuts each
//! to its share of the budget, and renders one context string in a stable
//! section order.
//!
//! | Section | Category | Placeholder when empty |
//! |---------|----------|------------------------|
//! | Title + Summary | `index` | `Untitled` / no summaries |
//! | Worldview | `worldview` | no worldview notes |
//! | Characters | `character` | no character notes |
//! | Plan | `plan` | no plan |
//! | Chapters | `chapters` | no chapters |
//! | *extras* | declared categories | no notes |

pub mod assembler;

pub use assembler::{
    AssembledContext, AssemblyMetadata, ContextAssembler, Section, SectionFailure, SectionStats,
    UNTITLED,
};
