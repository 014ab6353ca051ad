//! Node mapping normalization: raw export to pruned display tree.

pub mod export;
pub mod normalizer;
pub mod validity;

pub use export::{active_path, load_export, parse_export, save_export};
pub use normalizer::{Normalizer, find_root};
pub use validity::NodeClass;
