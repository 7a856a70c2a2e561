pub use crate::operators::{lookup_path, to_text};
pub use crate::{standard_evaluator, standard_operators};
