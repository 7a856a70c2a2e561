//! Tessera Std - Standard Remapper Operators
//!
//! Every operator here is a plain function registered under its remapper name.
//! [`standard_operators`] builds the full table; apps may extend it with their own
//! operators before handing it to an [`Evaluator`].

pub mod operators;
pub mod prelude;

use tessera_core::{Evaluator, OperatorTable};

/// The full standard operator table.
pub fn standard_operators() -> OperatorTable {
    let mut table = OperatorTable::new();
    operators::data::register(&mut table);
    operators::logic::register(&mut table);
    operators::object::register(&mut table);
    operators::array::register(&mut table);
    operators::string::register(&mut table);
    operators::debug::register(&mut table);
    table
}

pub fn standard_evaluator() -> Evaluator {
    Evaluator::new(standard_operators())
}
