mod categories;
mod difficulty;
mod normalize;
mod run;

pub use run::run;
