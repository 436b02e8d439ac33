mod run;
mod sanitize;
mod staging;
#[cfg(test)]
mod tests;

pub use run::run;
