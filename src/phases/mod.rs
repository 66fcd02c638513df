pub mod build;
pub mod filter;
pub mod resolve;
pub mod run;

pub use build::BuildPhase;
pub use filter::FilterPhase;
pub use resolve::ProgramRegistry;
pub use run::RunPhase;
