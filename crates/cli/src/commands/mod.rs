pub mod audit;
pub mod cards;
pub mod create;
pub mod project;
pub mod run;
pub mod util;

pub use audit::*;
pub use cards::*;
pub use create::*;
pub use project::*;
pub use run::*;
pub use util::*;
