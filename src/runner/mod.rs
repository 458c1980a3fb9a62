pub mod discovery;
pub mod executor;
pub mod reporter;

pub use discovery::{discover_tests, TestFile, TEST_SUFFIX};
pub use executor::{run_tests, HarnessError, RunnerOptions, DEFAULT_INTERPRETER};
pub use reporter::{OutputFormat, Palette, TestRunOutput};
