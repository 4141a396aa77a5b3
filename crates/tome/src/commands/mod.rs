//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod check;

pub(crate) use build::BuildArgs;
pub(crate) use check::CheckArgs;

use crate::output::Output;

/// Warn about documents no toctree reaches.
fn report_unreachable(output: &Output, unreachable: &[String]) {
    for doc in unreachable {
        output.warning(&format!(
            "Warning: document \"{doc}\" isn't included in any toctree"
        ));
    }
}
