//! List-versions command

use crate::display;
use crate::error::Result;
use crate::util::OperatorArgs;

pub fn run(args: &OperatorArgs) -> Result<()> {
    let manifests = args.manifest_sets()?;
    display::print_results(&rawfile_kube::list_versions(&manifests))
}
