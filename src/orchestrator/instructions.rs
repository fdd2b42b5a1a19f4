//! Operator instructions printed after a run.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Console page listing machine images.
pub const IMAGES_CONSOLE_URL: &str = "https://console.cloud.google.com/compute/images";

/// Tells the operator how to remove images that destroy leaves behind.
///
/// Writes nothing when no Packer groups were destroyed.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_packer_destroy_instructions(out: &mut impl Write, manifests: &[PathBuf]) -> io::Result<()> {
    if manifests.is_empty() {
        return Ok(());
    }
    writeln!(out, "Please browse to the Cloud Console to remove VM images produced by Packer.")?;
    writeln!(out, "If these files are present, the names of images can be read from them:")?;
    writeln!(out)?;
    for manifest in manifests {
        writeln!(out, "{}", manifest.display())?;
    }
    writeln!(out)?;
    writeln!(out, "{IMAGES_CONSOLE_URL}")
}

/// Summarizes where to look after a successful deploy and how to undo it.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_post_deploy_instructions(
    out: &mut impl Write,
    deployment_root: &Path,
    artifacts_dir: &Path,
) -> io::Result<()> {
    writeln!(out, "###############################")?;
    writeln!(out, "Outputs and the expanded plan are stored in:")?;
    writeln!(out, "  {}", artifacts_dir.display())?;
    writeln!(out)?;
    writeln!(out, "To destroy every group in this deployment, run:")?;
    writeln!(out, "  hpcctl destroy {}", deployment_root.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packer_destroy_instructions() {
        let mut out = Vec::new();
        write_packer_destroy_instructions(&mut out, &[]).unwrap();
        assert!(out.is_empty());

        let manifests = [PathBuf::from("/d/image/builder/packer-manifest.json")];
        write_packer_destroy_instructions(&mut out, &manifests).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("/d/image/builder/packer-manifest.json"));
        assert!(text.ends_with(&format!("{IMAGES_CONSOLE_URL}\n")));
    }

    #[test]
    fn test_post_deploy_instructions() {
        let mut out = Vec::new();
        write_post_deploy_instructions(&mut out, Path::new("/d"), Path::new("/d/.hpc/artifacts")).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("/d/.hpc/artifacts"));
        assert!(text.contains("hpcctl destroy /d"));
    }
}
