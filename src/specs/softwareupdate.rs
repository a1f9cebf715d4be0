//! macOS `softwareupdate`.

use crate::generator::{Generator, PostProcess};
use crate::installers::SizeUnits;
use crate::spec_model::{ArgSpec, CompletionSpec, OptionSet, OptionSpec};
use std::sync::Arc;

pub const LIST_FULL_INSTALLERS: &str = "softwareupdate --list-full-installers";

/// Options shared by `--download` and `--install`
fn common_options() -> OptionSet {
    Arc::from(vec![
        OptionSpec::new(
            ["--all", "-a"],
            "All updates that are applicable to your system, including those non-recommended ones",
        ),
        OptionSpec::new(["--recommended", "-r"], "All updates that are recommended for your system"),
        OptionSpec::new("--os-only", "Only macOS updates"),
        OptionSpec::new("--safari-only", "Only safari updates"),
        OptionSpec::new("--stdinpass", "Password to authenticate as an owner. Apple Silicon only"),
        OptionSpec::new("--user", "Local username to authenticate as an owner. Apple Silicon only"),
    ])
}

fn label_arg() -> ArgSpec {
    ArgSpec::new("label").description("Specific updates").variadic()
}

pub fn full_installer_generator(size_units: SizeUnits) -> Generator {
    Generator::new(LIST_FULL_INSTALLERS, PostProcess::FullInstallers { size_units })
}

pub fn spec(size_units: SizeUnits) -> CompletionSpec {
    let common = common_options();

    CompletionSpec::new("softwareupdate", "System software update tool for MacOS")
        .subcommand(CompletionSpec::new(["--list", "-l"], "List all appropriate update labels"))
        .subcommand(
            CompletionSpec::new(["--download", "-d"], "Download Only")
                .options(common.clone())
                .arg(label_arg()),
        )
        .subcommand(
            CompletionSpec::new(["--install", "-i"], "Install")
                .options(common)
                .arg(label_arg()),
        )
        .subcommand(CompletionSpec::new(
            "--list-full-installers",
            "List the available macOS Installers",
        ))
        .subcommand(
            CompletionSpec::new(
                "--fetch-full-installer",
                "Install the latest recommended macOS Installer",
            )
            .options(Arc::from(vec![OptionSpec::new(
                "--full-installer-version",
                "The version of macOS to install",
            )
            .arg(ArgSpec::new("macOS version").generator(full_installer_generator(size_units)))])),
        )
        .subcommand(CompletionSpec::new("--install-rosetta", "Install Rosetta 2"))
        .subcommand(CompletionSpec::new(
            "--background",
            "Trigger a background scan and update operation",
        ))
        .subcommand(CompletionSpec::new(
            "--dump-state",
            "Log the internal state of the SU daemon to /var/log/install.log",
        ))
        .subcommand(CompletionSpec::new(
            "--evaluate-products",
            "Evaluate a list of product keys specified by the --products option",
        ))
        .subcommand(CompletionSpec::new(
            "--history",
            "Show the install history.  By default, only displays updates installed by softwareupdate",
        ))
        .subcommand(CompletionSpec::new(
            "--all",
            "Include all processes in history (including App installs)",
        ))
        .options(Arc::from(vec![
            OptionSpec::new(
                "--no-scan",
                "Do not scan when listing or installing updates (use available updates previously scanned)",
            ),
            OptionSpec::new(
                "--product-types",
                "Limit a scan to a particular product type only - ignoring all others",
            )
            .arg(ArgSpec::new("<type>").suggestion("macOS").suggestion("Safari")),
            OptionSpec::new(
                "--products",
                "A comma-separated (no spaces) list of product keys to operate on",
            ),
            OptionSpec::new("--force", "Force an operation to complete"),
            OptionSpec::new(
                "--agree-to-license",
                "Agree to the software license agreement without user interaction",
            ),
            OptionSpec::new("--verbose", "Enable verbose output"),
            OptionSpec::new(["--help", "-h"], "Print help"),
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec_model::SpecModel;

    #[test]
    fn test_spec_is_well_formed() {
        let model = SpecModel::new(spec(SizeUnits::Faithful));
        assert!(model.issues().is_empty(), "{:?}", model.issues());
        assert_eq!(model.name(), "softwareupdate");
    }

    #[test]
    fn test_download_and_install_share_options() {
        let spec = spec(SizeUnits::Faithful);
        let download = spec.subcommands.iter().find(|s| s.name.matches("-d")).unwrap();
        let install = spec.subcommands.iter().find(|s| s.name.matches("-i")).unwrap();
        assert!(Arc::ptr_eq(&download.options, &install.options));
        assert_eq!(download.options.len(), 6);
    }

    #[test]
    fn test_installer_generator_uses_requested_units() {
        let generator = full_installer_generator(SizeUnits::Binary);
        assert_eq!(generator.script, LIST_FULL_INSTALLERS);
        assert_eq!(
            generator.post_process,
            PostProcess::FullInstallers { size_units: SizeUnits::Binary }
        );
    }
}
