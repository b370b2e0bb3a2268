//! `kubelab scenarios` — List the scenarios, their images and how to run them.

use clap::Args;
use kubelab_images::catalog::{ImageSettings, SCENARIOS};

use crate::output::format_table;

/// Arguments for the `scenarios` command.
#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Show the build context of each image as well.
    #[arg(short, long)]
    pub contexts: bool,
}

/// Failure mode and run command per image name.
const DETAILS: &[(&str, &str, &str)] = &[
    ("crashloop", "CrashLoopBackOff", "kubelab crashloop"),
    ("webapp", "Service port mismatch", "kubelab serve webapp"),
    ("config-app", "Missing ConfigMap", "kubelab serve blog"),
    ("rbac-app", "RBAC forbidden", "kubelab serve pod-monitor"),
    ("memory-hog", "OOMKilled", "kubelab serve memory-hog"),
    ("health-app", "Probe failure", "kubelab serve health"),
    ("netpol-client", "NetworkPolicy (frontend)", "kubelab serve orders"),
    ("netpol-server", "NetworkPolicy (backend)", "kubelab serve inventory"),
    ("storage-app", "PVC Pending", "kubelab serve storage"),
    ("init-app", "Init container failure", "kubelab serve todo"),
    ("init-wait", "Init container failure", "kubelab init-wait"),
    ("redis", "Redis for the init scenario", "-"),
];

fn details(name: &str) -> (&'static str, &'static str) {
    DETAILS
        .iter()
        .find(|(image, _, _)| *image == name)
        .map_or(("-", "-"), |&(_, failure, command)| (failure, command))
}

fn rows(args: &ScenariosArgs) -> Vec<Vec<String>> {
    let settings = ImageSettings::default();
    SCENARIOS
        .iter()
        .map(|scenario| {
            let (failure, command) = details(scenario.name);
            let mut row = vec![
                settings.versioned(scenario).to_string(),
                failure.to_string(),
                command.to_string(),
            ];
            if args.contexts {
                row.push(format!("scenarios/{}", scenario.context));
            }
            row
        })
        .collect()
}

/// Executes the `scenarios` command.
///
/// # Errors
///
/// Never fails; the signature matches the other commands.
#[allow(clippy::unnecessary_wraps, clippy::print_stdout)]
pub fn execute(args: &ScenariosArgs) -> anyhow::Result<()> {
    let mut headers = vec!["IMAGE", "FAILURE MODE", "RUN WITH"];
    if args.contexts {
        headers.push("CONTEXT");
    }
    print!("{}", format_table(&headers, &rows(args)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_image_has_details() {
        for scenario in SCENARIOS {
            assert_ne!(details(scenario.name).0, "-", "{}", scenario.name);
        }
    }

    #[test]
    fn contexts_add_a_column() {
        let rows = rows(&ScenariosArgs { contexts: true });
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0][0], "vellankikoti/k8s-masterclass-crashloop:v1.0");
        assert_eq!(rows[0][3], "scenarios/01-crashloop-backoff/app");
    }
}
